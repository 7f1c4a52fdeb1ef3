//! # Password-Based MAC Protection
//!
//! - RFC 4211 Section 4.4 `PasswordBasedMac`: iterated one-way function over
//!   `password || salt`, then HMAC
//! - RFC 9481 Section 6.1.2 `PBMAC1`: PBKDF2 key derivation, then HMAC
//!
//! Only SHA-256 based OWF/PRF/MAC algorithms are supported.

use der::asn1::{Any, OctetString};
use der::{Decode, Encode, Sequence, Tag, Tagged};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use super::oids;

/// Upper bound on iteration counts accepted from the wire.
pub const MAX_ITERATIONS: u32 = 100_000;

/// Iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Salt length generated for new strategies.
pub const SALT_LEN: usize = 16;

/// HMAC-SHA256 output and PBKDF2 derived key length.
pub const KEY_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// MAC computation and verification errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacError {
    /// Parameters missing or not decodable
    #[error("Invalid MAC parameters: {0}")]
    InvalidParameters(String),

    /// OWF, PRF, MAC or KDF algorithm not supported
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Iteration count outside 1..=MAX_ITERATIONS
    #[error("Iteration count {0} out of range")]
    IterationCount(u32),

    /// Recomputed MAC differs from the received one
    #[error("MAC mismatch")]
    Mismatch,

    /// DER encoding of parameters failed
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<der::Error> for MacError {
    fn from(error: der::Error) -> Self {
        MacError::Encoding(error.to_string())
    }
}

// =============================================================================
// ASN.1 PARAMETERS
// =============================================================================

/// ```text
/// PBMParameter ::= SEQUENCE {
///     salt                OCTET STRING,
///     owf                 AlgorithmIdentifier,
///     iterationCount      INTEGER,
///     mac                 AlgorithmIdentifier }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PbmParameter {
    pub salt: OctetString,
    pub owf: AlgorithmIdentifierOwned,
    pub iteration_count: u32,
    pub mac: AlgorithmIdentifierOwned,
}

/// ```text
/// PBMAC1-params ::= SEQUENCE {
///     keyDerivationFunc AlgorithmIdentifier {{PBMAC1-KDFs}},
///     messageAuthScheme AlgorithmIdentifier {{PBMAC1-MACs}} }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Pbmac1Params {
    pub key_derivation_func: AlgorithmIdentifierOwned,
    pub message_auth_scheme: AlgorithmIdentifierOwned,
}

/// ```text
/// PBKDF2-params ::= SEQUENCE {
///     salt CHOICE { specified OCTET STRING, ... },
///     iterationCount INTEGER (1..MAX),
///     keyLength INTEGER (1..MAX) OPTIONAL,
///     prf AlgorithmIdentifier DEFAULT algid-hmacWithSHA1 }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Pbkdf2Params {
    pub salt: OctetString,
    pub iteration_count: u32,
    pub key_length: Option<u32>,
    pub prf: Option<AlgorithmIdentifierOwned>,
}

fn sha256_algorithm(oid: const_oid::ObjectIdentifier) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    }
}

fn check_iterations(count: u32) -> Result<(), MacError> {
    if count == 0 || count > MAX_ITERATIONS {
        return Err(MacError::IterationCount(count));
    }
    Ok(())
}

/// SHA-256 OWF parameters may be absent or NULL.
fn expect_algorithm(
    algorithm: &AlgorithmIdentifierOwned,
    expected: const_oid::ObjectIdentifier,
) -> Result<(), MacError> {
    if algorithm.oid != expected {
        return Err(MacError::UnsupportedAlgorithm(oids::describe(&algorithm.oid)));
    }
    match &algorithm.parameters {
        None => Ok(()),
        Some(params) if params.tag() == Tag::Null => Ok(()),
        Some(_) => Err(MacError::InvalidParameters(format!(
            "unexpected parameters for {}",
            oids::describe(&expected)
        ))),
    }
}

fn decode_parameters<T: for<'a> Decode<'a>>(
    algorithm: &AlgorithmIdentifierOwned,
) -> Result<T, MacError> {
    let params = algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| MacError::InvalidParameters("parameters absent".into()))?;
    T::from_der(&params.to_der()?).map_err(|e| MacError::InvalidParameters(e.to_string()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, MacError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| MacError::InvalidParameters(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_check(expected: &[u8], received: &[u8]) -> Result<(), MacError> {
    if expected.len() == received.len() && bool::from(expected.ct_eq(received)) {
        Ok(())
    } else {
        Err(MacError::Mismatch)
    }
}

// =============================================================================
// PASSWORD BASED MAC (RFC 4211)
// =============================================================================

impl PbmParameter {
    pub fn new(salt: &[u8], iteration_count: u32) -> Result<Self, MacError> {
        check_iterations(iteration_count)?;
        Ok(Self {
            salt: OctetString::new(salt)?,
            owf: sha256_algorithm(oids::SHA256),
            iteration_count,
            mac: sha256_algorithm(oids::HMAC_WITH_SHA256),
        })
    }

    /// Protection `AlgorithmIdentifier` carrying these parameters.
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned, MacError> {
        Ok(AlgorithmIdentifierOwned {
            oid: oids::PASSWORD_BASED_MAC,
            parameters: Some(Any::encode_from(self)?),
        })
    }

    pub fn from_algorithm_identifier(algorithm: &AlgorithmIdentifierOwned) -> Result<Self, MacError> {
        if algorithm.oid != oids::PASSWORD_BASED_MAC {
            return Err(MacError::UnsupportedAlgorithm(oids::describe(&algorithm.oid)));
        }
        decode_parameters::<Self>(algorithm)
    }

    fn validate(&self) -> Result<(), MacError> {
        expect_algorithm(&self.owf, oids::SHA256)?;
        expect_algorithm(&self.mac, oids::HMAC_WITH_SHA256)?;
        check_iterations(self.iteration_count)
    }

    /// `H^iterationCount(password || salt)`
    fn derive_key(&self, secret: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(self.salt.as_bytes());

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&hasher.finalize());
        for _ in 1..self.iteration_count {
            let next = Sha256::digest(&key[..]);
            key.copy_from_slice(&next);
        }
        key
    }

    pub fn compute(&self, secret: &[u8], data: &[u8]) -> Result<Vec<u8>, MacError> {
        self.validate()?;
        let key = self.derive_key(secret);
        hmac_sha256(&key[..], data)
    }

    pub fn verify(&self, secret: &[u8], data: &[u8], received: &[u8]) -> Result<(), MacError> {
        let expected = self.compute(secret, data)?;
        constant_time_check(&expected, received)
    }
}

// =============================================================================
// PBMAC1 (RFC 9481)
// =============================================================================

impl Pbmac1Params {
    pub fn new(salt: &[u8], iteration_count: u32) -> Result<Self, MacError> {
        check_iterations(iteration_count)?;
        let kdf = Pbkdf2Params {
            salt: OctetString::new(salt)?,
            iteration_count,
            key_length: Some(KEY_LEN as u32),
            prf: Some(sha256_algorithm(oids::HMAC_WITH_SHA256)),
        };
        Ok(Self {
            key_derivation_func: AlgorithmIdentifierOwned {
                oid: oids::PBKDF2,
                parameters: Some(Any::encode_from(&kdf)?),
            },
            message_auth_scheme: sha256_algorithm(oids::HMAC_WITH_SHA256),
        })
    }

    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned, MacError> {
        Ok(AlgorithmIdentifierOwned {
            oid: oids::PBMAC1,
            parameters: Some(Any::encode_from(self)?),
        })
    }

    pub fn from_algorithm_identifier(algorithm: &AlgorithmIdentifierOwned) -> Result<Self, MacError> {
        if algorithm.oid != oids::PBMAC1 {
            return Err(MacError::UnsupportedAlgorithm(oids::describe(&algorithm.oid)));
        }
        decode_parameters::<Self>(algorithm)
    }

    fn kdf_params(&self) -> Result<Pbkdf2Params, MacError> {
        if self.key_derivation_func.oid != oids::PBKDF2 {
            return Err(MacError::UnsupportedAlgorithm(oids::describe(
                &self.key_derivation_func.oid,
            )));
        }
        let params = decode_parameters::<Pbkdf2Params>(&self.key_derivation_func)?;
        match &params.prf {
            Some(prf) => expect_algorithm(prf, oids::HMAC_WITH_SHA256)?,
            None => return Err(MacError::UnsupportedAlgorithm("hmacWithSHA1".into())),
        }
        check_iterations(params.iteration_count)?;
        Ok(params)
    }

    pub fn compute(&self, secret: &[u8], data: &[u8]) -> Result<Vec<u8>, MacError> {
        expect_algorithm(&self.message_auth_scheme, oids::HMAC_WITH_SHA256)?;
        let params = self.kdf_params()?;

        let key_len = params.key_length.unwrap_or(KEY_LEN as u32) as usize;
        if key_len == 0 || key_len > 64 {
            return Err(MacError::InvalidParameters(format!("key length {key_len}")));
        }

        let mut key = Zeroizing::new(vec![0u8; key_len]);
        pbkdf2::pbkdf2_hmac::<Sha256>(
            secret,
            params.salt.as_bytes(),
            params.iteration_count,
            &mut key[..],
        );
        hmac_sha256(&key[..], data)
    }

    pub fn verify(&self, secret: &[u8], data: &[u8], received: &[u8]) -> Result<(), MacError> {
        let expected = self.compute(secret, data)?;
        constant_time_check(&expected, received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"insta-secret";
    const SALT: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_pbm_verify_accepts_own_mac() {
        let params = PbmParameter::new(SALT, 1_000).unwrap();
        let mac = params.compute(SECRET, b"header+body").unwrap();

        assert_eq!(mac.len(), KEY_LEN);
        assert!(params.verify(SECRET, b"header+body", &mac).is_ok());
    }

    #[test]
    fn test_pbm_wrong_secret_mismatches() {
        let params = PbmParameter::new(SALT, 1_000).unwrap();
        let mac = params.compute(SECRET, b"header+body").unwrap();

        assert_eq!(
            params.verify(b"other-secret", b"header+body", &mac),
            Err(MacError::Mismatch)
        );
    }

    #[test]
    fn test_pbm_single_iteration_is_one_hash() {
        let params = PbmParameter::new(SALT, 1).unwrap();

        let mut input = SECRET.to_vec();
        input.extend_from_slice(SALT);
        let key = Sha256::digest(&input);
        let expected = hmac_sha256(&key, b"data").unwrap();

        assert_eq!(params.compute(SECRET, b"data").unwrap(), expected);
    }

    #[test]
    fn test_pbm_parameters_survive_algorithm_identifier() {
        let params = PbmParameter::new(SALT, 500).unwrap();
        let algorithm = params.algorithm_identifier().unwrap();

        assert_eq!(algorithm.oid, oids::PASSWORD_BASED_MAC);
        assert_eq!(PbmParameter::from_algorithm_identifier(&algorithm).unwrap(), params);
    }

    #[test]
    fn test_iteration_bounds() {
        assert_eq!(PbmParameter::new(SALT, 0), Err(MacError::IterationCount(0)));
        assert!(PbmParameter::new(SALT, MAX_ITERATIONS).is_ok());
        assert_eq!(
            Pbmac1Params::new(SALT, MAX_ITERATIONS + 1),
            Err(MacError::IterationCount(MAX_ITERATIONS + 1))
        );
    }

    #[test]
    fn test_pbm_rejects_unsupported_owf() {
        let mut params = PbmParameter::new(SALT, 10).unwrap();
        params.owf.oid = oids::ED25519;

        assert!(matches!(
            params.compute(SECRET, b"data"),
            Err(MacError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_pbmac1_round_trip() {
        let params = Pbmac1Params::new(SALT, 1_000).unwrap();
        let algorithm = params.algorithm_identifier().unwrap();
        let decoded = Pbmac1Params::from_algorithm_identifier(&algorithm).unwrap();

        let mac = params.compute(SECRET, b"header+body").unwrap();

        assert!(decoded.verify(SECRET, b"header+body", &mac).is_ok());
        assert_eq!(
            decoded.verify(SECRET, b"header+bodY", &mac),
            Err(MacError::Mismatch)
        );
    }

    #[test]
    fn test_pbmac1_requires_explicit_prf() {
        let kdf = Pbkdf2Params {
            salt: OctetString::new(SALT).unwrap(),
            iteration_count: 10,
            key_length: None,
            prf: None,
        };
        let params = Pbmac1Params {
            key_derivation_func: AlgorithmIdentifierOwned {
                oid: oids::PBKDF2,
                parameters: Some(Any::encode_from(&kdf).unwrap()),
            },
            message_auth_scheme: sha256_algorithm(oids::HMAC_WITH_SHA256),
        };

        assert!(matches!(
            params.compute(SECRET, b"data"),
            Err(MacError::UnsupportedAlgorithm(_))
        ));
    }
}
