//! # Signature Algorithms
//!
//! Signing credentials and verifying keys for the algorithms the engine
//! supports: ECDSA with SHA-256 over P-256 and secp256k1, and Ed25519.
//!
//! ## Security Notes
//!
//! - ECDSA signatures are DER-encoded `Ecdsa-Sig-Value`s, as carried in X.509 and CMP
//! - secp256k1 signatures are S-normalized before verification, so high-S
//!   signatures from non-Bitcoin signers verify
//! - Ed25519 verification uses `verify_strict` (rejects small-order keys)
//! - Private key material never leaves this module except through `sign`

use const_oid::ObjectIdentifier;
use der::asn1::{Any, BitString};
use rand::rngs::OsRng;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::fmt;
use thiserror::Error;

use super::oids;

/// Errors from key decoding and signature handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Algorithm OID not supported
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Public key bytes or parameters could not be decoded
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature bytes are not a well-formed signature for the algorithm
    #[error("Malformed signature")]
    MalformedSignature,

    /// Key type cannot be used with the requested algorithm
    #[error("Key type {key} cannot produce {algorithm} signatures")]
    AlgorithmMismatch {
        key: &'static str,
        algorithm: &'static str,
    },

    /// DER encoding of key material failed
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<der::Error> for KeyError {
    fn from(error: der::Error) -> Self {
        KeyError::Encoding(error.to_string())
    }
}

// =============================================================================
// SIGNATURE ALGORITHM
// =============================================================================

/// Supported signature algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// ecdsa-with-SHA256 (curve taken from the key)
    EcdsaWithSha256,
    /// Ed25519 (pure)
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, KeyError> {
        match *oid {
            oids::ECDSA_WITH_SHA256 => Ok(Self::EcdsaWithSha256),
            oids::ED25519 => Ok(Self::Ed25519),
            other => Err(KeyError::UnsupportedAlgorithm(oids::describe(&other))),
        }
    }

    /// Parse a configured algorithm name (`SHA256withECDSA`, `Ed25519`).
    pub fn from_name(name: &str) -> Result<Self, KeyError> {
        match name {
            "SHA256withECDSA" => Ok(Self::EcdsaWithSha256),
            "Ed25519" => Ok(Self::Ed25519),
            other => Err(KeyError::UnsupportedAlgorithm(other.to_owned())),
        }
    }

    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            Self::EcdsaWithSha256 => oids::ECDSA_WITH_SHA256,
            Self::Ed25519 => oids::ED25519,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::EcdsaWithSha256 => "SHA256withECDSA",
            Self::Ed25519 => "Ed25519",
        }
    }

    /// `AlgorithmIdentifier` with absent parameters (RFC 5758, RFC 8410).
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// VERIFYING KEY
// =============================================================================

/// Public key decoded from a `SubjectPublicKeyInfo`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyingKey {
    P256(p256::ecdsa::VerifyingKey),
    K256(k256::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl VerifyingKey {
    /// Decode from an SPKI. Supports EC keys on P-256 and secp256k1, and Ed25519.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self, KeyError> {
        let key_bytes = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| KeyError::InvalidPublicKey("unaligned key bit string".into()))?;

        match spki.algorithm.oid {
            oids::EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .ok_or_else(|| KeyError::InvalidPublicKey("missing curve parameter".into()))?
                    .decode_as::<ObjectIdentifier>()
                    .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;

                match curve {
                    oids::SECP256R1 => p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(Self::P256)
                        .map_err(|e| KeyError::InvalidPublicKey(e.to_string())),
                    oids::SECP256K1 => k256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(Self::K256)
                        .map_err(|e| KeyError::InvalidPublicKey(e.to_string())),
                    other => Err(KeyError::UnsupportedAlgorithm(oids::describe(&other))),
                }
            }
            oids::ED25519 => {
                let bytes: &[u8; 32] = key_bytes
                    .try_into()
                    .map_err(|_| KeyError::InvalidPublicKey("Ed25519 key must be 32 bytes".into()))?;
                ed25519_dalek::VerifyingKey::from_bytes(bytes)
                    .map(Self::Ed25519)
                    .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
            }
            other => Err(KeyError::UnsupportedAlgorithm(oids::describe(&other))),
        }
    }

    /// Encode as a `SubjectPublicKeyInfo`.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned, KeyError> {
        let (algorithm, key_bytes) = match self {
            Self::P256(key) => (
                ec_algorithm(oids::SECP256R1)?,
                key.to_encoded_point(false).as_bytes().to_vec(),
            ),
            Self::K256(key) => (
                ec_algorithm(oids::SECP256K1)?,
                key.to_encoded_point(false).as_bytes().to_vec(),
            ),
            Self::Ed25519(key) => (
                AlgorithmIdentifierOwned {
                    oid: oids::ED25519,
                    parameters: None,
                },
                key.to_bytes().to_vec(),
            ),
        };

        Ok(SubjectPublicKeyInfoOwned {
            algorithm,
            subject_public_key: BitString::from_bytes(&key_bytes)?,
        })
    }

    pub fn key_type(&self) -> &'static str {
        match self {
            Self::P256(_) => "P-256",
            Self::K256(_) => "secp256k1",
            Self::Ed25519(_) => "Ed25519",
        }
    }

    /// Verify `signature` over `message` with `algorithm`.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not verify.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, KeyError> {
        use p256::ecdsa::signature::Verifier as _;

        match (self, algorithm) {
            (Self::P256(key), SignatureAlgorithm::EcdsaWithSha256) => {
                let signature = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| KeyError::MalformedSignature)?;
                Ok(key.verify(message, &signature).is_ok())
            }
            (Self::K256(key), SignatureAlgorithm::EcdsaWithSha256) => {
                let signature = k256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| KeyError::MalformedSignature)?;
                // k256 only accepts low-S; X9.62 allows either
                let signature = signature.normalize_s().unwrap_or(signature);
                Ok(key.verify(message, &signature).is_ok())
            }
            (Self::Ed25519(key), SignatureAlgorithm::Ed25519) => {
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| KeyError::MalformedSignature)?;
                Ok(key.verify_strict(message, &signature).is_ok())
            }
            (key, algorithm) => Err(KeyError::AlgorithmMismatch {
                key: key.key_type(),
                algorithm: algorithm.name(),
            }),
        }
    }
}

fn ec_algorithm(curve: ObjectIdentifier) -> Result<AlgorithmIdentifierOwned, KeyError> {
    Ok(AlgorithmIdentifierOwned {
        oid: oids::EC_PUBLIC_KEY,
        parameters: Some(Any::encode_from(&curve)?),
    })
}

// =============================================================================
// SIGNING CREDENTIAL
// =============================================================================

/// Private signing key.
#[derive(Clone)]
pub enum SigningCredential {
    P256(p256::ecdsa::SigningKey),
    K256(k256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl SigningCredential {
    pub fn generate_p256() -> Self {
        Self::P256(p256::ecdsa::SigningKey::random(&mut OsRng))
    }

    pub fn generate_k256() -> Self {
        Self::K256(k256::ecdsa::SigningKey::random(&mut OsRng))
    }

    pub fn generate_ed25519() -> Self {
        Self::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        match self {
            Self::P256(key) => VerifyingKey::P256(*key.verifying_key()),
            Self::K256(key) => VerifyingKey::K256(*key.verifying_key()),
            Self::Ed25519(key) => VerifyingKey::Ed25519(key.verifying_key()),
        }
    }

    pub fn key_type(&self) -> &'static str {
        self.verifying_key().key_type()
    }

    pub fn supports(&self, algorithm: SignatureAlgorithm) -> bool {
        matches!(
            (self, algorithm),
            (Self::P256(_) | Self::K256(_), SignatureAlgorithm::EcdsaWithSha256)
                | (Self::Ed25519(_), SignatureAlgorithm::Ed25519)
        )
    }

    /// Algorithm this key signs with.
    pub fn default_algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::P256(_) | Self::K256(_) => SignatureAlgorithm::EcdsaWithSha256,
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }

    /// Sign `message`, returning DER (ECDSA) or raw 64-byte (Ed25519) signature bytes.
    pub fn sign(&self, algorithm: SignatureAlgorithm, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        use p256::ecdsa::signature::Signer as _;

        if !self.supports(algorithm) {
            return Err(KeyError::AlgorithmMismatch {
                key: self.key_type(),
                algorithm: algorithm.name(),
            });
        }

        Ok(match self {
            Self::P256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            Self::K256(key) => {
                let signature: k256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            Self::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
        })
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("key_type", &self.key_type())
            .finish_non_exhaustive()
    }
}
