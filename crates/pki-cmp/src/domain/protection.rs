//! # Protection Strategies
//!
//! How outgoing messages are protected. A strategy is chosen once per profile
//! and shared immutably; it reports the `AlgorithmIdentifier` it produces so
//! the header always describes the protection actually applied.
//!
//! Failure to compute protection is an engine fault, never a protocol error.

use der::asn1::{BitString, OctetString};
use rand::rngs::OsRng;
use rand::RngCore;
use spki::AlgorithmIdentifierOwned;
use std::fmt;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use super::algorithms::{KeyError, SignatureAlgorithm, SigningCredential};
use super::asn1::{protected_bytes, PkiBody, PkiHeader, PkiMessage};
use super::errors::{CmpError, FailureReason};
use super::mac::{MacError, Pbmac1Params, PbmParameter, SALT_LEN};

fn computation_failed(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> CmpError {
    CmpError::system_failure(FailureReason::ProtectionComputationFailed).with_cause(cause)
}

fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

// =============================================================================
// SIGNATURE
// =============================================================================

/// Signs `ProtectedPart` with the profile key and attaches its chain.
#[derive(Clone, Debug)]
pub struct SignatureProtection {
    credential: SigningCredential,
    algorithm: SignatureAlgorithm,
    chain: Vec<Certificate>,
}

impl SignatureProtection {
    /// `chain[0]` must be the certificate of `credential`.
    pub fn new(
        credential: SigningCredential,
        algorithm: SignatureAlgorithm,
        chain: Vec<Certificate>,
    ) -> Result<Self, KeyError> {
        if !credential.supports(algorithm) {
            return Err(KeyError::AlgorithmMismatch {
                key: credential.key_type(),
                algorithm: algorithm.name(),
            });
        }
        Ok(Self {
            credential,
            algorithm,
            chain,
        })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn credential(&self) -> &SigningCredential {
        &self.credential
    }

    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }
}

// =============================================================================
// PASSWORD BASED MAC
// =============================================================================

/// RFC 4211 `PasswordBasedMac` with a fixed salt per strategy instance.
#[derive(Clone)]
pub struct PasswordMacProtection {
    secret: Zeroizing<Vec<u8>>,
    params: PbmParameter,
    sender_kid: Option<Vec<u8>>,
}

impl PasswordMacProtection {
    pub fn new(secret: &[u8], iteration_count: u32) -> Result<Self, MacError> {
        Self::with_salt(secret, &random_salt(), iteration_count)
    }

    pub fn with_salt(secret: &[u8], salt: &[u8], iteration_count: u32) -> Result<Self, MacError> {
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            params: PbmParameter::new(salt, iteration_count)?,
            sender_kid: None,
        })
    }

    /// Reference value stamped as `senderKID`.
    pub fn with_sender_kid(mut self, kid: impl Into<Vec<u8>>) -> Self {
        self.sender_kid = Some(kid.into());
        self
    }

    pub fn params(&self) -> &PbmParameter {
        &self.params
    }
}

impl fmt::Debug for PasswordMacProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordMacProtection")
            .field("iteration_count", &self.params.iteration_count)
            .field("sender_kid", &self.sender_kid.as_ref().map(hex::encode))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PBMAC1
// =============================================================================

/// RFC 9481 PBMAC1 (PBKDF2-HMAC-SHA256 + HMAC-SHA256).
#[derive(Clone)]
pub struct Pbmac1Protection {
    secret: Zeroizing<Vec<u8>>,
    params: Pbmac1Params,
    sender_kid: Option<Vec<u8>>,
}

impl Pbmac1Protection {
    pub fn new(secret: &[u8], iteration_count: u32) -> Result<Self, MacError> {
        Self::with_salt(secret, &random_salt(), iteration_count)
    }

    pub fn with_salt(secret: &[u8], salt: &[u8], iteration_count: u32) -> Result<Self, MacError> {
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            params: Pbmac1Params::new(salt, iteration_count)?,
            sender_kid: None,
        })
    }

    pub fn with_sender_kid(mut self, kid: impl Into<Vec<u8>>) -> Self {
        self.sender_kid = Some(kid.into());
        self
    }
}

impl fmt::Debug for Pbmac1Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pbmac1Protection")
            .field("sender_kid", &self.sender_kid.as_ref().map(hex::encode))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// STRATEGY
// =============================================================================

/// Closed set of protection strategies.
#[derive(Clone, Debug)]
pub enum ProtectionStrategy {
    Signature(SignatureProtection),
    PasswordMac(PasswordMacProtection),
    Pbmac1(Pbmac1Protection),
}

impl ProtectionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Signature(_) => "signature",
            Self::PasswordMac(_) => "pbm",
            Self::Pbmac1(_) => "pbmac1",
        }
    }

    /// `protectionAlg` this strategy produces.
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned, CmpError> {
        match self {
            Self::Signature(s) => Ok(s.algorithm.algorithm_identifier()),
            Self::PasswordMac(m) => m.params.algorithm_identifier().map_err(computation_failed),
            Self::Pbmac1(m) => m.params.algorithm_identifier().map_err(computation_failed),
        }
    }

    /// Protection bits over DER `ProtectedPart(header, body)`.
    pub fn compute_protection(&self, header: &PkiHeader, body: &PkiBody) -> Result<BitString, CmpError> {
        let data = protected_bytes(header, body).map_err(computation_failed)?;

        let bytes = match self {
            Self::Signature(s) => s
                .credential
                .sign(s.algorithm, &data)
                .map_err(computation_failed)?,
            Self::PasswordMac(m) => m.params.compute(&m.secret, &data).map_err(computation_failed)?,
            Self::Pbmac1(m) => m.params.compute(&m.secret, &data).map_err(computation_failed)?,
        };

        BitString::from_bytes(&bytes).map_err(computation_failed)
    }

    /// Subject of the first chain certificate, for signature protection only.
    pub fn sender_identity(&self) -> Option<GeneralName> {
        match self {
            Self::Signature(s) => s
                .chain
                .first()
                .map(|cert| GeneralName::DirectoryName(cert.tbs_certificate.subject.clone())),
            Self::PasswordMac(_) | Self::Pbmac1(_) => None,
        }
    }

    /// Certificates to put in `extraCerts` ahead of any issuer chain.
    pub fn additional_certificates(&self) -> &[Certificate] {
        match self {
            Self::Signature(s) => &s.chain,
            Self::PasswordMac(_) | Self::Pbmac1(_) => &[],
        }
    }

    /// `senderKID` to stamp, for MAC strategies configured with one.
    pub fn sender_kid(&self) -> Option<&[u8]> {
        match self {
            Self::Signature(_) => None,
            Self::PasswordMac(m) => m.sender_kid.as_deref(),
            Self::Pbmac1(m) => m.sender_kid.as_deref(),
        }
    }

    /// Stamp `protectionAlg`/`senderKID` into `header`.
    pub fn stamp_header(&self, header: &mut PkiHeader) -> Result<(), CmpError> {
        header.protection_alg = Some(self.algorithm_identifier()?);
        if let Some(kid) = self.sender_kid() {
            header.sender_kid = Some(OctetString::new(kid).map_err(computation_failed)?);
        }
        Ok(())
    }

    /// Protect a message as-is, without header merging.
    ///
    /// Used on the requester side, where there is no request to answer.
    pub fn protect(
        &self,
        mut header: PkiHeader,
        body: PkiBody,
        extra_certs: Vec<Certificate>,
    ) -> Result<PkiMessage, CmpError> {
        self.stamp_header(&mut header)?;
        let protection = self.compute_protection(&header, &body)?;

        let mut certs = self.additional_certificates().to_vec();
        certs.extend(extra_certs);

        Ok(PkiMessage {
            header,
            body,
            protection: Some(protection),
            extra_certs: (!certs.is_empty()).then_some(certs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asn1::header::null_name;
    use crate::domain::mac::MacError;
    use der::asn1::Null;

    fn header() -> PkiHeader {
        PkiHeader::new(null_name(), null_name())
    }

    #[test]
    fn test_signature_strategy_rejects_unsupported_key() {
        let result = SignatureProtection::new(
            SigningCredential::generate_ed25519(),
            SignatureAlgorithm::EcdsaWithSha256,
            Vec::new(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_signature_protection_verifies() {
        let credential = SigningCredential::generate_p256();
        let strategy = ProtectionStrategy::Signature(
            SignatureProtection::new(credential.clone(), SignatureAlgorithm::EcdsaWithSha256, Vec::new())
                .unwrap(),
        );
        let body = PkiBody::PkiConf(Null);

        let protection = strategy.compute_protection(&header(), &body).unwrap();

        let data = protected_bytes(&header(), &body).unwrap();
        assert!(credential
            .verifying_key()
            .verify(SignatureAlgorithm::EcdsaWithSha256, &data, protection.raw_bytes())
            .unwrap());
        assert!(strategy.sender_identity().is_none());
    }

    #[test]
    fn test_mac_strategy_stamps_algorithm_and_kid() {
        let strategy = ProtectionStrategy::PasswordMac(
            PasswordMacProtection::new(b"secret", 100)
                .unwrap()
                .with_sender_kid(b"client-7".to_vec()),
        );

        let message = strategy.protect(header(), PkiBody::PkiConf(Null), Vec::new()).unwrap();

        let algorithm = message.header.protection_alg.as_ref().unwrap();
        assert_eq!(algorithm.oid, crate::domain::oids::PASSWORD_BASED_MAC);
        assert_eq!(message.header.sender_kid.unwrap().as_bytes(), b"client-7");
        assert!(message.extra_certs.is_none());
        assert!(strategy.additional_certificates().is_empty());
    }

    #[test]
    fn test_fixed_salt_is_deterministic() {
        let a = ProtectionStrategy::Pbmac1(Pbmac1Protection::with_salt(b"pw", b"salt-salt", 10).unwrap());
        let b = ProtectionStrategy::Pbmac1(Pbmac1Protection::with_salt(b"pw", b"salt-salt", 10).unwrap());
        let body = PkiBody::PkiConf(Null);

        assert_eq!(
            a.compute_protection(&header(), &body).unwrap(),
            b.compute_protection(&header(), &body).unwrap()
        );
    }

    #[test]
    fn test_invalid_iteration_count() {
        assert_eq!(
            PasswordMacProtection::new(b"pw", 0).unwrap_err(),
            MacError::IterationCount(0)
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let strategy = PasswordMacProtection::new(b"hunter2", 10).unwrap();

        assert!(!format!("{strategy:?}").contains("hunter2"));
    }
}
