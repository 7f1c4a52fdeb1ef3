//! Signature-based protection (RFC 4210 Section 5.1.3.3).

use crate::domain::algorithms::{KeyError, SignatureAlgorithm, VerifyingKey};
use crate::domain::asn1::PkiMessage;
use crate::domain::errors::{CmpError, FailureReason, PkiFailureInfo};

/// Verifies signature protection with the key of `extraCerts[0]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureProtectionValidator;

impl SignatureProtectionValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, message: &PkiMessage) -> Result<(), CmpError> {
        // 1. Signer certificate, before any algorithm lookup
        let signer = message.first_extra_cert().ok_or_else(|| {
            CmpError::new(
                PkiFailureInfo::ADD_INFO_NOT_AVAILABLE,
                FailureReason::MissingExtraCerts,
            )
        })?;

        let protection = message
            .protection
            .as_ref()
            .ok_or_else(|| CmpError::not_authorized(FailureReason::MissingProtection))?;
        let algorithm_id = message
            .header
            .protection_alg
            .as_ref()
            .ok_or_else(|| CmpError::not_authorized(FailureReason::MissingProtectionAlgorithm))?;

        // 2. Protected bytes
        let data = message.protected_bytes().map_err(|e| {
            CmpError::not_authorized(FailureReason::ProtectionValidationFailed).with_cause(e)
        })?;

        // 3. Verifier from protectionAlg and the signer key
        let algorithm = SignatureAlgorithm::from_oid(&algorithm_id.oid).map_err(|e| {
            CmpError::bad_alg(FailureReason::UnsupportedProtectionAlgorithm).with_cause(e)
        })?;
        let key = VerifyingKey::from_spki(&signer.tbs_certificate.subject_public_key_info)
            .map_err(classify_key_error)?;

        let signature = protection.as_bytes().ok_or_else(|| {
            CmpError::not_authorized(FailureReason::ProtectionValidationFailed)
                .with_detail("protection bit string has unused bits")
        })?;

        // 4. Verify
        match key.verify(algorithm, &data, signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CmpError::new(
                PkiFailureInfo::WRONG_INTEGRITY,
                FailureReason::ProtectionVerificationFailed,
            )),
            Err(error) => Err(classify_key_error(error)),
        }
    }
}

fn classify_key_error(error: KeyError) -> CmpError {
    match error {
        KeyError::UnsupportedAlgorithm(_) | KeyError::AlgorithmMismatch { .. } => {
            CmpError::bad_alg(FailureReason::UnsupportedProtectionAlgorithm).with_cause(error)
        }
        KeyError::InvalidPublicKey(_) => CmpError::new(
            PkiFailureInfo::ADD_INFO_NOT_AVAILABLE,
            FailureReason::UnusableSignerCertificate,
        )
        .with_cause(error),
        KeyError::MalformedSignature => CmpError::new(
            PkiFailureInfo::WRONG_INTEGRITY,
            FailureReason::ProtectionVerificationFailed,
        )
        .with_cause(error),
        KeyError::Encoding(_) => {
            CmpError::not_authorized(FailureReason::ProtectionValidationFailed).with_cause(error)
        }
    }
}
