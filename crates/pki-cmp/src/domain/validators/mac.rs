//! MAC-based protection (RFC 4210 Section 5.1.3.1, RFC 9481 Section 6.1).

use crate::domain::asn1::PkiMessage;
use crate::domain::errors::{CmpError, FailureReason, PkiFailureInfo};
use crate::domain::mac::{MacError, Pbmac1Params, PbmParameter};

/// MAC family the protection algorithm selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacScheme {
    PasswordBasedMac,
    Pbmac1,
}

/// Recomputes the MAC with the profile's shared secret.
#[derive(Clone, Copy, Debug)]
pub struct MacProtectionValidator<'a> {
    shared_secret: Option<&'a [u8]>,
}

impl<'a> MacProtectionValidator<'a> {
    pub fn new(shared_secret: Option<&'a [u8]>) -> Self {
        Self { shared_secret }
    }

    pub fn validate(&self, message: &PkiMessage, scheme: MacScheme) -> Result<(), CmpError> {
        let secret = self
            .shared_secret
            .ok_or_else(|| CmpError::not_authorized(FailureReason::MissingSharedSecret))?;
        let protection = message
            .protection
            .as_ref()
            .ok_or_else(|| CmpError::not_authorized(FailureReason::MissingProtection))?;
        let algorithm = message
            .header
            .protection_alg
            .as_ref()
            .ok_or_else(|| CmpError::not_authorized(FailureReason::MissingProtectionAlgorithm))?;

        let data = message.protected_bytes().map_err(|e| {
            CmpError::not_authorized(FailureReason::ProtectionValidationFailed).with_cause(e)
        })?;
        let received = protection.raw_bytes();

        let result = match scheme {
            MacScheme::PasswordBasedMac => PbmParameter::from_algorithm_identifier(algorithm)
                .and_then(|params| params.verify(secret, &data, received)),
            MacScheme::Pbmac1 => Pbmac1Params::from_algorithm_identifier(algorithm)
                .and_then(|params| params.verify(secret, &data, received)),
        };

        result.map_err(classify_mac_error)
    }
}

fn classify_mac_error(error: MacError) -> CmpError {
    match error {
        MacError::Mismatch => CmpError::new(
            PkiFailureInfo::WRONG_INTEGRITY,
            FailureReason::ProtectionVerificationFailed,
        ),
        MacError::InvalidParameters(_)
        | MacError::UnsupportedAlgorithm(_)
        | MacError::IterationCount(_) => {
            CmpError::bad_alg(FailureReason::InvalidMacParameters).with_cause(error)
        }
        MacError::Encoding(_) => {
            CmpError::not_authorized(FailureReason::ProtectionValidationFailed).with_cause(error)
        }
    }
}
