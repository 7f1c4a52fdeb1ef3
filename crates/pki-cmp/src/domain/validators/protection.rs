//! Protection dispatch by `protectionAlg`.

use super::mac::{MacProtectionValidator, MacScheme};
use super::signature::SignatureProtectionValidator;
use crate::domain::asn1::PkiMessage;
use crate::domain::context::ConfigurationContext;
use crate::domain::errors::{CmpError, FailureReason};
use crate::domain::oids;

/// Requires protection and routes to the MAC or signature validator.
#[derive(Clone, Copy, Debug)]
pub struct ProtectionValidator<'a> {
    context: &'a ConfigurationContext,
}

impl<'a> ProtectionValidator<'a> {
    pub fn new(context: &'a ConfigurationContext) -> Self {
        Self { context }
    }

    pub fn validate(&self, message: &PkiMessage) -> Result<(), CmpError> {
        if message.protection.is_none() {
            return Err(CmpError::not_authorized(FailureReason::MissingProtection));
        }
        let algorithm = message
            .header
            .protection_alg
            .as_ref()
            .ok_or_else(|| CmpError::not_authorized(FailureReason::MissingProtectionAlgorithm))?;

        let mac = MacProtectionValidator::new(self.context.shared_secret());
        match algorithm.oid {
            oids::PASSWORD_BASED_MAC => mac.validate(message, MacScheme::PasswordBasedMac),
            oids::PBMAC1 => mac.validate(message, MacScheme::Pbmac1),
            _ => SignatureProtectionValidator::new().validate(message),
        }
    }
}
