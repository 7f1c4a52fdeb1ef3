//! Revocation request handler (rr -> rp).
//!
//! The backend builds the complete response; it is returned unchanged.

use std::sync::Arc;
use tracing::{debug, warn};

use super::MessageHandler;
use crate::domain::asn1::{BodyType, PkiBody, PkiMessage};
use crate::domain::context::ConfigurationContext;
use crate::domain::errors::{CmpError, FailureReason};
use crate::domain::validators::ProtectionValidator;
use crate::ports::outbound::IssuanceBackend;

pub struct RevocationHandler<B: IssuanceBackend> {
    backend: Arc<B>,
}

impl<B: IssuanceBackend> RevocationHandler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

impl<B: IssuanceBackend> MessageHandler for RevocationHandler<B> {
    fn handles(&self) -> &'static [BodyType] {
        &[BodyType::Rr]
    }

    fn handle(
        &self,
        context: &ConfigurationContext,
        request: &PkiMessage,
    ) -> Result<PkiMessage, CmpError> {
        let PkiBody::Rr(details) = &request.body else {
            return Err(CmpError::system_failure(FailureReason::UnsupportedBodyType)
                .with_detail(request.body_type().name()));
        };

        ProtectionValidator::new(context).validate(request)?;

        if details.is_empty() {
            return Err(CmpError::bad_data_format(FailureReason::EmptyRevocationRequest));
        }

        let response = self.backend.revoke(request, details).map_err(|e| {
            warn!(error = %e, "Revocation backend failed");
            CmpError::system_failure(FailureReason::RevocationFailed).with_cause(e)
        })?;

        debug!(entries = details.len(), answered = response.is_some(), "Revocation processed");
        response.ok_or_else(|| CmpError::system_failure(FailureReason::NoRevocationResponse))
    }
}
