//! Certificate confirmation handler (certConf -> pkiconf).

use std::sync::Arc;
use tracing::{debug, warn};

use super::MessageHandler;
use crate::domain::asn1::{BodyType, PkiHeader, PkiMessage};
use crate::domain::builder::{create_confirmation_body, MessageBuilder};
use crate::domain::context::ConfigurationContext;
use crate::domain::errors::{CmpError, FailureReason};
use crate::domain::validators::ProtectionValidator;
use crate::ports::outbound::IssuanceBackend;

pub struct ConfirmationHandler<B: IssuanceBackend> {
    backend: Arc<B>,
}

impl<B: IssuanceBackend> ConfirmationHandler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

impl<B: IssuanceBackend> MessageHandler for ConfirmationHandler<B> {
    fn handles(&self) -> &'static [BodyType] {
        &[BodyType::CertConf]
    }

    fn handle(
        &self,
        context: &ConfigurationContext,
        request: &PkiMessage,
    ) -> Result<PkiMessage, CmpError> {
        let body_type = request.body_type();
        if body_type != BodyType::CertConf {
            return Err(CmpError::system_failure(FailureReason::UnsupportedBodyType)
                .with_detail(body_type.name()));
        }

        ProtectionValidator::new(context).validate(request)?;

        self.backend.acknowledge_confirmation(request).map_err(|e| {
            warn!(error = %e, "Confirmation not accepted by backend");
            CmpError::system_failure(FailureReason::ConfirmationFailed).with_cause(e)
        })?;
        debug!(transaction_id = %request.header.transaction_id_hex(), "Confirmation acknowledged");

        MessageBuilder::new(context)
            .header(PkiHeader::response_template(&request.header)?)
            .body(create_confirmation_body())
            .build()
    }
}
