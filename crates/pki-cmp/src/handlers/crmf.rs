//! Certificate request handler (ir, cr, kur).
//!
//! krr and ccr are routed here as well but are not implemented.

use std::sync::Arc;
use tracing::{debug, warn};

use super::MessageHandler;
use crate::domain::asn1::{BodyType, PkiHeader, PkiMessage};
use crate::domain::builder::{create_issuance_response_body, MessageBuilder};
use crate::domain::context::ConfigurationContext;
use crate::domain::errors::{CmpError, FailureReason, PkiFailureInfo};
use crate::domain::validators::{PopValidator, ProtectionValidator};
use crate::ports::outbound::IssuanceBackend;

/// Handles CRMF certificate requests.
pub struct CrmfHandler<B: IssuanceBackend> {
    backend: Arc<B>,
}

impl<B: IssuanceBackend> CrmfHandler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

impl<B: IssuanceBackend> MessageHandler for CrmfHandler<B> {
    fn handles(&self) -> &'static [BodyType] {
        &[
            BodyType::Ir,
            BodyType::Cr,
            BodyType::Kur,
            BodyType::Krr,
            BodyType::Ccr,
        ]
    }

    fn handle(
        &self,
        context: &ConfigurationContext,
        request: &PkiMessage,
    ) -> Result<PkiMessage, CmpError> {
        let body_type = request.body_type();
        match body_type {
            BodyType::Ir | BodyType::Cr | BodyType::Kur => {}
            BodyType::Krr | BodyType::Ccr => {
                return Err(CmpError::system_failure(FailureReason::NotImplemented)
                    .with_detail(body_type.name()))
            }
            other => {
                return Err(CmpError::system_failure(FailureReason::UnsupportedBodyType)
                    .with_detail(other.name()))
            }
        }

        ProtectionValidator::new(context).validate(request)?;

        if PopValidator::is_exempt(request, context.pop_required()) {
            debug!(body_type = %body_type, "POP not required, skipping verification");
        } else {
            PopValidator::new().validate(request)?;
        }

        let cert_req = request
            .body
            .cert_req_messages()
            .and_then(|msgs| msgs.first())
            .map(|msg| &msg.cert_req)
            .ok_or_else(|| CmpError::bad_data_format(FailureReason::MissingCertRequest))?;
        let template = &cert_req.cert_template;
        if template.subject.is_none() {
            return Err(CmpError::new(
                PkiFailureInfo::BAD_CERT_TEMPLATE,
                FailureReason::MissingSubject,
            ));
        }
        let public_key = template.public_key.as_ref().ok_or_else(|| {
            CmpError::new(PkiFailureInfo::BAD_CERT_TEMPLATE, FailureReason::MissingPublicKey)
        })?;

        let issued = self.backend.issue(template, public_key).map_err(|e| {
            warn!(body_type = %body_type, error = %e, "Issuance backend failed");
            CmpError::system_failure(FailureReason::IssuanceFailed).with_cause(e)
        })?;

        debug!(
            body_type = %body_type,
            cert_req_id = cert_req.cert_req_id,
            "Certificate issued"
        );

        let body = create_issuance_response_body(&request.body, issued.certificate, None)?;
        MessageBuilder::new(context)
            .header(PkiHeader::response_template(&request.header)?)
            .body(body)
            .issuer_chain(issued.issuer_chain)
            .build()
    }
}
