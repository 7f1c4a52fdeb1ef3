//! # Message Handlers
//!
//! One handler per supported request family, selected by body type code.
//! Every handler validates protection before anything else.

pub mod confirmation;
pub mod crmf;
pub mod revocation;

use std::sync::Arc;

use crate::domain::asn1::{BodyType, PkiMessage};
use crate::domain::context::ConfigurationContext;
use crate::domain::errors::{CmpError, FailureReason};
use crate::ports::outbound::IssuanceBackend;

pub use confirmation::ConfirmationHandler;
pub use crmf::CrmfHandler;
pub use revocation::RevocationHandler;

/// Handles the request body types it declares.
pub trait MessageHandler: Send + Sync {
    /// Body types routed to this handler.
    fn handles(&self) -> &'static [BodyType];

    /// Validate `request` and build the protected response.
    fn handle(
        &self,
        context: &ConfigurationContext,
        request: &PkiMessage,
    ) -> Result<PkiMessage, CmpError>;
}

/// Routes requests to handlers by body type.
pub struct Dispatcher {
    handlers: Vec<Box<dyn MessageHandler>>,
}

impl Dispatcher {
    /// Dispatcher with the CRMF, certConf and revocation handlers.
    pub fn with_backend<B: IssuanceBackend + 'static>(backend: Arc<B>) -> Self {
        Self::new(vec![
            Box::new(CrmfHandler::new(Arc::clone(&backend))),
            Box::new(ConfirmationHandler::new(Arc::clone(&backend))),
            Box::new(RevocationHandler::new(backend)),
        ])
    }

    pub fn new(handlers: Vec<Box<dyn MessageHandler>>) -> Self {
        Self { handlers }
    }

    /// Body types some handler accepts.
    pub fn supported_types(&self) -> Vec<BodyType> {
        let mut types: Vec<BodyType> = self
            .handlers
            .iter()
            .flat_map(|handler| handler.handles().iter().copied())
            .collect();
        types.sort();
        types
    }

    pub fn dispatch(
        &self,
        context: &ConfigurationContext,
        request: &PkiMessage,
    ) -> Result<PkiMessage, CmpError> {
        let body_type = request.body_type();
        let handler = self
            .handlers
            .iter()
            .find(|handler| handler.handles().contains(&body_type))
            .ok_or_else(|| {
                CmpError::system_failure(FailureReason::UnsupportedBodyType)
                    .with_detail(body_type.name())
            })?;

        handler.handle(context, request)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("supported_types", &self.supported_types())
            .finish()
    }
}
