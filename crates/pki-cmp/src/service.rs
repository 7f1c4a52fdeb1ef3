//! # CMP Service
//!
//! Application service implementing `CmpMessageApi`.
//!
//! ## Architecture
//!
//! - Resolves the profile through the `ContextProvider` outbound port
//! - Dispatches to the handlers by body type
//! - At the DER boundary, turns protocol failures into `error` messages;
//!   only engine faults escape as `FatalError`

use der::{Decode, Encode};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::asn1::PkiMessage;
use crate::domain::error_message::ErrorMessageFactory;
use crate::domain::errors::{CmpError, FailureReason, FatalError};
use crate::handlers::Dispatcher;
use crate::ports::inbound::CmpMessageApi;
use crate::ports::outbound::{ContextProvider, IssuanceBackend};

/// CMP message engine bound to a profile registry and a dispatcher.
pub struct CmpService<P: ContextProvider> {
    profiles: P,
    dispatcher: Dispatcher,
    errors: ErrorMessageFactory,
}

impl<P: ContextProvider> CmpService<P> {
    /// Service with the standard handlers over `backend`.
    pub fn new<B: IssuanceBackend + 'static>(profiles: P, backend: Arc<B>) -> Self {
        Self::with_dispatcher(profiles, Dispatcher::with_backend(backend))
    }

    pub fn with_dispatcher(profiles: P, dispatcher: Dispatcher) -> Self {
        Self {
            profiles,
            dispatcher,
            errors: ErrorMessageFactory::new(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Process independent DER requests in parallel.
    ///
    /// Results are in input order.
    pub fn process_batch(
        &self,
        profile: &str,
        requests: &[Vec<u8>],
    ) -> Vec<Result<Vec<u8>, FatalError>> {
        use rayon::prelude::*;

        requests
            .par_iter()
            .map(|request| self.process_der(profile, request))
            .collect()
    }

    fn error_response(&self, request: Option<&PkiMessage>, error: &CmpError) -> Result<Vec<u8>, FatalError> {
        let message = match request {
            Some(request) => self.errors.create_for_request(&request.header, error)?,
            None => self.errors.create_for_error(error)?,
        };
        Ok(message.to_der()?)
    }
}

impl<P: ContextProvider> CmpMessageApi for CmpService<P> {
    fn handle_message(&self, profile: &str, request: &PkiMessage) -> Result<PkiMessage, CmpError> {
        let summary = request.summary();
        info!(profile, %summary, "Processing CMP message");

        let context = self.profiles.context_for(profile).ok_or_else(|| {
            CmpError::not_authorized(FailureReason::UnknownProfile).with_detail(profile)
        })?;

        let result = self.dispatcher.dispatch(&context, request);
        match &result {
            Ok(response) => debug!(response = %response.summary(), "Response built"),
            Err(e) => warn!(
                transaction_id = %summary.transaction_id,
                body_type = %summary.body_type,
                error = %e,
                "Request failed"
            ),
        }
        result
    }

    fn process_der(&self, profile: &str, request: &[u8]) -> Result<Vec<u8>, FatalError> {
        let message = match PkiMessage::from_der(request) {
            Ok(message) => message,
            Err(e) => {
                warn!(len = request.len(), error = %e, "Undecodable CMP request");
                let failure = CmpError::bad_data_format(FailureReason::MalformedMessage)
                    .with_detail(e.to_string())
                    .with_cause(e);
                return self.error_response(None, &failure);
            }
        };

        match self.handle_message(profile, &message) {
            Ok(response) => Ok(response.to_der()?),
            Err(e) if e.is_fatal() => {
                error!(transaction_id = %message.header.transaction_id_hex(), error = %e, "Engine fault");
                Err(FatalError::Engine(e))
            }
            Err(e) => self.error_response(Some(&message), &e),
        }
    }
}

impl<P: ContextProvider> std::fmt::Debug for CmpService<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmpService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryCa, StaticContextProvider};
    use crate::domain::algorithms::SigningCredential;
    use crate::domain::asn1::{BodyType, ErrorMsgContent, PkiBody};
    use crate::domain::context::ConfigurationContext;
    use crate::domain::errors::PkiFailureInfo;
    use crate::handlers::MessageHandler;
    use crate::test_utils::{cert_req_msg, protected_request, signature_context};
    use der::asn1::Any;

    fn service() -> CmpService<StaticContextProvider> {
        let (context, _) = signature_context("default");
        let mut profiles = StaticContextProvider::new();
        profiles.insert(context);
        let ca = Arc::new(InMemoryCa::generate("CN=Test CA").unwrap());
        CmpService::new(profiles, ca)
    }

    fn error_content(der: &[u8]) -> ErrorMsgContent {
        match PkiMessage::from_der(der).unwrap().body {
            PkiBody::Error(content) => content,
            other => panic!("expected error body, got {}", other.body_type()),
        }
    }

    /// Handler that reports an engine defect for every request.
    struct FaultyHandler;

    impl MessageHandler for FaultyHandler {
        fn handles(&self) -> &'static [BodyType] {
            &[BodyType::Ir]
        }

        fn handle(
            &self,
            _context: &ConfigurationContext,
            _request: &PkiMessage,
        ) -> Result<PkiMessage, CmpError> {
            Err(CmpError::system_failure(FailureReason::ContractViolation))
        }
    }

    #[test]
    fn test_process_der_ir_to_ip() {
        let service = service();
        let requester = SigningCredential::generate_p256();
        let request = protected_request(&requester, PkiBody::Ir(vec![cert_req_msg(&requester, "device", 0)]));

        let response = service.process_der("default", &request.to_der().unwrap()).unwrap();

        let response = PkiMessage::from_der(&response).unwrap();
        assert_eq!(response.body_type(), BodyType::Ip);
        assert_eq!(response.header.trans_id, request.header.trans_id);
        assert_eq!(response.header.recip_nonce, request.header.sender_nonce);
    }

    #[test]
    fn test_malformed_der_answered_with_bad_data_format() {
        let service = service();

        let response = service.process_der("default", &[0x30, 0x03, 0x02, 0x01]).unwrap();

        let content = error_content(&response);
        assert_eq!(content.pki_status_info.failure_info(), PkiFailureInfo::BAD_DATA_FORMAT);
        assert_eq!(content.error_code, Some(FailureReason::MalformedMessage.code()));
    }

    #[test]
    fn test_unknown_profile_answered_with_not_authorized() {
        let service = service();
        let requester = SigningCredential::generate_p256();
        let request = protected_request(&requester, PkiBody::Ir(vec![cert_req_msg(&requester, "device", 0)]));

        let response = service.process_der("missing", &request.to_der().unwrap()).unwrap();

        let decoded = PkiMessage::from_der(&response).unwrap();
        assert_eq!(decoded.header.trans_id, request.header.trans_id);
        let content = error_content(&response);
        assert_eq!(content.pki_status_info.failure_info(), PkiFailureInfo::NOT_AUTHORIZED);
        assert_eq!(
            content.error_details,
            Some(vec![
                FailureReason::UnknownProfile.description().to_owned(),
                "missing".to_owned(),
            ])
        );
    }

    #[test]
    fn test_unsupported_body_answered_with_system_failure() {
        let service = service();
        let request = protected_request(
            &SigningCredential::generate_p256(),
            PkiBody::Genm(Any::new(der::Tag::Sequence, Vec::new()).unwrap()),
        );

        let response = service.process_der("default", &request.to_der().unwrap()).unwrap();

        let content = error_content(&response);
        assert_eq!(content.pki_status_info.failure_info(), PkiFailureInfo::SYSTEM_FAILURE);
        assert_eq!(content.error_code, Some(FailureReason::UnsupportedBodyType.code()));
    }

    #[test]
    fn test_engine_fault_is_not_an_error_message() {
        let (context, _) = signature_context("default");
        let mut profiles = StaticContextProvider::new();
        profiles.insert(context);
        let service = CmpService::with_dispatcher(profiles, Dispatcher::new(vec![Box::new(FaultyHandler)]));
        let requester = SigningCredential::generate_p256();
        let request = protected_request(&requester, PkiBody::Ir(vec![cert_req_msg(&requester, "device", 0)]));

        let result = service.process_der("default", &request.to_der().unwrap());

        assert!(matches!(result, Err(FatalError::Engine(_))));
    }

    #[test]
    fn test_process_batch_keeps_order() {
        let service = service();
        let requester = SigningCredential::generate_p256();
        let requests: Vec<Vec<u8>> = (0..4)
            .map(|id| {
                protected_request(&requester, PkiBody::Cr(vec![cert_req_msg(&requester, "device", id)]))
                    .to_der()
                    .unwrap()
            })
            .chain(std::iter::once(vec![0xff]))
            .collect();

        let responses = service.process_batch("default", &requests);

        assert_eq!(responses.len(), 5);
        for (id, response) in responses[..4].iter().enumerate() {
            let response = PkiMessage::from_der(response.as_ref().unwrap()).unwrap();
            let rep = response.body.cert_rep_message().unwrap();
            assert_eq!(rep.response[0].cert_req_id, id as i64);
        }
        let content = error_content(responses[4].as_ref().unwrap());
        assert_eq!(content.pki_status_info.failure_info(), PkiFailureInfo::BAD_DATA_FORMAT);
    }
}
