//! # Error Messages
//!
//! Unprotected `error` messages (RFC 4210 Section 5.3.21) for classified
//! failures. Sender and recipient are always the NULL identity.

use der::Encode;

use super::asn1::header::null_name;
use super::asn1::{ErrorMsgContent, PkiBody, PkiHeader, PkiMessage, PkiStatusInfo};
use super::errors::{CmpError, FailureReason, FatalError, PkiFailureInfo};

/// Reason description first, then the free-text detail if any.
fn error_details(reason: FailureReason, detail: Option<String>) -> Vec<String> {
    let mut details = vec![reason.description().to_owned()];
    details.extend(detail);
    details
}

/// Builds RFC error messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorMessageFactory;

impl ErrorMessageFactory {
    pub fn new() -> Self {
        Self
    }

    /// Error message for a classification, not correlated with any request.
    pub fn create(
        &self,
        failure_info: PkiFailureInfo,
        reason: FailureReason,
        details: Option<String>,
    ) -> Result<PkiMessage, FatalError> {
        let status = PkiStatusInfo::rejection(
            failure_info,
            format!("{}: {}", reason.name(), reason.description()),
        )?;

        Ok(PkiMessage {
            header: PkiHeader::new(null_name(), null_name()),
            body: PkiBody::Error(ErrorMsgContent {
                pki_status_info: status,
                error_code: Some(reason.code()),
                error_details: Some(error_details(reason, details)),
            }),
            protection: None,
            extra_certs: None,
        })
    }

    pub fn create_for_error(&self, error: &CmpError) -> Result<PkiMessage, FatalError> {
        self.create(
            error.failure_info(),
            error.reason(),
            error.detail().map(str::to_owned),
        )
    }

    /// As [`create_for_error`](Self::create_for_error), echoing the request's
    /// transaction id and answering its sender nonce.
    pub fn create_for_request(
        &self,
        request: &PkiHeader,
        error: &CmpError,
    ) -> Result<PkiMessage, FatalError> {
        let mut message = self.create_for_error(error)?;
        message.header.trans_id = request.trans_id.clone();
        message.header.recip_nonce = request.sender_nonce.clone();
        Ok(message)
    }

    /// DER of an error message for a classification.
    pub fn encode(
        &self,
        failure_info: PkiFailureInfo,
        reason: FailureReason,
        details: Option<String>,
    ) -> Result<Vec<u8>, FatalError> {
        Ok(self.create(failure_info, reason, details)?.to_der()?)
    }
}
