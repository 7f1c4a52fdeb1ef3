//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the engine depends on: the certificate-issuing backend and
//! the per-profile configuration registry.

use spki::SubjectPublicKeyInfoOwned;
use std::sync::Arc;
use thiserror::Error;
use x509_cert::Certificate;

use crate::domain::asn1::{CertTemplate, PkiMessage, RevDetails};
use crate::domain::context::ConfigurationContext;

/// Error from the issuing backend.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// The backend refused the request
    #[error("Request rejected: {reason}")]
    Rejected { reason: String },

    /// Referenced certificate is not known to the backend
    #[error("Unknown certificate: {0}")]
    UnknownCertificate(String),

    /// Certificate could not be produced
    #[error("Certificate generation failed: {0}")]
    Generation(String),

    /// Backend not reachable or not ready
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<der::Error> for IssuanceError {
    fn from(error: der::Error) -> Self {
        IssuanceError::Generation(error.to_string())
    }
}

/// Certificate issued for a request, with the chain of its issuer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate: Certificate,
    pub issuer_chain: Vec<Certificate>,
}

/// Certificate-issuing backend (CA).
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait IssuanceBackend: Send + Sync {
    /// Issue a certificate for `template` bound to `public_key`.
    ///
    /// # Errors
    /// * `IssuanceError::Rejected` - Template not acceptable
    /// * `IssuanceError::Generation` - Certificate could not be built or signed
    fn issue(
        &self,
        template: &CertTemplate,
        public_key: &SubjectPublicKeyInfoOwned,
    ) -> Result<IssuedCertificate, IssuanceError>;

    /// Record the requester's `certConf`.
    fn acknowledge_confirmation(&self, request: &PkiMessage) -> Result<(), IssuanceError>;

    /// Revoke the referenced certificates.
    ///
    /// Returns the complete response message, or `None` when the backend
    /// produced no answer.
    fn revoke(
        &self,
        request: &PkiMessage,
        details: &[RevDetails],
    ) -> Result<Option<PkiMessage>, IssuanceError>;
}

impl<T: IssuanceBackend + ?Sized> IssuanceBackend for Arc<T> {
    fn issue(
        &self,
        template: &CertTemplate,
        public_key: &SubjectPublicKeyInfoOwned,
    ) -> Result<IssuedCertificate, IssuanceError> {
        (**self).issue(template, public_key)
    }

    fn acknowledge_confirmation(&self, request: &PkiMessage) -> Result<(), IssuanceError> {
        (**self).acknowledge_confirmation(request)
    }

    fn revoke(
        &self,
        request: &PkiMessage,
        details: &[RevDetails],
    ) -> Result<Option<PkiMessage>, IssuanceError> {
        (**self).revoke(request, details)
    }
}

/// Registry of per-profile configuration.
pub trait ContextProvider: Send + Sync {
    /// Context of `profile`, or `None` if the profile does not exist.
    fn context_for(&self, profile: &str) -> Option<Arc<ConfigurationContext>>;
}

impl<T: ContextProvider + ?Sized> ContextProvider for Arc<T> {
    fn context_for(&self, profile: &str) -> Option<Arc<ConfigurationContext>> {
        (**self).context_for(profile)
    }
}
