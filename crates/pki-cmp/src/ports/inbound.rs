//! # Inbound Ports (Driving Ports / API)
//!
//! The public API of the CMP engine.

use crate::domain::asn1::PkiMessage;
use crate::domain::errors::{CmpError, FatalError};

/// Primary CMP message API.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait CmpMessageApi: Send + Sync {
    /// Dispatch a decoded request for `profile` and build the protected response.
    ///
    /// # Errors
    /// Any classified failure. Callers turn non-fatal errors into error
    /// messages with `ErrorMessageFactory`.
    fn handle_message(&self, profile: &str, request: &PkiMessage) -> Result<PkiMessage, CmpError>;

    /// Decode, dispatch and encode.
    ///
    /// Protocol failures (including undecodable input) are answered with a
    /// DER error message; only engine faults are returned as errors.
    fn process_der(&self, profile: &str, request: &[u8]) -> Result<Vec<u8>, FatalError>;
}
