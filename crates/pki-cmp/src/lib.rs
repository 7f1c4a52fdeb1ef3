//! # CMP Message Engine
//!
//! Server side of the Certificate Management Protocol (RFC 4210) with CRMF
//! certificate requests (RFC 4211).
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): DER types, protection, validators, message building
//! - **Ports Layer** (`ports/`): Inbound API and outbound collaborator traits
//! - **Handlers** (`handlers/`): One handler per request family, selected by body type
//! - **Service Layer** (`service.rs`): Profile lookup, dispatch, DER boundary
//! - **Adapters** (`adapters/`): In-memory CA and static profile registry
//!
//! ## Request Flow
//!
//! ```text
//! DER ──decode──→ PkiMessage ──profile──→ Dispatcher ──body type──→ Handler
//!                                                                     │
//!                      protection check → POP check → IssuanceBackend
//!                                                                     │
//! DER ←──encode── protected response (MessageBuilder) ←───────────────┘
//! ```
//!
//! Protocol failures are answered with an unprotected `error` message.
//! Engine faults (encoding failures, contract violations) are returned as
//! [`FatalError`] instead.
//!
//! ## Protection
//!
//! | Strategy | `protectionAlg` | Notes |
//! |----------|-----------------|-------|
//! | Signature | ecdsa-with-SHA256, Ed25519 | Responder chain placed in `extraCerts` |
//! | PasswordBasedMac | 1.2.840.113533.7.66.13 | SHA-256 OWF, HMAC-SHA256 |
//! | PBMAC1 | 1.2.840.113549.1.5.14 | PBKDF2-HMAC-SHA256, HMAC-SHA256 |

pub mod adapters;
pub mod domain;
pub mod handlers;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export public API
pub use adapters::{InMemoryCa, StaticContextProvider};
pub use domain::algorithms::{KeyError, SignatureAlgorithm, SigningCredential, VerifyingKey};
pub use domain::asn1::{BodyType, PkiBody, PkiHeader, PkiMessage};
pub use domain::builder::MessageBuilder;
pub use domain::context::{ConfigurationContext, ContextError};
pub use domain::error_message::ErrorMessageFactory;
pub use domain::errors::{CmpError, FailureReason, FatalError, PkiFailureInfo};
pub use domain::protection::{
    PasswordMacProtection, Pbmac1Protection, ProtectionStrategy, SignatureProtection,
};
pub use handlers::{Dispatcher, MessageHandler};
pub use ports::inbound::CmpMessageApi;
pub use ports::outbound::{ContextProvider, IssuanceBackend, IssuanceError, IssuedCertificate};
pub use service::CmpService;
