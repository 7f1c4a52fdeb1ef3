//! # Validators
//!
//! Pure checks run by the handlers: protection first, then POP.

pub mod mac;
pub mod pop;
pub mod protection;
pub mod signature;

pub use mac::{MacProtectionValidator, MacScheme};
pub use pop::PopValidator;
pub use protection::ProtectionValidator;
pub use signature::SignatureProtectionValidator;
