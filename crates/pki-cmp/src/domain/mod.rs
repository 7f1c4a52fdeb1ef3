//! # Domain Layer
//!
//! Pure protocol logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod algorithms;
pub mod asn1;
pub mod builder;
pub mod context;
pub mod error_message;
pub mod errors;
pub mod mac;
pub mod oids;
pub mod protection;
pub mod validators;
