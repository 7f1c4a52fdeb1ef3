//! # Adapters Module
//!
//! Implementations of the outbound ports.
//!
//! - `in_memory_ca`: issuing backend held in process memory
//! - `profiles`: fixed profile registry

pub mod in_memory_ca;
pub mod profiles;

pub use in_memory_ca::InMemoryCa;
pub use profiles::StaticContextProvider;
