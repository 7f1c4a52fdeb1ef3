//! # PKI Runtime
//!
//! Local host for the CMP engine.
//!
//! ## Modular Structure
//!
//! - `config` - `RuntimeConfig` loaded from `PKI_*` environment variables
//! - `runtime` - Logging setup and one-time construction of CA, profile and service
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from env)
//! 2. Validate the shared secret is not all zero
//! 3. Initialize logging
//! 4. Build the CA and profile
//! 5. Answer requests

pub mod config;
pub mod runtime;

pub use config::{ConfigError, ProtectionKind, RuntimeConfig};
pub use runtime::{init_logging, CmpRuntime, RuntimeError};
