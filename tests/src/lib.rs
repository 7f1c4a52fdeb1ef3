//! # PKI Platform Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (protection, full request)
//! └── src/integration/  # End-to-end CMP transactions through the service
//!     ├── flows.rs        # ir → ip → certConf → pkiconf, rr → rp, MAC profiles
//!     └── error_flows.rs  # Error messages at the DER boundary
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pki-tests
//!
//! # By category
//! cargo test -p pki-tests integration::flows
//! cargo test -p pki-tests integration::error_flows
//!
//! # Benchmarks
//! cargo bench -p pki-tests
//! ```

pub mod integration;
