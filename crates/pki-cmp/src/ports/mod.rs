//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - `inbound`: API this subsystem exposes
//! - `outbound`: Dependencies this subsystem requires

pub mod inbound;
pub mod outbound;
