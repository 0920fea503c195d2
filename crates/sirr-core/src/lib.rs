//! Sirr Core Library
//!
//! Shared types and host-collaborator contracts for Sirr authentication
//! backends.

pub mod error;
pub mod system;

pub use error::{Error, ErrorKind, Result};
pub use system::{ReplicationState, SystemView};

/// Sirr version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
