//! Shared error type and capability-capped HTTP client for Papyra.

pub mod error;
pub mod sandbox;

pub use error::{PapyraError, Result};
pub use sandbox::SandboxClient;
