//! Hearth SDK
//!
//! Shared types for Hearth components: the error taxonomy and the wire
//! envelopes exchanged with the presentation layer.

/// Error types and handling
pub mod errors;

/// API request/response envelopes
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, HearthErrorExt};
pub use types::{ApiAction, ApiFailure, ApiRequest, ApiSuccess, UnknownAction};
