//! Token records, lifecycle states, quotas, and identifier generation.

pub mod generator;
pub mod quota;
pub mod record;
pub mod secret;

pub use generator::*;
pub use quota::*;
pub use record::*;
pub use secret::*;

/// Arbitrary key/value payload attached to a token at issuance; opaque to the manager.
pub type Extension = serde_json::Map<String, serde_json::Value>;

/// Token type used when callers do not scope their tokens.
pub const DEFAULT_TOKEN_TYPE: &str = "default";
