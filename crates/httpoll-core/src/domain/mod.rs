//! Domain models for httpoll.
//!
//! Canonical definitions for the core entities:
//! - `ExtractionRule`: Immutable per-value extraction spec
//! - `RawPayload`: One retrieved text body with its retrieval time
//! - `ExtractedValue`: One typed, timestamped value bound for the sink
//! - Error taxonomy for retrieval and extraction

pub mod error;
pub mod rule;
pub mod value;

// Re-export main types and errors
pub use error::{ConfigError, ExtractionError, HttpollError, Result, RetrievalError, TransportError};
pub use rule::{ExtractionRule, ValueType};
pub use value::{ExtractedValue, RawPayload, TypedValue};
