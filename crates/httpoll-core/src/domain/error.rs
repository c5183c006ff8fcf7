//! Domain-level error taxonomy for httpoll.
//!
//! Two recovery layers exist below the public surface: a `TransportError`
//! covers one failed fetch attempt and is retried away internally; an
//! `ExtractionError` covers one rule's mismatch and never stops the other
//! rules. Only `RetrievalError` (retries exhausted) and the aggregated
//! first `ExtractionError` escape a poll cycle, as alarm conditions.

/// One failed fetch attempt. Recovered locally via retry; surfaces to
/// callers only inside [`RetrievalError`] once retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("unexpected response status {code}")]
    Status { code: u16 },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Retries exhausted against an endpoint. Carries the last observed cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("retrieval from {endpoint} failed after {attempts} attempts: {cause}")]
pub struct RetrievalError {
    pub endpoint: String,
    pub attempts: u32,
    pub cause: TransportError,
}

/// One rule's extraction failure, as a tagged kind plus parameters.
///
/// Rendered to text only at the boundary (alarm message, logs); the core
/// passes the structured value around.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("pattern for {rule} did not match")]
    PatternMismatch { rule: String },

    #[error("value {raw:?} for {rule} could not be parsed as {value_type}")]
    UnparsableValue {
        rule: String,
        raw: String,
        value_type: crate::domain::rule::ValueType,
    },

    #[error("time {raw:?} for {rule} could not be parsed")]
    UnparsableTime { rule: String, raw: String },
}

impl ExtractionError {
    /// The rule this failure is attributable to.
    pub fn rule(&self) -> &str {
        match self {
            ExtractionError::PatternMismatch { rule }
            | ExtractionError::UnparsableValue { rule, .. }
            | ExtractionError::UnparsableTime { rule, .. } => rule,
        }
    }
}

/// Errors produced while compiling source/rule configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value pattern for rule {rule}: {source}")]
    InvalidValuePattern {
        rule: String,
        source: regex::Error,
    },

    #[error("invalid time pattern for rule {rule}: {source}")]
    InvalidTimePattern {
        rule: String,
        source: regex::Error,
    },

    #[error("duplicate rule id: {0}")]
    DuplicateRule(String),
}

/// httpoll domain errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpollError {
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for httpoll domain operations.
pub type Result<T> = std::result::Result<T, HttpollError>;
