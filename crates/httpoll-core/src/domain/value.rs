//! Payloads and extracted values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrieved text body plus the wall-clock time it was retrieved.
///
/// Consumed once by the extractor and then discarded; payloads are never
/// retained across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub body: String,
    pub retrieved_at: DateTime<Utc>,
}

impl RawPayload {
    pub fn new(body: impl Into<String>, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            body: body.into(),
            retrieved_at,
        }
    }
}

/// A parsed value, tagged with the type its rule declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    Binary(bool),
    Multistate(i64),
    Numeric(f64),
    Alphanumeric(String),
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Binary(b) => write!(f, "{b}"),
            TypedValue::Multistate(n) => write!(f, "{n}"),
            TypedValue::Numeric(x) => write!(f, "{x}"),
            TypedValue::Alphanumeric(s) => f.write_str(s),
        }
    }
}

/// One (rule, value, timestamp) triple emitted to the external sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedValue {
    /// Rule that produced this value.
    pub rule_id: String,

    /// The typed value.
    pub value: TypedValue,

    /// Value time: either parsed from the payload or the cycle time.
    pub timestamp: DateTime<Utc>,

    /// Opaque display/format spec copied from the rule, for the sink.
    pub render_spec: Option<String>,
}
