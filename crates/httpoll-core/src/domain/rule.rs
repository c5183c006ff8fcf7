//! Extraction rule model.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Type tag controlling how a captured string is parsed into a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Boolean; the capture is compared against the rule's zero-value.
    Binary,
    /// Integer state index.
    Multistate,
    /// Floating point.
    Numeric,
    /// Raw text, passed through unparsed.
    #[default]
    Alphanumeric,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Binary => "binary",
            ValueType::Multistate => "multistate",
            ValueType::Numeric => "numeric",
            ValueType::Alphanumeric => "alphanumeric",
        };
        f.write_str(name)
    }
}

/// One configured extraction target.
///
/// Immutable once built; the extractor only ever borrows rules for the
/// duration of a cycle. The value pattern's first capture group (or the
/// whole match when there is none) is the captured value; same for the
/// optional time pattern. A rule without a time pattern stamps values
/// with the cycle time.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// Identifier reported in extracted values and failure messages.
    pub id: String,

    /// Pattern locating the value inside the payload.
    pub value_pattern: Regex,

    /// Optional pattern locating the value's timestamp inside the payload.
    pub time_pattern: Option<Regex>,

    /// chrono format string for parsing the time capture.
    /// `None` uses [`DEFAULT_TIME_FORMAT`].
    pub time_format: Option<String>,

    /// How the value capture is parsed.
    pub value_type: ValueType,

    /// For binary rules: the capture text meaning "false"/zero.
    pub binary_zero_value: Option<String>,

    /// Suppress both the value and the failure contribution when this
    /// rule's patterns do not match.
    pub ignore_if_missing: bool,

    /// Opaque display/format spec, passed through to the sink untouched.
    pub render_spec: Option<String>,
}

/// Format applied to time captures when a rule does not configure one.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl ExtractionRule {
    /// Create a rule with the mandatory fields; everything else defaults off.
    pub fn new(id: impl Into<String>, value_pattern: Regex) -> Self {
        Self {
            id: id.into(),
            value_pattern,
            time_pattern: None,
            time_format: None,
            value_type: ValueType::default(),
            binary_zero_value: None,
            ignore_if_missing: false,
            render_spec: None,
        }
    }

    /// Set the time pattern and (optionally) its parse format.
    pub fn with_time_pattern(mut self, pattern: Regex, format: Option<&str>) -> Self {
        self.time_pattern = Some(pattern);
        self.time_format = format.map(str::to_string);
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_zero_value(mut self, zero: &str) -> Self {
        self.binary_zero_value = Some(zero.to_string());
        self
    }

    pub fn ignore_if_missing(mut self, ignore: bool) -> Self {
        self.ignore_if_missing = ignore;
        self
    }

    pub fn with_render_spec(mut self, spec: &str) -> Self {
        self.render_spec = Some(spec.to_string());
        self
    }
}
