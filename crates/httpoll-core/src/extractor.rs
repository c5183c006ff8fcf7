//! Rule-driven value extraction over a retrieved payload.
//!
//! Every rule is processed independently and in order; one malformed rule
//! never suppresses extraction from the others. Only the first failure
//! (by iteration order) is aggregated into the cycle result, so the alarm
//! condition always describes a single, stable culprit.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::domain::rule::DEFAULT_TIME_FORMAT;
use crate::domain::{ExtractedValue, ExtractionError, ExtractionRule, RawPayload, TypedValue, ValueType};

/// Outcome of running a rule set over one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// One value per fully-matched rule, in rule order.
    pub values: Vec<ExtractedValue>,

    /// First non-ignored failure encountered, if any.
    pub failure: Option<ExtractionError>,
}

/// Apply `rules` to `payload`, stamping pattern-less rules with `cycle_time`.
///
/// Mismatch policy per rule: `ignore_if_missing` suppresses both the
/// value and the failure contribution; otherwise the mismatch becomes a
/// candidate failure. A capture that matches but cannot be parsed is
/// always a candidate failure, ignore flag or not. First candidate wins;
/// later rules still run and still emit.
pub fn extract(
    payload: &RawPayload,
    rules: &[std::sync::Arc<ExtractionRule>],
    cycle_time: DateTime<Utc>,
) -> Extraction {
    let mut values = Vec::new();
    let mut failure: Option<ExtractionError> = None;

    for rule in rules {
        match extract_one(payload, rule, cycle_time) {
            Ok(Some(value)) => values.push(value),
            Ok(None) => {}
            Err(err) => {
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }
    }

    Extraction { values, failure }
}

/// Run one rule. `Ok(None)` means an ignored mismatch: no value, no error.
fn extract_one(
    payload: &RawPayload,
    rule: &ExtractionRule,
    cycle_time: DateTime<Utc>,
) -> Result<Option<ExtractedValue>, ExtractionError> {
    let raw = match capture(&rule.value_pattern, &payload.body) {
        Some(raw) => raw,
        None => {
            return if rule.ignore_if_missing {
                Ok(None)
            } else {
                Err(ExtractionError::PatternMismatch {
                    rule: rule.id.clone(),
                })
            };
        }
    };

    let value = parse_typed(rule, raw)?;

    let timestamp = match &rule.time_pattern {
        Some(pattern) => match capture(pattern, &payload.body) {
            Some(raw_time) => parse_time(rule, raw_time)?,
            None => {
                return if rule.ignore_if_missing {
                    Ok(None)
                } else {
                    Err(ExtractionError::PatternMismatch {
                        rule: rule.id.clone(),
                    })
                };
            }
        },
        None => cycle_time,
    };

    Ok(Some(ExtractedValue {
        rule_id: rule.id.clone(),
        value,
        timestamp,
        render_spec: rule.render_spec.clone(),
    }))
}

/// First capture group of the first match, or the whole match when the
/// pattern has no groups.
fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    let caps = pattern.captures(text)?;
    match caps.get(1) {
        Some(group) => Some(group.as_str()),
        None => caps.get(0).map(|m| m.as_str()),
    }
}

/// Parse a capture according to the rule's value type.
fn parse_typed(rule: &ExtractionRule, raw: &str) -> Result<TypedValue, ExtractionError> {
    let trimmed = raw.trim();
    match rule.value_type {
        ValueType::Binary => {
            let zero = match &rule.binary_zero_value {
                Some(zero) => trimmed.eq_ignore_ascii_case(zero),
                None => trimmed.is_empty() || trimmed == "0" || trimmed.eq_ignore_ascii_case("false"),
            };
            Ok(TypedValue::Binary(!zero))
        }
        ValueType::Multistate => trimmed
            .parse::<i64>()
            .map(TypedValue::Multistate)
            .map_err(|_| unparsable(rule, raw)),
        ValueType::Numeric => trimmed
            .parse::<f64>()
            .map(TypedValue::Numeric)
            .map_err(|_| unparsable(rule, raw)),
        ValueType::Alphanumeric => Ok(TypedValue::Alphanumeric(raw.to_string())),
    }
}

fn unparsable(rule: &ExtractionRule, raw: &str) -> ExtractionError {
    ExtractionError::UnparsableValue {
        rule: rule.id.clone(),
        raw: raw.to_string(),
        value_type: rule.value_type,
    }
}

/// Parse a time capture with the rule's format (naive, taken as UTC).
fn parse_time(rule: &ExtractionRule, raw: &str) -> Result<DateTime<Utc>, ExtractionError> {
    let format = rule.time_format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT);
    NaiveDateTime::parse_from_str(raw.trim(), format)
        .map(|naive| naive.and_utc())
        .map_err(|_| ExtractionError::UnparsableTime {
            rule: rule.id.clone(),
            raw: raw.to_string(),
        })
}
