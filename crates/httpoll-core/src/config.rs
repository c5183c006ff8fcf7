//! Source and rule configuration.
//!
//! Plain serde types suitable for a TOML config file, compiled into
//! runtime [`ExtractionRule`]s before polling starts. Pattern compilation
//! is the only fallible step; everything else defaults sensibly.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, ExtractionRule, ValueType};

/// Top-level daemon configuration: one entry per polled source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// One polled endpoint and its extraction rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Human-readable source name, used in logs.
    pub name: String,

    /// Endpoint URI fetched each cycle.
    pub endpoint: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after the first failed one.
    #[serde(default)]
    pub max_retries: u32,

    /// Poll period in seconds.
    #[serde(default = "default_poll_period_secs")]
    pub poll_period_secs: u64,

    /// One-shot warm-up delay before the first cycle, in milliseconds.
    /// Zero disables it. Replaces the legacy hardcoded per-host delay.
    #[serde(default)]
    pub warmup_ms: u64,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_period_secs() -> u64 {
    60
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            poll_period_secs: default_poll_period_secs(),
            warmup_ms: 0,
            rules: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }

    pub fn warmup(&self) -> Option<Duration> {
        (self.warmup_ms > 0).then(|| Duration::from_millis(self.warmup_ms))
    }

    /// Compile all rule configs, rejecting bad patterns and duplicate ids.
    pub fn compile_rules(&self) -> Result<Vec<Arc<ExtractionRule>>, ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        let mut compiled = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !seen.insert(rule.id.clone()) {
                return Err(ConfigError::DuplicateRule(rule.id.clone()));
            }
            compiled.push(Arc::new(rule.compile()?));
        }
        Ok(compiled)
    }
}

/// Serializable form of one extraction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub id: String,

    /// Regex with the value in capture group 1.
    pub value_pattern: String,

    /// Optional regex with the value time in capture group 1; absent
    /// means "stamp with cycle time".
    #[serde(default)]
    pub time_pattern: Option<String>,

    /// chrono format for the time capture.
    #[serde(default)]
    pub time_format: Option<String>,

    #[serde(default)]
    pub value_type: ValueType,

    /// For binary rules: the capture meaning false.
    #[serde(default)]
    pub binary_zero_value: Option<String>,

    #[serde(default)]
    pub ignore_if_missing: bool,

    /// Opaque display/format spec forwarded to the sink.
    #[serde(default)]
    pub render_spec: Option<String>,
}

impl RuleConfig {
    /// Compile the patterns into a runtime rule.
    pub fn compile(&self) -> Result<ExtractionRule, ConfigError> {
        let value_pattern =
            Regex::new(&self.value_pattern).map_err(|source| ConfigError::InvalidValuePattern {
                rule: self.id.clone(),
                source,
            })?;

        let time_pattern = match &self.time_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| {
                ConfigError::InvalidTimePattern {
                    rule: self.id.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(ExtractionRule {
            id: self.id.clone(),
            value_pattern,
            time_pattern,
            time_format: self.time_format.clone(),
            value_type: self.value_type,
            binary_zero_value: self.binary_zero_value.clone(),
            ignore_if_missing: self.ignore_if_missing,
            render_spec: self.render_spec.clone(),
        })
    }
}
