//! httpoll Core Library
//!
//! Scheduled HTTP data acquisition: each poll cycle fetches a raw text
//! payload from a remote endpoint with bounded retry, applies a set of
//! independently configured extraction rules to produce typed,
//! timestamped values, and maintains two independent alarm conditions
//! (retrieval failure, extraction failure) across cycles.

pub mod alarm;
pub mod backoff;
pub mod config;
pub mod domain;
pub mod extractor;
pub mod orchestrator;
pub mod retriever;
pub mod scheduler;
pub mod telemetry;

pub use alarm::{AlarmTracker, ConditionKind, ConditionState, Transition};
pub use backoff::{BackoffPolicy, FixedDelay};
pub use config::{Config, RuleConfig, SourceConfig};
pub use domain::{
    ConfigError, ExtractedValue, ExtractionError, ExtractionRule, HttpollError, RawPayload, Result,
    RetrievalError, TransportError, TypedValue, ValueType,
};
pub use extractor::{extract, Extraction};
pub use orchestrator::{PollCycleOrchestrator, ValueSink};
pub use retriever::{Retriever, DEFAULT_MAX_BODY_BYTES};
pub use scheduler::PollScheduler;
pub use telemetry::init_tracing;

/// httpoll version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
