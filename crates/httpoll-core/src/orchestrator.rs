//! One-source poll cycle orchestration.
//!
//! Composes the retriever, extractor and alarm tracker into a single
//! `poll_once` entry point driven by an external scheduler. Each cycle:
//! fetch, then on failure raise the retrieval condition and abort; on
//! success clear it, snapshot the rule set, extract, emit every value,
//! and raise/clear the extraction condition from the aggregated result.
//!
//! The orchestrator owns all per-source state; nothing here is shared
//! across sources. Cycles for one source are assumed never to overlap
//! (the scheduler awaits each cycle before starting the next); rule
//! mutation may happen concurrently with a cycle and only affects the
//! next snapshot.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::alarm::{AlarmTracker, ConditionKind, ConditionState, Transition};
use crate::config::SourceConfig;
use crate::domain::{ExtractedValue, ExtractionRule, Result};
use crate::extractor::{extract, Extraction};
use crate::retriever::Retriever;

/// External collaborator receiving values and alarm transitions.
///
/// Rendering and storage live behind this trait; the core emits
/// structured data and never formats for display.
#[async_trait]
pub trait ValueSink: Send + Sync {
    /// One extracted value, at most one per rule per cycle.
    async fn emit(&self, value: ExtractedValue);

    /// A condition went active (or its message changed while active).
    async fn alarm_raised(&self, kind: ConditionKind, message: &str, at: DateTime<Utc>);

    /// A condition went inactive.
    async fn alarm_cleared(&self, kind: ConditionKind, at: DateTime<Utc>);
}

/// Per-source poll cycle executor.
pub struct PollCycleOrchestrator {
    source: SourceConfig,
    retriever: Retriever,
    alarms: AlarmTracker,
    rules: RwLock<Vec<Arc<ExtractionRule>>>,
    /// Rule responsible for the currently-active extraction condition.
    failing_rule: Mutex<Option<String>>,
    sink: Arc<dyn ValueSink>,
}

impl PollCycleOrchestrator {
    /// Build an orchestrator for one source, compiling its rules.
    pub fn new(source: SourceConfig, sink: Arc<dyn ValueSink>) -> Result<Self> {
        let rules = source.compile_rules()?;
        Ok(Self {
            source,
            retriever: Retriever::new(),
            alarms: AlarmTracker::new(),
            rules: RwLock::new(rules),
            failing_rule: Mutex::new(None),
            sink,
        })
    }

    /// Substitute the retriever (tests inject zero backoff).
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source.name
    }

    /// Run one poll cycle stamped with the current wall clock.
    pub async fn poll_once(&self) {
        self.poll_at(Utc::now()).await;
    }

    /// Run one poll cycle stamped with `cycle_time`.
    pub async fn poll_at(&self, cycle_time: DateTime<Utc>) {
        let payload = match self
            .retriever
            .fetch(&self.source.endpoint, self.source.timeout(), self.source.max_retries)
            .await
        {
            Ok(payload) => payload,
            Err(err) => {
                warn!(source = %self.source.name, error = %err, "poll cycle aborted");
                self.apply(ConditionKind::RetrievalFailure, Some(err.to_string()), cycle_time)
                    .await;
                return;
            }
        };

        self.apply(ConditionKind::RetrievalFailure, None, cycle_time)
            .await;

        // Snapshot so concurrent rule mutation cannot expose a
        // half-mutated set to this cycle.
        let rules: Vec<Arc<ExtractionRule>> = self.rules.read().unwrap().clone();

        let Extraction { values, failure } = extract(&payload, &rules, cycle_time);
        debug!(
            source = %self.source.name,
            emitted = values.len(),
            failed = failure.is_some(),
            "extraction finished"
        );
        for value in values {
            self.sink.emit(value).await;
        }

        match failure {
            Some(err) => {
                *self.failing_rule.lock().unwrap() = Some(err.rule().to_string());
                self.apply(ConditionKind::ExtractionFailure, Some(err.to_string()), cycle_time)
                    .await;
            }
            None => {
                *self.failing_rule.lock().unwrap() = None;
                self.apply(ConditionKind::ExtractionFailure, None, cycle_time)
                    .await;
            }
        }
    }

    /// Add a rule; takes effect from the next cycle's snapshot.
    pub fn add_rule(&self, rule: ExtractionRule) {
        self.rules.write().unwrap().push(Arc::new(rule));
    }

    /// Remove a rule by id.
    ///
    /// When the removed rule is the one responsible for the active
    /// extraction condition, the condition is cleared immediately: it
    /// cannot outlive the last rule able to trigger it. Any other active
    /// condition is left for the next cycle to re-evaluate.
    pub async fn remove_rule(&self, id: &str) {
        self.rules.write().unwrap().retain(|rule| rule.id != id);

        let responsible = {
            let mut failing = self.failing_rule.lock().unwrap();
            if failing.as_deref() == Some(id) {
                *failing = None;
                true
            } else {
                false
            }
        };
        if responsible {
            self.apply(ConditionKind::ExtractionFailure, None, Utc::now())
                .await;
        }
    }

    /// Current state of one condition slot.
    pub fn condition(&self, kind: ConditionKind) -> ConditionState {
        self.alarms.state(kind)
    }

    /// Clear any still-active extraction condition at teardown.
    pub async fn shutdown(&self) {
        *self.failing_rule.lock().unwrap() = None;
        self.apply(ConditionKind::ExtractionFailure, None, Utc::now())
            .await;
    }

    /// Drive one condition slot from a cycle outcome: `Some(message)`
    /// raises, `None` clears. Forwards actual edges to the sink.
    async fn apply(&self, kind: ConditionKind, outcome: Option<String>, at: DateTime<Utc>) {
        match outcome {
            Some(message) => match self.alarms.raise(kind, &message, at) {
                Transition::Raised | Transition::Updated => {
                    info!(source = %self.source.name, condition = %kind, %message, "alarm raised");
                    self.sink.alarm_raised(kind, &message, at).await;
                }
                _ => {}
            },
            None => {
                if self.alarms.clear(kind, at) == Transition::Cleared {
                    info!(source = %self.source.name, condition = %kind, "alarm cleared");
                    self.sink.alarm_cleared(kind, at).await;
                }
            }
        }
    }
}
