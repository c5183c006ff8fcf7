//! End-to-end poll cycle tests: fetch, extract, alarm lifecycle.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use httpoll_core::{
    ConditionKind, ExtractedValue, ExtractionRule, FixedDelay, PollCycleOrchestrator, Retriever,
    SourceConfig, TypedValue, ValueSink, ValueType,
};
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// HTTP stub whose status and body can be changed between cycles.
struct Stub {
    status: AtomicU16,
    body: Mutex<String>,
}

impl Stub {
    fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            status: AtomicU16::new(200),
            body: Mutex::new(body.to_string()),
        })
    }

    fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }
}

async fn spawn_stub(stub: Arc<Stub>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let status = stub.status.load(Ordering::SeqCst);
            let body = stub.body.lock().unwrap().clone();

            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/data")
}

/// Records everything the orchestrator hands to the external collaborator.
#[derive(Default)]
struct CollectingSink {
    values: Mutex<Vec<ExtractedValue>>,
    alarms: Mutex<Vec<(String, u8, String)>>,
}

impl CollectingSink {
    fn values(&self) -> Vec<ExtractedValue> {
        self.values.lock().unwrap().clone()
    }

    fn alarms(&self) -> Vec<(String, u8, String)> {
        self.alarms.lock().unwrap().clone()
    }

    fn clear_values(&self) {
        self.values.lock().unwrap().clear();
    }
}

#[async_trait]
impl ValueSink for CollectingSink {
    async fn emit(&self, value: ExtractedValue) {
        self.values.lock().unwrap().push(value);
    }

    async fn alarm_raised(&self, kind: ConditionKind, message: &str, _at: DateTime<Utc>) {
        self.alarms
            .lock()
            .unwrap()
            .push(("raised".into(), kind.id(), message.to_string()));
    }

    async fn alarm_cleared(&self, kind: ConditionKind, _at: DateTime<Utc>) {
        self.alarms
            .lock()
            .unwrap()
            .push(("cleared".into(), kind.id(), String::new()));
    }
}

fn orchestrator(endpoint: &str, sink: Arc<CollectingSink>) -> PollCycleOrchestrator {
    let mut source = SourceConfig::new("test-source", endpoint);
    source.timeout_secs = 5;
    source.max_retries = 0;

    PollCycleOrchestrator::new(source, sink)
        .expect("build orchestrator")
        .with_retriever(
            Retriever::new().with_backoff(Arc::new(FixedDelay::new(Duration::ZERO))),
        )
}

fn temp_rule() -> ExtractionRule {
    ExtractionRule::new("temp", Regex::new(r"T=(\d+\.\d+)").unwrap())
        .with_value_type(ValueType::Numeric)
        .with_time_pattern(Regex::new(r"t=(\S+)").unwrap(), None)
}

fn x_rule() -> ExtractionRule {
    ExtractionRule::new("x", Regex::new(r"X=(\d+)").unwrap()).with_value_type(ValueType::Numeric)
}

#[tokio::test]
async fn partial_failure_emits_matches_and_raises_extraction_alarm() {
    let stub = Stub::new("T=23.5 t=2021-01-01T00:00:00");
    let endpoint = spawn_stub(stub.clone()).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(temp_rule());
    orch.add_rule(x_rule());

    orch.poll_once().await;

    // The matching rule still emitted.
    let values = sink.values();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].rule_id, "temp");
    assert_eq!(values[0].value, TypedValue::Numeric(23.5));
    assert_eq!(
        values[0].timestamp,
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
    );

    // The mismatching rule drove the extraction condition.
    let condition = orch.condition(ConditionKind::ExtractionFailure);
    assert!(condition.active);
    assert_eq!(condition.message, "pattern for x did not match");
    assert!(!orch.condition(ConditionKind::RetrievalFailure).active);

    // Once the payload matches everything, the condition clears.
    stub.set_body("T=24.0 t=2021-01-01T00:05:00 X=7");
    sink.clear_values();
    orch.poll_once().await;

    assert!(!orch.condition(ConditionKind::ExtractionFailure).active);
    assert_eq!(sink.values().len(), 2);
    assert!(sink
        .alarms()
        .contains(&("cleared".into(), ConditionKind::ExtractionFailure.id(), String::new())));
}

#[tokio::test]
async fn retrieval_failure_aborts_cycle_and_both_conditions_can_be_active() {
    let stub = Stub::new("nothing to match");
    let endpoint = spawn_stub(stub.clone()).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(x_rule());

    // Cycle 1: transport succeeds, extraction fails.
    orch.poll_once().await;
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);
    assert!(!orch.condition(ConditionKind::RetrievalFailure).active);

    // Cycle 2: transport fails; extraction is not attempted, so its
    // stale condition stays active alongside the retrieval one.
    stub.set_status(500);
    sink.clear_values();
    orch.poll_once().await;

    assert!(orch.condition(ConditionKind::RetrievalFailure).active);
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);
    assert!(sink.values().is_empty());

    // Cycle 3: transport recovers; conditions clear independently.
    stub.set_status(200);
    stub.set_body("X=1");
    orch.poll_once().await;

    assert!(!orch.condition(ConditionKind::RetrievalFailure).active);
    assert!(!orch.condition(ConditionKind::ExtractionFailure).active);
}

#[tokio::test]
async fn retrieval_error_message_reaches_the_sink() {
    let stub = Stub::new("");
    stub.set_status(503);
    let endpoint = spawn_stub(stub).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());

    orch.poll_once().await;

    let alarms = sink.alarms();
    assert_eq!(alarms.len(), 1);
    let (edge, id, message) = &alarms[0];
    assert_eq!(edge, "raised");
    assert_eq!(*id, ConditionKind::RetrievalFailure.id());
    assert!(message.contains("503"));
    assert!(message.contains(&endpoint));
}

#[tokio::test]
async fn ignored_mismatch_completes_cleanly_with_zero_emissions() {
    let stub = Stub::new("unrelated payload");
    let endpoint = spawn_stub(stub).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(x_rule().ignore_if_missing(true));

    orch.poll_once().await;

    assert!(sink.values().is_empty());
    assert!(!orch.condition(ConditionKind::ExtractionFailure).active);
    assert!(!orch.condition(ConditionKind::RetrievalFailure).active);
    assert!(sink.alarms().is_empty());
}

#[tokio::test]
async fn removing_the_responsible_rule_clears_the_condition_immediately() {
    let stub = Stub::new("T=20.0 t=2021-01-01T00:00:00");
    let endpoint = spawn_stub(stub).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(temp_rule());
    orch.add_rule(x_rule());

    orch.poll_once().await;
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);

    // No cycle in between: removal itself must clear.
    orch.remove_rule("x").await;
    assert!(!orch.condition(ConditionKind::ExtractionFailure).active);
}

#[tokio::test]
async fn removing_an_unrelated_rule_leaves_the_condition_for_the_next_cycle() {
    let stub = Stub::new("T=20.0 t=2021-01-01T00:00:00");
    let endpoint = spawn_stub(stub).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(temp_rule());
    orch.add_rule(x_rule());

    orch.poll_once().await;
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);

    orch.remove_rule("temp").await;
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);

    // Next cycle re-evaluates with the remaining rule still failing.
    orch.poll_once().await;
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);
}

#[tokio::test]
async fn rules_added_between_cycles_take_effect_on_the_next_snapshot() {
    let stub = Stub::new("T=21.5 t=2021-01-01T00:00:00 X=9");
    let endpoint = spawn_stub(stub).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(temp_rule());

    orch.poll_once().await;
    assert_eq!(sink.values().len(), 1);

    orch.add_rule(x_rule());
    sink.clear_values();
    orch.poll_once().await;

    let values = sink.values();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1].rule_id, "x");
    assert_eq!(values[1].value, TypedValue::Numeric(9.0));
}

#[tokio::test]
async fn shutdown_clears_a_still_active_extraction_condition() {
    let stub = Stub::new("no match here");
    let endpoint = spawn_stub(stub).await;
    let sink = Arc::new(CollectingSink::default());
    let orch = orchestrator(&endpoint, sink.clone());
    orch.add_rule(x_rule());

    orch.poll_once().await;
    assert!(orch.condition(ConditionKind::ExtractionFailure).active);

    orch.shutdown().await;
    assert!(!orch.condition(ConditionKind::ExtractionFailure).active);
}
