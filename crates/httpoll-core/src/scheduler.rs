//! Fixed-period polling scheduler.
//!
//! One tokio task per source. Cycles never overlap for a given source
//! because the task awaits each cycle before ticking again; a cycle that
//! overruns the period causes ticks to be skipped, not queued. A slow or
//! stalled source only blocks its own task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::orchestrator::PollCycleOrchestrator;

/// Drive `cycle` at `period`, after an optional one-shot warm-up delay.
///
/// The first cycle runs as soon as the warm-up elapses; each subsequent
/// cycle waits for the next tick that has not already passed.
async fn poll_loop<F, Fut>(mut cycle: F, period: Duration, warmup: Option<Duration>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    if let Some(delay) = warmup {
        tokio::time::sleep(delay).await;
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        cycle().await;
    }
}

/// Owns the polling tasks for a set of sources.
#[derive(Default)]
pub struct PollScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling a source at `period`, after its configured warm-up.
    pub fn spawn(
        &mut self,
        orchestrator: Arc<PollCycleOrchestrator>,
        period: Duration,
        warmup: Option<Duration>,
    ) {
        if let Some(delay) = warmup {
            info!(
                source = orchestrator.source_name(),
                delay_ms = delay.as_millis() as u64,
                "warm-up delay before first cycle"
            );
        }

        let handle = tokio::spawn(poll_loop(
            move || {
                let orchestrator = orchestrator.clone();
                async move { orchestrator.poll_once().await }
            },
            period,
            warmup,
        ));
        self.handles.push(handle);
    }

    /// Stop all polling tasks.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
