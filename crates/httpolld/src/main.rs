//! httpoll polling daemon.
//!
//! Loads a TOML config describing polled sources, then runs one polling
//! task per source until interrupted. Extracted values and alarm
//! transitions are written to the log; wire a different [`ValueSink`]
//! here to feed a store or alerting pipeline instead.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn, Level};

use httpoll_core::{
    init_tracing, Config, ConditionKind, ExtractedValue, PollCycleOrchestrator, PollScheduler,
    ValueSink,
};

#[derive(Parser)]
#[command(name = "httpolld")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scheduled HTTP data acquisition daemon", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "httpoll.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

/// Sink that renders values and alarm edges into the log.
struct LogSink;

#[async_trait]
impl ValueSink for LogSink {
    async fn emit(&self, value: ExtractedValue) {
        info!(
            rule = %value.rule_id,
            value = %value.value,
            timestamp = %value.timestamp,
            "value extracted"
        );
    }

    async fn alarm_raised(&self, kind: ConditionKind, message: &str, at: DateTime<Utc>) {
        warn!(condition = kind.id(), %message, %at, "alarm raised");
    }

    async fn alarm_cleared(&self, kind: ConditionKind, at: DateTime<Utc>) {
        info!(condition = kind.id(), %at, "alarm cleared");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config {}", cli.config.display()))?;
    let config: Config = toml::from_str(&raw)
        .with_context(|| format!("parsing config {}", cli.config.display()))?;

    if config.sources.is_empty() {
        anyhow::bail!("no sources configured in {}", cli.config.display());
    }

    let sink = Arc::new(LogSink);
    let mut scheduler = PollScheduler::new();
    let mut orchestrators = Vec::new();

    for source in config.sources {
        let period = source.poll_period();
        let warmup = source.warmup();
        let name = source.name.clone();
        let orchestrator = Arc::new(
            PollCycleOrchestrator::new(source, sink.clone())
                .with_context(|| format!("configuring source {name}"))?,
        );
        info!(source = %name, period_secs = period.as_secs(), "polling source");
        orchestrators.push(orchestrator.clone());
        scheduler.spawn(orchestrator, period, warmup);
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler.shutdown();
    for orchestrator in &orchestrators {
        orchestrator.shutdown().await;
    }
    Ok(())
}
