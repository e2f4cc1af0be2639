mod cli;
mod config;

use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use event_monitor::EventSink;
use gate_core::{load_config, Gate, GateConfig};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(ref policy) = cli.policy {
        cfg.policy_file = policy.clone();
    }

    // 3. Init tracing-subscriber with JSON format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(
        config_file = %cli.config.display(),
        policy_file = %cfg.policy_file.display(),
        event_log = %cfg.logging.event_log_path.display(),
        "text-gate starting"
    );

    // 4. Start the event log.
    let (sink, sink_handle) = EventSink::start(
        &cfg.logging.event_log_path,
        cfg.logging.min_event_severity,
    )
    .await
    .context("failed to start event log")?;

    // 5. Load the engine config.  A missing file falls back to the built-in
    //    rule catalogue; a present-but-invalid file is fatal.
    let gate_config = if cfg.policy_file.exists() {
        load_config(&cfg.policy_file).context("failed to load engine config")?
    } else {
        warn!(
            path = %cfg.policy_file.display(),
            "engine config not found; using built-in defaults"
        );
        GateConfig::default()
    };

    let gate = Gate::from_config(gate_config)
        .context("failed to initialize gate")?
        .with_sink(sink.clone());

    // 6. Collect inputs: positional args, or newline-delimited stdin.
    let inputs: Vec<String> = if cli.inputs.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .context("failed to read stdin")?
    } else {
        cli.inputs.clone()
    };

    // 7. Evaluate, record, and emit one verdict JSON line per input.
    for text in &inputs {
        let verdict = gate.evaluate(text);
        let category = verdict.action.to_string();

        if let Some(alert) = gate.record_and_check(&verdict, &category, cli.subject.as_deref()) {
            warn!(
                category = %alert.category,
                count = alert.count,
                "{}",
                alert.message
            );
        }

        println!("{}", serde_json::to_string(&verdict)?);
    }

    // 8. Summarize.
    let snapshot = gate.dashboard_snapshot();
    info!(
        inputs = inputs.len(),
        total_events = snapshot.total_events,
        total_alerts = snapshot.total_alerts,
        "text-gate finished"
    );

    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    // 9. Close the event log and wait for the final flush.
    drop(gate);
    drop(sink);
    let records = sink_handle.await.context("event log writer task failed")?;
    info!(records, "event log closed");

    Ok(())
}
