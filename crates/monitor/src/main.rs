//! Host monitor daemon
//!
//! Samples host metrics in the background, evaluates alert thresholds on an
//! independent cadence, and serves the shared history to report queries.

use anyhow::Result;
use monitor_lib::alert::{AlertEvaluator, AlertPolicy, LogSink};
use monitor_lib::{MonitorConfig, SamplerLoop, SystemMetricSource, TimeSeriesStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    info!("Starting host-monitor");

    let config = MonitorConfig::load()?;
    info!(
        sample_interval = config.sample_interval,
        max_history_minutes = config.max_history_minutes,
        alert_check_interval = config.alert.check_interval,
        destinations = config.alert_sender.len(),
        "Monitor configured"
    );

    let history = TimeSeriesStore::for_retention(config.max_history_minutes, config.sample_interval)
        .into_shared();

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let sampler = SamplerLoop::new(
        Box::new(SystemMetricSource::new()),
        Arc::clone(&history),
        config.sample_interval,
    );
    let sampler_handle = tokio::spawn(sampler.run(shutdown_tx.subscribe()));

    // No messaging front-end is wired here; alerts go to the log
    let evaluator = AlertEvaluator::new(
        Arc::clone(&history),
        Arc::new(LogSink),
        config.alert_sender.clone(),
        AlertPolicy::from_config(&config),
    );
    let evaluator_handle = tokio::spawn(evaluator.run(shutdown_tx.subscribe()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());

    sampler_handle.await?;
    evaluator_handle.await?;

    Ok(())
}
