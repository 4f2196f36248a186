//! Periodic metric sampling
//!
//! One background task produces a [`Sample`] per tick: it snapshots the OS
//! metrics through a [`MetricSource`], derives the network rates from
//! consecutive cumulative counters, and appends the row to the shared
//! history. Individual read problems are substituted with safe defaults;
//! the loop only exits on shutdown.

mod system;

pub use system::SystemMetricSource;

use crate::history::SharedHistory;
use crate::models::Sample;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Raw instantaneous readings from the OS.
///
/// Network counters are cumulative byte totals since boot; the sampler loop
/// turns them into rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricSnapshot {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub net_sent_bytes: u64,
    pub net_recv_bytes: u64,
    pub load1: f64,
}

/// Source of instantaneous OS metrics.
#[async_trait]
pub trait MetricSource: Send {
    /// Take one snapshot since the previous call.
    async fn snapshot(&mut self) -> Result<MetricSnapshot>;
}

/// Background loop that appends one [`Sample`] per tick.
pub struct SamplerLoop {
    source: Box<dyn MetricSource>,
    history: SharedHistory,
    interval: Duration,
    /// Cumulative (sent, recv) byte counters from the previous tick
    prev_net: Option<(u64, u64)>,
}

impl SamplerLoop {
    /// Create a sampler ticking every `interval_secs` seconds (minimum 1).
    pub fn new(source: Box<dyn MetricSource>, history: SharedHistory, interval_secs: u64) -> Self {
        Self {
            source,
            history,
            interval: Duration::from_secs(interval_secs.max(1)),
            prev_net: None,
        }
    }

    /// Run until a shutdown signal is received.
    pub async fn run(mut self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting metric sampler loop"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "Sampler tick failed");
                        // Avoid a tight error loop if the source keeps failing
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down metric sampler loop");
                    break;
                }
            }
        }
    }

    /// Take one snapshot and append the derived sample.
    async fn tick(&mut self) -> Result<()> {
        let snapshot = self.source.snapshot().await?;
        let (net_sent_kbps, net_recv_kbps) = self.net_rates(&snapshot);

        let sample = Sample {
            timestamp: Utc::now().timestamp(),
            cpu_pct: snapshot.cpu_pct.clamp(0.0, 100.0),
            mem_pct: snapshot.mem_pct.clamp(0.0, 100.0),
            net_sent_kbps,
            net_recv_kbps,
            load1: snapshot.load1.max(0.0),
        };

        self.history.write().unwrap().append(sample);
        Ok(())
    }

    /// Derive KB/s rates from consecutive cumulative counters.
    ///
    /// The first tick has no previous counters and yields 0; a counter going
    /// backwards (interface reset, counter wrap) also yields 0. Both cases
    /// re-arm the previous-counter reference so the next tick recovers.
    fn net_rates(&mut self, snapshot: &MetricSnapshot) -> (f64, f64) {
        let secs = self.interval.as_secs_f64();
        let rates = match self.prev_net {
            Some((prev_sent, prev_recv))
                if snapshot.net_sent_bytes >= prev_sent
                    && snapshot.net_recv_bytes >= prev_recv =>
            {
                (
                    (snapshot.net_sent_bytes - prev_sent) as f64 / 1024.0 / secs,
                    (snapshot.net_recv_bytes - prev_recv) as f64 / 1024.0 / secs,
                )
            }
            Some(_) => {
                debug!("Network counters went backwards, re-arming");
                (0.0, 0.0)
            }
            None => (0.0, 0.0),
        };

        self.prev_net = Some((snapshot.net_sent_bytes, snapshot.net_recv_bytes));
        rates
    }
}
