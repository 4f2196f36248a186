//! Alert evaluation loop
//!
//! Every `check_interval` seconds the evaluator reads the most recent
//! `count` samples and applies four independent sustained-threshold checks
//! (cpu, mem, upstream net, load1). Fired alerts for one cycle are composed
//! into a single multi-line message and pushed once per destination.

use super::latch::Latch;
use crate::config::MonitorConfig;
use crate::history::SharedHistory;
use crate::models::Sample;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outbound notification seam. Delivery is best-effort; implementations
/// belong to the messaging front-end, not this crate.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> Result<()>;
}

/// Sink that only records alerts in the log. Used when no real messaging
/// collaborator is wired in.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, destination: &str, message: &str) -> Result<()> {
        info!(destination = %destination, %message, "Alert notification");
        Ok(())
    }
}

/// Resolved alerting parameters, fixed after construction.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    /// CPU percent threshold
    pub cpu: f64,
    /// Memory percent threshold
    pub mem: f64,
    /// Upstream network threshold in KB/s
    pub net: f64,
    /// 1-minute load average threshold
    pub load: f64,
    /// Consecutive breaching samples required
    pub count: usize,
    /// Seconds between evaluation cycles
    pub check_interval: u64,
}

impl AlertPolicy {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            cpu: config.alert.thresholds.cpu,
            mem: config.alert.thresholds.mem,
            net: config.alert.thresholds.net,
            load: config.load_threshold(),
            count: config.alert.count.max(1),
            check_interval: config.alert.check_interval.max(1),
        }
    }
}

/// One latch per monitored metric, owned exclusively by the evaluator.
#[derive(Debug, Default)]
struct Latches {
    cpu: Latch,
    mem: Latch,
    net: Latch,
    load: Latch,
}

/// Background task applying edge-triggered sustained-threshold detection.
pub struct AlertEvaluator {
    history: SharedHistory,
    sink: Arc<dyn NotificationSink>,
    destinations: Vec<String>,
    policy: AlertPolicy,
    latches: Latches,
}

impl AlertEvaluator {
    pub fn new(
        history: SharedHistory,
        sink: Arc<dyn NotificationSink>,
        destinations: Vec<String>,
        policy: AlertPolicy,
    ) -> Self {
        Self {
            history,
            sink,
            destinations,
            policy,
            latches: Latches::default(),
        }
    }

    /// Run until a shutdown signal is received.
    pub async fn run(mut self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            check_interval_secs = self.policy.check_interval,
            count = self.policy.count,
            "Starting alert evaluator loop"
        );

        let interval = Duration::from_secs(self.policy.check_interval);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.evaluate().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down alert evaluator loop");
                    break;
                }
            }
        }
    }

    /// One evaluation cycle: check all metrics, deliver anything that fired.
    pub async fn evaluate(&mut self) {
        let fired = self.check_cycle();
        if fired.is_empty() {
            return;
        }

        info!(alerts = fired.len(), "Sustained threshold breaches detected");
        if self.destinations.is_empty() {
            debug!("No alert destinations configured, skipping delivery");
            return;
        }

        let message = fired.join("\n");
        for destination in &self.destinations {
            if let Err(e) = self.sink.send(destination, &message).await {
                // Delivery is best-effort; latch state is already settled
                warn!(destination = %destination, error = %e, "Alert delivery failed");
            }
        }
    }

    /// Apply the four sustained-threshold checks against the trailing
    /// samples. Returns one message line per rising edge, in metric-check
    /// order.
    pub fn check_cycle(&mut self) -> Vec<String> {
        let recent = self.history.read().unwrap().tail(self.policy.count);
        if recent.len() < self.policy.count {
            // Not enough history yet to judge a sustained breach
            return Vec::new();
        }

        let policy = &self.policy;
        let mut fired = Vec::new();

        if self
            .latches
            .cpu
            .observe(sustained(&recent, policy.cpu, |s| s.cpu_pct))
        {
            fired.push(format!(
                "CPU usage >= {:.1}% for {} consecutive samples",
                policy.cpu, policy.count
            ));
        }
        if self
            .latches
            .mem
            .observe(sustained(&recent, policy.mem, |s| s.mem_pct))
        {
            fired.push(format!(
                "Memory usage >= {:.1}% for {} consecutive samples",
                policy.mem, policy.count
            ));
        }
        if self
            .latches
            .net
            .observe(sustained(&recent, policy.net, |s| s.net_sent_kbps))
        {
            fired.push(format!(
                "Upstream network >= {:.1} KB/s for {} consecutive samples",
                policy.net, policy.count
            ));
        }
        if self
            .latches
            .load
            .observe(sustained(&recent, policy.load, |s| s.load1))
        {
            fired.push(format!(
                "1-minute load >= {:.2} for {} consecutive samples",
                policy.load, policy.count
            ));
        }

        fired
    }
}

/// Whether every trailing sample's value is at or above the threshold.
fn sustained(recent: &[Sample], threshold: f64, value: impl Fn(&Sample) -> f64) -> bool {
    recent.iter().all(|s| value(s) >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TimeSeriesStore;
    use std::sync::Mutex;

    /// Mock sink recording deliveries, optionally failing one destination
    struct MockSink {
        sent: Mutex<Vec<(String, String)>>,
        fail_destination: Option<String>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_destination: None,
            }
        }
    }

    #[async_trait]
    impl NotificationSink for MockSink {
        async fn send(&self, destination: &str, message: &str) -> Result<()> {
            if self.fail_destination.as_deref() == Some(destination) {
                anyhow::bail!("destination unreachable");
            }
            self.sent
                .lock()
                .unwrap()
                .push((destination.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn cpu_sample(ts: i64, cpu: f64) -> Sample {
        Sample {
            timestamp: ts,
            cpu_pct: cpu,
            mem_pct: 10.0,
            net_sent_kbps: 0.0,
            net_recv_kbps: 0.0,
            load1: 0.1,
        }
    }

    fn policy(count: usize) -> AlertPolicy {
        AlertPolicy {
            cpu: 90.0,
            mem: 90.0,
            net: 1024.0,
            load: 8.0,
            count,
            check_interval: 60,
        }
    }

    fn evaluator(
        history: SharedHistory,
        sink: Arc<dyn NotificationSink>,
        destinations: Vec<String>,
        count: usize,
    ) -> AlertEvaluator {
        AlertEvaluator::new(history, sink, destinations, policy(count))
    }

    #[test]
    fn test_edge_triggered_fires_once_per_episode() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        let mut eval = evaluator(Arc::clone(&history), Arc::new(MockSink::new()), vec![], 3);

        // Two sustained episodes separated by one sub-threshold sample:
        // alerts after the 3rd and 8th samples only.
        let values = [95.0, 95.0, 95.0, 95.0, 50.0, 95.0, 95.0, 95.0];
        let mut fired_at = Vec::new();
        for (i, v) in values.iter().enumerate() {
            history.write().unwrap().append(cpu_sample(i as i64, *v));
            if !eval.check_cycle().is_empty() {
                fired_at.push(i + 1);
            }
        }

        assert_eq!(fired_at, vec![3, 8]);
    }

    #[test]
    fn test_short_breach_never_fires() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        let mut eval = evaluator(Arc::clone(&history), Arc::new(MockSink::new()), vec![], 3);

        for (i, v) in [95.0, 95.0, 50.0, 95.0, 95.0, 50.0].iter().enumerate() {
            history.write().unwrap().append(cpu_sample(i as i64, *v));
            assert!(eval.check_cycle().is_empty());
        }
    }

    #[test]
    fn test_insufficient_history_is_skipped() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        let mut eval = evaluator(Arc::clone(&history), Arc::new(MockSink::new()), vec![], 3);

        history.write().unwrap().append(cpu_sample(0, 99.0));
        history.write().unwrap().append(cpu_sample(1, 99.0));

        assert!(eval.check_cycle().is_empty());
    }

    #[test]
    fn test_independent_metrics_fire_together_in_check_order() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        let mut eval = evaluator(Arc::clone(&history), Arc::new(MockSink::new()), vec![], 2);

        for ts in 0..2 {
            history.write().unwrap().append(Sample {
                timestamp: ts,
                cpu_pct: 95.0,
                mem_pct: 95.0,
                net_sent_kbps: 2048.0,
                net_recv_kbps: 0.0,
                load1: 9.5,
            });
        }

        let fired = eval.check_cycle();
        assert_eq!(fired.len(), 4);
        assert!(fired[0].starts_with("CPU"));
        assert!(fired[1].starts_with("Memory"));
        assert!(fired[2].starts_with("Upstream"));
        assert!(fired[3].starts_with("1-minute"));
    }

    #[tokio::test]
    async fn test_delivery_goes_to_every_destination() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        for ts in 0..3 {
            history.write().unwrap().append(cpu_sample(ts, 95.0));
        }

        let sink = Arc::new(MockSink::new());
        let mut eval = evaluator(
            Arc::clone(&history),
            sink.clone(),
            vec!["room-a".to_string(), "room-b".to_string()],
            3,
        );

        eval.evaluate().await;

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "room-a");
        assert_eq!(sent[1].0, "room-b");
        assert!(sent[0].1.contains("CPU usage >= 90.0%"));
    }

    #[tokio::test]
    async fn test_failed_destination_does_not_block_others() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        for ts in 0..3 {
            history.write().unwrap().append(cpu_sample(ts, 95.0));
        }

        let sink = Arc::new(MockSink {
            sent: Mutex::new(Vec::new()),
            fail_destination: Some("room-a".to_string()),
        });
        let mut eval = evaluator(
            Arc::clone(&history),
            sink.clone(),
            vec!["room-a".to_string(), "room-b".to_string()],
            3,
        );

        eval.evaluate().await;

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "room-b");
        // The latch stays set despite the failed delivery
        assert_eq!(eval.latches.cpu, Latch::Breaching);
    }

    #[tokio::test]
    async fn test_shutdown_stops_evaluation() {
        let history = TimeSeriesStore::with_capacity(100).into_shared();
        let sink = Arc::new(MockSink::new());
        let eval = evaluator(
            Arc::clone(&history),
            sink.clone(),
            vec!["room".to_string()],
            3,
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
        let handle = tokio::spawn(eval.run(shutdown_rx));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
