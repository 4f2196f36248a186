//! Core data models for the host monitor

use serde::{Deserialize, Serialize};

/// One timestamped row of all monitored metrics.
///
/// Produced once per sampler tick and never mutated after it is appended
/// to the history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix timestamp (seconds) at which the row was taken
    pub timestamp: i64,
    /// CPU utilization in percent, 0..=100
    pub cpu_pct: f64,
    /// Memory utilization in percent, 0..=100
    pub mem_pct: f64,
    /// Network upstream rate in KB/s
    pub net_sent_kbps: f64,
    /// Network downstream rate in KB/s
    pub net_recv_kbps: f64,
    /// 1-minute load average (0.0 where unavailable)
    pub load1: f64,
}

/// Aligned per-metric series extracted for one report window.
///
/// All vectors have identical length; index `i` across them describes the
/// same [`Sample`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSeries {
    pub timestamps: Vec<i64>,
    pub cpu_pct: Vec<f64>,
    pub mem_pct: Vec<f64>,
    pub net_sent_kbps: Vec<f64>,
    pub net_recv_kbps: Vec<f64>,
    pub load1: Vec<f64>,
    /// Human-readable host uptime, e.g. "3d 4h 12m"
    pub uptime: String,
}

impl ReportSeries {
    /// Number of samples in the series
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the series contains no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_round_trips_through_json() {
        let sample = Sample {
            timestamp: 1_700_000_000,
            cpu_pct: 42.5,
            mem_pct: 61.0,
            net_sent_kbps: 1.25,
            net_recv_kbps: 8.0,
            load1: 0.7,
        };

        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
