//! OS-backed metric source
//!
//! Keeps one `sysinfo::System` alive between ticks so CPU usage can be
//! computed as a delta since the previous refresh.

use super::{MetricSnapshot, MetricSource};
use anyhow::Result;
use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, Networks, RefreshKind, System};

/// Whole-host metric source built on `sysinfo`.
pub struct SystemMetricSource {
    sys: System,
    networks: Networks,
}

impl SystemMetricSource {
    pub fn new() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );
        // Prime the CPU counters so the first real snapshot has a baseline
        sys.refresh_cpu_usage();

        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemMetricSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for SystemMetricSource {
    async fn snapshot(&mut self) -> Result<MetricSnapshot> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.networks.refresh();

        let cpu_pct = f64::from(self.sys.global_cpu_info().cpu_usage());

        let total = self.sys.total_memory();
        let mem_pct = if total > 0 {
            self.sys.used_memory() as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        // Cumulative counters summed over all non-loopback interfaces
        let (net_sent_bytes, net_recv_bytes) = self
            .networks
            .iter()
            .filter(|(name, _)| *name != "lo")
            .fold((0u64, 0u64), |(sent, recv), (_, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    recv.saturating_add(data.total_received()),
                )
            });

        // Reported as all zeroes on platforms without load averages
        let load1 = System::load_average().one;

        Ok(MetricSnapshot {
            cpu_pct,
            mem_pct,
            net_sent_bytes,
            net_recv_bytes,
            load1,
        })
    }
}
