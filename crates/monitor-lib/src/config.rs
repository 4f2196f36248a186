//! Monitor configuration
//!
//! Loaded once at startup and read-only afterwards. Out-of-range values are
//! replaced with their documented defaults and logged at warn level; loading
//! never fails because of a bad value.

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

use crate::service::validate_service_name;

/// Top-level monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between metric samples
    #[serde(default = "default_sample_interval")]
    pub sample_interval: u64,

    /// Rolling history retention in minutes
    #[serde(default = "default_max_history_minutes")]
    pub max_history_minutes: u64,

    /// Default report window in minutes
    #[serde(default = "default_time")]
    pub default_time: i64,

    /// Restrict privileged commands to administrators
    #[serde(default = "default_admin_only")]
    pub admin_only: bool,

    /// Destination identifiers for alert notifications
    #[serde(default)]
    pub alert_sender: Vec<String>,

    /// Service names eligible for status queries
    #[serde(default)]
    pub services_list: Vec<String>,

    /// Alert evaluation settings
    #[serde(default)]
    pub alert: AlertConfig,
}

/// Alert evaluation settings
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Consecutive breaching samples required before an alert fires
    #[serde(default = "default_alert_count")]
    pub count: usize,

    /// Seconds between alert evaluation cycles
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

/// Per-metric alert thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// CPU percent, 0..=100
    #[serde(default = "default_pct_threshold")]
    pub cpu: f64,
    /// Memory percent, 0..=100
    #[serde(default = "default_pct_threshold")]
    pub mem: f64,
    /// Upstream network rate in KB/s
    #[serde(default = "default_net_threshold")]
    pub net: f64,
    /// 1-minute load average; defaults to the logical core count
    #[serde(default)]
    pub load: Option<f64>,
}

fn default_sample_interval() -> u64 {
    10
}

fn default_max_history_minutes() -> u64 {
    60
}

fn default_time() -> i64 {
    10
}

fn default_admin_only() -> bool {
    true
}

fn default_alert_count() -> usize {
    3
}

fn default_check_interval() -> u64 {
    60
}

fn default_pct_threshold() -> f64 {
    90.0
}

fn default_net_threshold() -> f64 {
    1024.0
}

fn logical_core_count() -> f64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as f64)
        .unwrap_or(1.0)
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: default_pct_threshold(),
            mem: default_pct_threshold(),
            net: default_net_threshold(),
            load: None,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            count: default_alert_count(),
            check_interval: default_check_interval(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            max_history_minutes: default_max_history_minutes(),
            default_time: default_time(),
            admin_only: default_admin_only(),
            alert_sender: Vec::new(),
            services_list: Vec::new(),
            alert: AlertConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `monitor.toml` (if present) and `MONITOR_*`
    /// environment variables, then sanitize it.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("monitor").required(false))
            .add_source(config::Environment::with_prefix("MONITOR").separator("__"))
            .build()?;

        let loaded = config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to deserialize configuration, using defaults");
            MonitorConfig::default()
        });

        Ok(loaded.sanitized())
    }

    /// Clamp out-of-range values back to their defaults, warning about each
    /// replacement. Returns a configuration that is always usable.
    pub fn sanitized(mut self) -> Self {
        if self.sample_interval < 1 {
            warn!(
                sample_interval = self.sample_interval,
                "sample_interval must be >= 1s, using default"
            );
            self.sample_interval = default_sample_interval();
        }
        if self.max_history_minutes < 1 {
            warn!(
                max_history_minutes = self.max_history_minutes,
                "max_history_minutes must be >= 1, using default"
            );
            self.max_history_minutes = default_max_history_minutes();
        }
        if self.default_time < 1 {
            warn!(
                default_time = self.default_time,
                "default_time must be >= 1 minute, using default"
            );
            self.default_time = default_time();
        }
        if self.alert.count < 1 {
            warn!("alert.count must be >= 1, using default");
            self.alert.count = default_alert_count();
        }
        if self.alert.check_interval < 1 {
            warn!("alert.check_interval must be >= 1s, using default");
            self.alert.check_interval = default_check_interval();
        }

        let t = &mut self.alert.thresholds;
        if !t.cpu.is_finite() || !(0.0..=100.0).contains(&t.cpu) {
            warn!(cpu = t.cpu, "cpu threshold outside [0, 100], using default");
            t.cpu = default_pct_threshold();
        }
        if !t.mem.is_finite() || !(0.0..=100.0).contains(&t.mem) {
            warn!(mem = t.mem, "mem threshold outside [0, 100], using default");
            t.mem = default_pct_threshold();
        }
        if !t.net.is_finite() || t.net < 0.0 {
            warn!(net = t.net, "net threshold must be >= 0 KB/s, using default");
            t.net = default_net_threshold();
        }
        match t.load {
            Some(load) if load.is_finite() && load >= 0.0 => {}
            Some(load) => {
                warn!(load, "load threshold must be >= 0, using core count");
                t.load = None;
            }
            None => {}
        }

        self.services_list.retain(|name| {
            let ok = validate_service_name(name).is_ok();
            if !ok {
                warn!(service = %name, "dropping invalid service name from services_list");
            }
            ok
        });

        self
    }

    /// The effective 1-minute load threshold (core count when unset).
    pub fn load_threshold(&self) -> f64 {
        self.alert.thresholds.load.unwrap_or_else(logical_core_count)
    }
}
