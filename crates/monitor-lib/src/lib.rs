//! Host monitor library
//!
//! This crate provides the core functionality for:
//! - Periodic sampling of host CPU, memory, network, and load metrics
//! - Bounded rolling history of samples
//! - Edge-triggered sustained-threshold alerting
//! - On-demand windowed report extraction
//! - Service status queries

pub mod alert;
pub mod config;
pub mod history;
pub mod models;
pub mod report;
pub mod sampler;
pub mod service;

pub use alert::{AlertEvaluator, AlertPolicy, NotificationSink};
pub use config::MonitorConfig;
pub use history::{SharedHistory, TimeSeriesStore};
pub use models::{ReportSeries, Sample};
pub use report::{ChartRenderer, ReportOutcome, ReportQuery};
pub use sampler::{MetricSource, SamplerLoop, SystemMetricSource};
