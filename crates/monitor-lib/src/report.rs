//! On-demand report queries
//!
//! Synchronous, read-only extraction of the history for a requested window.
//! The query's contract ends at producing aligned series plus an uptime
//! string; chart rendering belongs to the [`ChartRenderer`] collaborator.

use crate::history::SharedHistory;
use crate::models::ReportSeries;
use chrono::Utc;
use std::io::Write;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// User input error, surfaced as plain text and not logged as an error
    #[error("the report window must be a positive number of minutes")]
    InvalidWindow,

    /// Rendering/encoding failure with the underlying cause appended
    #[error("failed to render the report chart: {0}")]
    Render(#[source] anyhow::Error),
}

/// Result of a report query. An empty window is a normal outcome, distinct
/// from failure.
#[derive(Debug)]
pub enum ReportOutcome {
    Series(ReportSeries),
    /// No samples in the requested window
    Empty { minutes: i64 },
}

/// Chart-rendering collaborator: consumes one window of aligned series and
/// returns an encoded raster image.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, series: &ReportSeries) -> anyhow::Result<Vec<u8>>;
}

/// Rendered report, or the empty-window outcome passed through.
#[derive(Debug)]
pub enum ChartOutcome {
    Image(Vec<u8>),
    Empty { minutes: i64 },
}

pub struct ReportQuery {
    history: SharedHistory,
    default_minutes: i64,
}

impl ReportQuery {
    pub fn new(history: SharedHistory, default_minutes: i64) -> Self {
        Self {
            history,
            default_minutes: default_minutes.max(1),
        }
    }

    /// Extract the aligned series for the last `minutes` minutes (the
    /// configured default when unspecified).
    pub fn series(&self, minutes: Option<i64>) -> Result<ReportOutcome, ReportError> {
        let minutes = minutes.unwrap_or(self.default_minutes);
        if minutes < 1 {
            return Err(ReportError::InvalidWindow);
        }

        let since = Utc::now().timestamp() - minutes * 60;
        let samples = self.history.read().unwrap().window(since);
        if samples.is_empty() {
            return Ok(ReportOutcome::Empty { minutes });
        }

        let mut series = ReportSeries {
            uptime: format_uptime(host_uptime_secs()),
            ..Default::default()
        };
        for s in samples {
            series.timestamps.push(s.timestamp);
            series.cpu_pct.push(s.cpu_pct);
            series.mem_pct.push(s.mem_pct);
            series.net_sent_kbps.push(s.net_sent_kbps);
            series.net_recv_kbps.push(s.net_recv_kbps);
            series.load1.push(s.load1);
        }

        Ok(ReportOutcome::Series(series))
    }

    /// Extract the window and hand it to the rendering collaborator.
    pub fn chart(
        &self,
        renderer: &dyn ChartRenderer,
        minutes: Option<i64>,
    ) -> Result<ChartOutcome, ReportError> {
        match self.series(minutes)? {
            ReportOutcome::Empty { minutes } => Ok(ChartOutcome::Empty { minutes }),
            ReportOutcome::Series(series) => {
                let image = renderer.render(&series).map_err(ReportError::Render)?;
                Ok(ChartOutcome::Image(image))
            }
        }
    }
}

/// Parse an optional minutes argument from the command front-end.
///
/// An absent/blank argument means "use the configured default"; anything
/// non-numeric or non-positive is a user input error.
pub fn parse_minutes_arg(arg: Option<&str>) -> Result<Option<i64>, ReportError> {
    match arg.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let minutes: i64 = raw.parse().map_err(|_| ReportError::InvalidWindow)?;
            if minutes < 1 {
                return Err(ReportError::InvalidWindow);
            }
            Ok(Some(minutes))
        }
    }
}

/// Host uptime in seconds (0 where unavailable).
fn host_uptime_secs() -> u64 {
    sysinfo::System::uptime()
}

/// Format an uptime as "3d 4h 12m", omitting zero components ("0m" floor).
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if parts.is_empty() {
        return "0m".to_string();
    }
    parts.join(" ")
}

/// Stage image bytes in a temporary file for delivery.
///
/// The file is removed when the returned handle is dropped, on success and
/// failure paths alike.
pub fn stage_image(bytes: &[u8]) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("host-monitor-")
        .suffix(".png")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}
