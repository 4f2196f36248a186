//! Sustained-threshold alerting
//!
//! An independent background task inspects the trailing samples of each
//! metric and fires a notification once per sustained-breach episode
//! (rising-edge detection, never one alert per qualifying sample).

mod evaluator;
mod latch;

pub use evaluator::{AlertEvaluator, AlertPolicy, LogSink, NotificationSink};
pub use latch::Latch;
