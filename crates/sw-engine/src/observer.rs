//! Stage-boundary progress reporting.
//!
//! The engine never writes to the console itself; after each stage it hands a
//! [`StageReport`] to the configured [`StageObserver`].

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use sw_types::{format_params, ParamSet};
use tracing::{info, warn};

/// Snapshot taken when a stage finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// 1-based stage index.
    pub stage: usize,
    pub total_stages: usize,
    /// Optional label of the stage's search space.
    pub stage_name: Option<String>,
    /// Normalized best assignment found by this stage alone.
    pub stage_params: ParamSet,
    /// Cumulative best assignment after merging this stage.
    pub best_params: ParamSet,
    /// Negated minimum loss of this stage's trials.
    pub best_score: f64,
    pub n_trials: usize,
}

pub trait StageObserver {
    fn on_stage_complete(&mut self, report: &StageReport);
}

/// Logs each stage through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_stage_complete(&mut self, report: &StageReport) {
        info!(
            "Best parameters after step {}/{}: {}",
            report.stage,
            report.total_stages,
            format_params(&report.best_params)
        );
        info!("Best score after step {}: {}", report.stage, report.best_score);
    }
}

/// Forwards reports to a channel consumer.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<StageReport>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<StageReport>) -> Self {
        Self { tx }
    }
}

impl StageObserver for ChannelObserver {
    fn on_stage_complete(&mut self, report: &StageReport) {
        if self.tx.send(report.clone()).is_err() {
            warn!("Stage {} report dropped: receiver disconnected", report.stage);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage_complete(&mut self, _report: &StageReport) {}
}
