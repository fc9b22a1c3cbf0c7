//! Trial tracking for a single optimization stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sw_types::ParamSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A single trial (one candidate assignment and the loss it produced).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: Uuid,
    pub number: usize,
    pub params: ParamSet,
    pub status: TrialStatus,
    /// Minimized objective. Lower is better.
    pub loss: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Trial {
    pub fn new(number: usize, params: ParamSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            params,
            status: TrialStatus::Pending,
            loss: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TrialStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, loss: f64) {
        self.status = TrialStatus::Completed;
        self.finished_at = Some(Utc::now());
        self.loss = Some(loss);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = TrialStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Loss of a completed trial, if it is a usable number.
    pub fn finite_loss(&self) -> Option<f64> {
        match (self.status, self.loss) {
            (TrialStatus::Completed, Some(loss)) if loss.is_finite() => Some(loss),
            _ => None,
        }
    }
}

/// Trial-history sink filled by a minimizer during one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trials {
    trials: Vec<Trial>,
}

impl Trials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter()
    }

    /// Losses of completed trials, in evaluation order.
    pub fn losses(&self) -> Vec<f64> {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Completed)
            .filter_map(|t| t.loss)
            .collect()
    }

    /// Completed trials whose loss is finite.
    pub fn completed(&self) -> Vec<&Trial> {
        self.trials
            .iter()
            .filter(|t| t.finite_loss().is_some())
            .collect()
    }

    pub fn best_trial(&self) -> Option<&Trial> {
        self.trials
            .iter()
            .filter_map(|t| t.finite_loss().map(|loss| (t, loss)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(t, _)| t)
    }

    pub fn min_loss(&self) -> Option<f64> {
        self.best_trial().and_then(|t| t.loss)
    }
}
