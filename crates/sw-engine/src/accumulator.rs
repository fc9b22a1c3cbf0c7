//! Cumulative best parameters carried from stage to stage.

use serde::{Deserialize, Serialize};
use sw_types::{ParamSet, ParamValue};

/// Best-so-far state of one staged run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestState {
    params: ParamSet,
    score: Option<f64>,
}

impl BestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `params` into the accumulated mapping; incoming keys win.
    pub fn merge(&mut self, params: &ParamSet) {
        self.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Score of the most recently completed stage.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn reset(&mut self) {
        self.params.clear();
        self.score = None;
    }
}
