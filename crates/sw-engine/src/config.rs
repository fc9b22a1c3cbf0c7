//! Run configuration for the staged optimizer.

use serde::{Deserialize, Serialize};
use sw_types::{config_error, SwResult};

use crate::normalize::IntegerRules;
use crate::scoring::Scoring;

/// Construction-time settings of a staged run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepwiseConfig {
    /// Candidates evaluated in every stage.
    pub max_evals_per_stage: usize,

    /// Number of cross-validation folds.
    pub cv_folds: usize,

    /// Built-in scoring name (e.g. "neg_mean_squared_error", "r2").
    pub scoring: String,

    /// Seed for the minimizer and fold shuffling. `None` = nondeterministic.
    pub random_state: Option<u64>,

    /// Parameters truncated to integers before reaching the model.
    pub integer_params: Vec<String>,

    /// Shuffle rows before splitting folds.
    pub shuffle_folds: bool,
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            max_evals_per_stage: 100,
            cv_folds: 5,
            scoring: "neg_mean_squared_error".to_string(),
            random_state: Some(42),
            integer_params: IntegerRules::default().names().map(String::from).collect(),
            shuffle_folds: false,
        }
    }
}

impl StepwiseConfig {
    pub fn with_max_evals(mut self, n: usize) -> Self {
        self.max_evals_per_stage = n;
        self
    }

    pub fn with_cv_folds(mut self, n: usize) -> Self {
        self.cv_folds = n;
        self
    }

    pub fn with_scoring(mut self, name: &str) -> Self {
        self.scoring = name.to_string();
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_integer_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.integer_params = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_shuffle_folds(mut self, shuffle: bool) -> Self {
        self.shuffle_folds = shuffle;
        self
    }

    pub fn integer_rules(&self) -> IntegerRules {
        IntegerRules::new(self.integer_params.iter().cloned())
    }

    pub fn scoring(&self) -> SwResult<Scoring> {
        Scoring::from_name(&self.scoring)
    }

    /// Budget and fold checks that must pass before any evaluation.
    pub fn validate(&self) -> SwResult<()> {
        if self.max_evals_per_stage == 0 {
            return Err(config_error!("max_evals_per_stage must be positive"));
        }
        if self.cv_folds < 2 {
            return Err(config_error!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            ));
        }
        Ok(())
    }
}
