//! Turns one candidate assignment into a scalar loss.

use sw_types::{evaluation_error, merge_params, Dataset, Estimator, ParamSet, SwResult};
use tracing::debug;

use crate::cv::CrossValidator;
use crate::normalize::IntegerRules;
use crate::scoring::Scoring;

/// Objective bound to one stage.
///
/// Holds the accumulated best parameters by shared reference only; the one
/// thing an evaluation mutates is the model's configuration.
pub struct Objective<'a, M, C> {
    pub model: &'a mut M,
    pub best: &'a ParamSet,
    pub rules: &'a IntegerRules,
    pub validator: &'a C,
    pub data: &'a Dataset,
    pub folds: usize,
    pub scoring: &'a Scoring,
}

impl<'a, M, C> Objective<'a, M, C>
where
    M: Estimator,
    C: CrossValidator<M>,
{
    /// Accumulated best overlaid with the normalized candidate.
    pub fn effective_params(&self, candidate: &ParamSet) -> SwResult<ParamSet> {
        let candidate = self.rules.normalize(candidate)?;
        Ok(merge_params(self.best, &candidate))
    }

    /// Negated mean cross-validated score of `best ∪ candidate`.
    pub fn evaluate(&mut self, candidate: &ParamSet) -> SwResult<f64> {
        let effective = self.effective_params(candidate)?;
        self.model.set_params(&effective)?;

        let scores =
            self.validator
                .cross_val_scores(&*self.model, self.data, self.folds, self.scoring)?;
        if scores.is_empty() {
            return Err(evaluation_error!("cross-validation returned no fold scores"));
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        debug!(
            "Evaluated {} -> mean {} {}",
            sw_types::format_params(&effective),
            self.scoring.name(),
            mean
        );
        Ok(-mean)
    }
}
