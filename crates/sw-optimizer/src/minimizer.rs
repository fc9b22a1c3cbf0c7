//! The sequential minimizer capability and its shared evaluation loop.

use sw_types::{OptimizerError, ParamSet, SwResult};
use tracing::{debug, warn};

use crate::search::SearchSpace;
use crate::trial::{Trial, Trials};

/// A black-box sequential optimizer over one search space.
///
/// `minimize` evaluates exactly `max_evals` candidates, one at a time,
/// records every one of them in `trials` and returns the assignment with the
/// lowest loss. An objective error marks that trial failed and ends the run.
pub trait Minimizer {
    fn minimize(
        &mut self,
        objective: &mut dyn FnMut(&ParamSet) -> SwResult<f64>,
        space: &SearchSpace,
        max_evals: usize,
        trials: &mut Trials,
    ) -> SwResult<ParamSet>;

    /// Reseed the backend's random source.
    fn seed(&mut self, _seed: u64) {}

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

/// Validate, then propose/evaluate/record `max_evals` times.
pub(crate) fn drive<P>(
    objective: &mut dyn FnMut(&ParamSet) -> SwResult<f64>,
    space: &SearchSpace,
    max_evals: usize,
    trials: &mut Trials,
    mut propose: P,
) -> SwResult<ParamSet>
where
    P: FnMut(&Trials) -> ParamSet,
{
    space.validate()?;
    if max_evals == 0 {
        return Err(OptimizerError::ZeroBudget.into());
    }

    for _ in 0..max_evals {
        let mut trial = Trial::new(trials.len(), propose(trials));
        trial.mark_running();

        match objective(&trial.params) {
            Ok(loss) => {
                if !loss.is_finite() {
                    warn!("Trial {} produced a non-finite loss: {}", trial.number, loss);
                }
                debug!("Trial {} loss {}", trial.number, loss);
                trial.mark_completed(loss);
                trials.push(trial);
            }
            Err(e) => {
                trial.mark_failed(e.to_string());
                trials.push(trial);
                return Err(e);
            }
        }
    }

    trials
        .best_trial()
        .map(|t| t.params.clone())
        .ok_or_else(|| OptimizerError::NoCompletedTrials.into())
}
