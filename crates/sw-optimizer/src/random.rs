//! Independent random sampling across the search space.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sw_types::{ParamSet, SwResult};

use crate::minimizer::{drive, Minimizer};
use crate::search::SearchSpace;
use crate::trial::Trials;

#[derive(Debug, Clone)]
pub struct RandomMinimizer {
    rng: StdRng,
}

impl RandomMinimizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomMinimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Minimizer for RandomMinimizer {
    fn minimize(
        &mut self,
        objective: &mut dyn FnMut(&ParamSet) -> SwResult<f64>,
        space: &SearchSpace,
        max_evals: usize,
        trials: &mut Trials,
    ) -> SwResult<ParamSet> {
        let rng = &mut self.rng;
        drive(objective, space, max_evals, trials, |_| space.sample(rng))
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn name(&self) -> &str {
        "random"
    }
}
