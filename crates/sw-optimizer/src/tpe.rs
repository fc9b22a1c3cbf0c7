//! Tree-structured Parzen Estimator (TPE) minimizer
//!
//! Based on Bergstra et al. (2011) - Algorithms for Hyper-Parameter Optimization.
//! Completed trials are split at the `gamma` quantile of their losses into a
//! "good" and a "bad" group; each dimension is then sampled where the density
//! of good values is high relative to the density of bad ones.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sw_types::{ParamSet, ParamValue, SwResult};

use crate::minimizer::{drive, Minimizer};
use crate::search::{quantize, ParameterKind, SearchSpace};
use crate::trial::{Trial, Trials};

/// Tree-structured Parzen Estimator minimizer
#[derive(Debug, Clone)]
pub struct TpeMinimizer {
    /// Quantile for splitting good/bad (default: 0.25)
    gamma: f64,
    /// Number of startup trials (random sampling)
    n_startup: usize,
    /// KDE bandwidth, as a multiple of a tenth of the dimension's range
    kde_bandwidth: f64,
    /// Candidates drawn per continuous dimension
    n_candidates: usize,
    rng: StdRng,
}

impl TpeMinimizer {
    pub fn new() -> Self {
        Self {
            gamma: 0.25,
            n_startup: 10,
            kde_bandwidth: 1.0,
            n_candidates: 24,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Set gamma (quantile for splitting)
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(0.01, 0.99);
        self
    }

    /// Set number of startup trials
    pub fn with_startup(mut self, n: usize) -> Self {
        self.n_startup = n.max(1);
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: f64) -> Self {
        self.kde_bandwidth = bandwidth.max(1e-6);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn propose(&mut self, space: &SearchSpace, trials: &Trials) -> ParamSet {
        let mut completed = trials.completed();
        if completed.len() < self.n_startup || completed.len() < 2 {
            return space.sample(&mut self.rng);
        }

        let n_good = ((completed.len() as f64) * self.gamma).ceil() as usize;
        let n_good = n_good.max(1).min(completed.len() - 1);

        completed.sort_by(|a, b| {
            a.loss
                .partial_cmp(&b.loss)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let (good, bad) = completed.split_at(n_good);

        space
            .parameters
            .iter()
            .map(|param| {
                let value = self.sample_dimension(&param.name, &param.kind, good, bad);
                (param.name.clone(), value)
            })
            .collect()
    }

    fn sample_dimension(
        &mut self,
        name: &str,
        kind: &ParameterKind,
        good: &[&Trial],
        bad: &[&Trial],
    ) -> ParamValue {
        match kind {
            ParameterKind::Uniform { low, high } => {
                let v = self.sample_continuous(name, good, bad, *low, *high, false);
                ParamValue::Float(v)
            }
            ParameterKind::QUniform { low, high, q } => {
                let v = self.sample_continuous(name, good, bad, *low, *high, false);
                ParamValue::Float(quantize(v, *q))
            }
            ParameterKind::LogUniform { low, high } => {
                let v = self.sample_continuous(name, good, bad, *low, *high, true);
                ParamValue::Float(v.clamp(*low, *high))
            }
            ParameterKind::IntRange { low, high } => {
                let good_values = int_values(name, good, *low, *high);
                let bad_values = int_values(name, bad, *low, *high);
                ParamValue::Int(sample_ei_ratio_discrete(
                    &good_values,
                    &bad_values,
                    *low,
                    *high,
                    &mut self.rng,
                ))
            }
            ParameterKind::Choice { values } => {
                let good_counts = count_choices(name, good, values);
                let bad_counts = count_choices(name, bad, values);
                // Laplace smoothing keeps unseen choices reachable
                let weights: Vec<f64> = good_counts
                    .iter()
                    .zip(&bad_counts)
                    .map(|(l, g)| (*l as f64 + 1.0) / (*g as f64 + 1.0))
                    .collect();
                let idx = sample_weighted_index(&weights, &mut self.rng);
                values[idx].clone()
            }
        }
    }

    fn sample_continuous(
        &mut self,
        name: &str,
        good: &[&Trial],
        bad: &[&Trial],
        low: f64,
        high: f64,
        log_scale: bool,
    ) -> f64 {
        let to_space = |v: f64| if log_scale { v.max(f64::MIN_POSITIVE).ln() } else { v };
        let good_values: Vec<f64> = good
            .iter()
            .filter_map(|t| t.params.get(name)?.as_f64())
            .map(to_space)
            .collect();
        let bad_values: Vec<f64> = bad
            .iter()
            .filter_map(|t| t.params.get(name)?.as_f64())
            .map(to_space)
            .collect();

        let value = sample_ei_ratio_continuous(
            &good_values,
            &bad_values,
            to_space(low),
            to_space(high),
            self.kde_bandwidth,
            self.n_candidates,
            &mut self.rng,
        );
        if log_scale {
            value.exp()
        } else {
            value
        }
    }
}

impl Default for TpeMinimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Minimizer for TpeMinimizer {
    fn minimize(
        &mut self,
        objective: &mut dyn FnMut(&ParamSet) -> SwResult<f64>,
        space: &SearchSpace,
        max_evals: usize,
        trials: &mut Trials,
    ) -> SwResult<ParamSet> {
        drive(objective, space, max_evals, trials, |history| {
            self.propose(space, history)
        })
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn name(&self) -> &str {
        "tpe"
    }
}

fn int_values(name: &str, trials: &[&Trial], low: i64, high: i64) -> Vec<i64> {
    trials
        .iter()
        .filter_map(|t| t.params.get(name)?.as_i64())
        .filter(|v| (low..=high).contains(v))
        .collect()
}

fn count_choices(name: &str, trials: &[&Trial], values: &[ParamValue]) -> Vec<usize> {
    let mut counts = vec![0usize; values.len()];
    for trial in trials {
        if let Some(v) = trial.params.get(name) {
            if let Some(idx) = values.iter().position(|c| c == v) {
                counts[idx] += 1;
            }
        }
    }
    counts
}

/// Gaussian kernel density of `x` under `values`.
fn kde_score(x: f64, values: &[f64], bandwidth: f64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values
        .iter()
        .map(|&v| (-(x - v).powi(2) / (2.0 * bandwidth.powi(2))).exp())
        .sum::<f64>()
        / values.len() as f64
}

/// Draw candidates around good values and keep the best l(x)/g(x).
fn sample_ei_ratio_continuous<R: Rng>(
    good_values: &[f64],
    bad_values: &[f64],
    low: f64,
    high: f64,
    kde_bandwidth: f64,
    n_candidates: usize,
    rng: &mut R,
) -> f64 {
    if good_values.is_empty() {
        return rng.random_range(low..=high);
    }

    let bandwidth = kde_bandwidth * (high - low) / 10.0;
    let mut best_value = low;
    let mut best_ei = f64::NEG_INFINITY;

    for _ in 0..n_candidates.max(1) {
        let base = good_values[rng.random_range(0..good_values.len())];
        // Box-Muller transform for Gaussian noise
        let u1: f64 = rng.random::<f64>().max(1e-10);
        let u2: f64 = rng.random();
        let noise = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos() * bandwidth;
        let candidate = (base + noise).clamp(low, high);

        let l_score = kde_score(candidate, good_values, bandwidth);
        let g_score = kde_score(candidate, bad_values, bandwidth);
        let ei = l_score / (g_score + 1e-10);

        if ei > best_ei {
            best_ei = ei;
            best_value = candidate;
        }
    }

    best_value
}

/// Laplace-smoothed count ratio over an inclusive integer range.
fn sample_ei_ratio_discrete<R: Rng>(
    good_values: &[i64],
    bad_values: &[i64],
    low: i64,
    high: i64,
    rng: &mut R,
) -> i64 {
    let width = high
        .checked_sub(low)
        .and_then(|d| d.checked_add(1))
        .and_then(|w| usize::try_from(w).ok());
    // Very wide ranges degrade to uniform sampling rather than huge tables.
    let range = match width {
        Some(range) if !good_values.is_empty() && range <= 10_000 => range,
        _ => return rng.random_range(low..=high),
    };

    let mut good_counts = vec![1.0; range];
    let mut bad_counts = vec![1.0; range];
    for &v in good_values {
        good_counts[(v - low) as usize] += 1.0;
    }
    for &v in bad_values {
        bad_counts[(v - low) as usize] += 1.0;
    }

    let weights: Vec<f64> = good_counts
        .iter()
        .zip(&bad_counts)
        .map(|(l, g)| l / g)
        .collect();
    low + sample_weighted_index(&weights, rng) as i64
}

fn sample_weighted_index<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let r = rng.random::<f64>() * total;
    let mut cumsum = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumsum += w;
        if r < cumsum {
            return i;
        }
    }
    weights.len() - 1
}
