//! Cross-validation collaborator.
//!
//! The staged engine only needs a vector of per-fold scores for the model's
//! current configuration. [`KFoldValidator`] provides that by fitting a clone
//! of the model on each training split, optionally fanning folds out across
//! the rayon thread pool.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use sw_types::{config_error, evaluation_error, Dataset, Estimator, SwError, SwResult};

use crate::scoring::Scoring;

/// Produces one score per fold for a configured model.
pub trait CrossValidator<M> {
    fn cross_val_scores(
        &self,
        model: &M,
        data: &Dataset,
        folds: usize,
        scoring: &Scoring,
    ) -> SwResult<Vec<f64>>;
}

/// K-Fold splitter.
///
/// Splits data into K consecutive folds. Each fold is used once as test set
/// while the remaining K-1 folds form the training set.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Enable shuffling before splitting into folds.
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducible shuffling.
    pub fn with_random_state(mut self, random_state: Option<u64>) -> Self {
        self.random_state = random_state;
        self
    }

    /// Generate (train_indices, test_indices) for each fold.
    pub fn split(&self, n_samples: usize) -> SwResult<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(config_error!(
                "fold count must be at least 2, got {}",
                self.n_splits
            ));
        }
        if self.n_splits > n_samples {
            return Err(config_error!(
                "cannot split {} samples into {} folds",
                n_samples,
                self.n_splits
            ));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            indices.shuffle(&mut rng);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut result = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            // Distribute remainder across first folds
            let current = if i < remainder { fold_size + 1 } else { fold_size };
            let end = start + current;

            let test: Vec<usize> = indices[start..end].to_vec();
            let mut train = Vec::with_capacity(n_samples - current);
            train.extend_from_slice(&indices[..start]);
            train.extend_from_slice(&indices[end..]);

            result.push((train, test));
            start = end;
        }
        Ok(result)
    }
}

/// K-fold cross-validation over clones of the model.
#[derive(Debug, Clone)]
pub struct KFoldValidator {
    shuffle: bool,
    random_state: Option<u64>,
    parallel: bool,
}

impl KFoldValidator {
    pub fn new() -> Self {
        Self {
            shuffle: false,
            random_state: None,
            parallel: true,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool, random_state: Option<u64>) -> Self {
        self.shuffle = shuffle;
        self.random_state = random_state;
        self
    }

    /// Run folds on the rayon pool (default) or one after another.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for KFoldValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> CrossValidator<M> for KFoldValidator
where
    M: Estimator + Clone + Send + Sync,
{
    fn cross_val_scores(
        &self,
        model: &M,
        data: &Dataset,
        folds: usize,
        scoring: &Scoring,
    ) -> SwResult<Vec<f64>> {
        let splits = KFold::new(folds)
            .with_shuffle(self.shuffle)
            .with_random_state(self.random_state)
            .split(data.n_samples())?;

        let run_fold = |(fold, (train, test)): (usize, &(Vec<usize>, Vec<usize>))| {
            score_fold(model, data, fold, train, test, scoring)
        };

        if self.parallel {
            splits.par_iter().enumerate().map(run_fold).collect()
        } else {
            splits.iter().enumerate().map(run_fold).collect()
        }
    }
}

fn score_fold<M: Estimator + Clone>(
    model: &M,
    data: &Dataset,
    fold: usize,
    train: &[usize],
    test: &[usize],
    scoring: &Scoring,
) -> SwResult<f64> {
    let train_set = data.select(train);
    let test_set = data.select(test);

    let mut fold_model = model.clone();
    fold_model
        .fit(&train_set.features, &train_set.target)
        .map_err(|e| wrap_fold_error(fold, e))?;
    let predictions = fold_model
        .predict(&test_set.features)
        .map_err(|e| wrap_fold_error(fold, e))?;

    let score = scoring.score(&test_set.target, &predictions)?;
    if !score.is_finite() {
        return Err(evaluation_error!("fold {} produced a non-finite score", fold));
    }
    Ok(score)
}

fn wrap_fold_error(fold: usize, e: SwError) -> SwError {
    if e.is_config() {
        e
    } else {
        evaluation_error!("fold {} failed: {}", fold, e)
    }
}
