//! In-memory training data.

use serde::{Deserialize, Serialize};

use crate::errors::SwResult;
use crate::validation_error;

/// Row-major feature matrix paired with a target vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, target: Vec<f64>) -> SwResult<Self> {
        if features.is_empty() {
            return Err(validation_error!("dataset has no rows"));
        }
        if features.len() != target.len() {
            return Err(validation_error!(
                "feature rows ({}) and target length ({}) differ",
                features.len(),
                target.len()
            ));
        }
        let width = features[0].len();
        if let Some(row) = features.iter().position(|r| r.len() != width) {
            return Err(validation_error!(
                "row {} has {} features, expected {}",
                row,
                features[row].len(),
                width
            ));
        }
        Ok(Self { features, target })
    }

    pub fn n_samples(&self) -> usize {
        self.target.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Copy of the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }
}
