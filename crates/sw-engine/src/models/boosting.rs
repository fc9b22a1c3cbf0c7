//! Squared-loss gradient boosting over regularized regression trees.

use sw_types::{config_error, param_as_f64, Estimator, ParamSet, ParamValue, SwError, SwResult};

use super::tree::{positive, Node, TreeBuilder};
use super::{check_training_data, check_width, unknown_param};

/// Gradient-boosted regression trees.
///
/// Each round fits a tree to the current residuals. Leaf weights are
/// soft-thresholded by `reg_alpha` and shrunk by `reg_lambda`, then scaled by
/// `learning_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    min_samples_leaf: usize,
    reg_alpha: f64,
    reg_lambda: f64,
    base_score: f64,
    trees: Vec<Node>,
    n_features: Option<usize>,
}

impl GradientBoostingRegressor {
    pub fn new() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: None,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn raw_predict(&self, row: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| self.learning_rate * tree.predict_row(row))
                .sum::<f64>()
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for GradientBoostingRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> SwResult<()> {
        let width = check_training_data(x, y)?;
        let builder = TreeBuilder {
            max_depth: self.max_depth,
            min_samples_split: 2,
            min_samples_leaf: self.min_samples_leaf,
            reg_alpha: self.reg_alpha,
            reg_lambda: self.reg_lambda,
        };

        self.base_score = y.iter().sum::<f64>() / y.len() as f64;
        self.trees.clear();
        let mut predictions = vec![self.base_score; y.len()];
        let mut residuals = vec![0.0; y.len()];

        for _ in 0..self.n_estimators {
            for ((r, target), pred) in residuals.iter_mut().zip(y).zip(&predictions) {
                *r = target - pred;
            }
            let tree = builder.build(x, &residuals);
            for (pred, row) in predictions.iter_mut().zip(x) {
                *pred += self.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }

        self.n_features = Some(width);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> SwResult<Vec<f64>> {
        let width = self
            .n_features
            .ok_or_else(|| SwError::NotFitted("GradientBoostingRegressor".into()))?;
        check_width(x, width)?;
        Ok(x.iter().map(|row| self.raw_predict(row)).collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> SwResult<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = positive(name, value, 1)?,
                "max_depth" => self.max_depth = positive(name, value, 1)?,
                "min_samples_leaf" => self.min_samples_leaf = positive(name, value, 1)?,
                "learning_rate" => {
                    let lr = param_as_f64(name, value)?;
                    if lr <= 0.0 {
                        return Err(config_error!("learning_rate must be positive, got {}", lr));
                    }
                    self.learning_rate = lr;
                }
                "reg_alpha" | "reg_lambda" => {
                    let v = param_as_f64(name, value)?;
                    if v < 0.0 {
                        return Err(config_error!("{} must be non-negative, got {}", name, v));
                    }
                    if name == "reg_alpha" {
                        self.reg_alpha = v;
                    } else {
                        self.reg_lambda = v;
                    }
                }
                _ => return Err(unknown_param("GradientBoostingRegressor", name)),
            }
        }
        Ok(())
    }

    fn get_params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("n_estimators".into(), ParamValue::Int(self.n_estimators as i64));
        params.insert("learning_rate".into(), ParamValue::Float(self.learning_rate));
        params.insert("max_depth".into(), ParamValue::Int(self.max_depth as i64));
        params.insert(
            "min_samples_leaf".into(),
            ParamValue::Int(self.min_samples_leaf as i64),
        );
        params.insert("reg_alpha".into(), ParamValue::Float(self.reg_alpha));
        params.insert("reg_lambda".into(), ParamValue::Float(self.reg_lambda));
        params
    }
}
