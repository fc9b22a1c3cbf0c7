//! CART regression trees.

use sw_types::{
    config_error, param_as_usize, Estimator, ParamSet, ParamValue, SwError, SwResult,
};

use super::{check_training_data, check_width, unknown_param};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub(crate) fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub(crate) fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Growth limits and leaf regularization shared by trees and boosting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TreeBuilder {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// L1 penalty: leaf sums are soft-thresholded by this amount.
    pub reg_alpha: f64,
    /// L2 penalty: added to the leaf's sample count.
    pub reg_lambda: f64,
}

impl TreeBuilder {
    pub(crate) fn build(&self, x: &[Vec<f64>], y: &[f64]) -> Node {
        let indices: Vec<usize> = (0..y.len()).collect();
        self.grow(x, y, indices, 0)
    }

    fn grow(&self, x: &[Vec<f64>], y: &[f64], indices: Vec<usize>, depth: usize) -> Node {
        if depth >= self.max_depth || indices.len() < self.min_samples_split {
            return self.leaf(y, &indices);
        }
        match self.best_split(x, y, &indices) {
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.into_iter().partition(|&i| x[i][feature] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.grow(x, y, left, depth + 1)),
                    right: Box::new(self.grow(x, y, right, depth + 1)),
                }
            }
            None => self.leaf(y, &indices),
        }
    }

    fn leaf(&self, y: &[f64], indices: &[usize]) -> Node {
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let shrunk = sum.signum() * (sum.abs() - self.reg_alpha).max(0.0);
        let denom = indices.len() as f64 + self.reg_lambda;
        let value = if denom > 0.0 { shrunk / denom } else { 0.0 };
        Node::Leaf { value }
    }

    /// Split with the largest squared-error reduction, if any improves.
    fn best_split(&self, x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let parent_term = total_sum * total_sum / n as f64;

        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 1e-12;
        let mut sorted = indices.to_vec();

        for feature in 0..x[indices[0]].len() {
            sorted.sort_by(|&a, &b| {
                x[a][feature]
                    .partial_cmp(&x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            for split in 1..n {
                left_sum += y[sorted[split - 1]];
                let lo = x[sorted[split - 1]][feature];
                let hi = x[sorted[split]][feature];
                if lo == hi || split < self.min_samples_leaf || n - split < self.min_samples_leaf {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let gain = left_sum * left_sum / split as f64
                    + right_sum * right_sum / (n - split) as f64
                    - parent_term;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, (lo + hi) / 2.0));
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeRegressor {
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    root: Option<Node>,
    n_features: usize,
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            root: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Depth of the fitted tree.
    pub fn depth(&self) -> Option<usize> {
        self.root.as_ref().map(Node::depth)
    }

    fn builder(&self) -> TreeBuilder {
        TreeBuilder {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
        }
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for DecisionTreeRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> SwResult<()> {
        self.n_features = check_training_data(x, y)?;
        self.root = Some(self.builder().build(x, y));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> SwResult<Vec<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| SwError::NotFitted("DecisionTreeRegressor".into()))?;
        check_width(x, self.n_features)?;
        Ok(x.iter().map(|row| root.predict_row(row)).collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> SwResult<()> {
        for (name, value) in params {
            match name.as_str() {
                "max_depth" => self.max_depth = positive(name, value, 1)?,
                "min_samples_split" => self.min_samples_split = positive(name, value, 2)?,
                "min_samples_leaf" => self.min_samples_leaf = positive(name, value, 1)?,
                _ => return Err(unknown_param("DecisionTreeRegressor", name)),
            }
        }
        Ok(())
    }

    fn get_params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("max_depth".into(), ParamValue::Int(self.max_depth as i64));
        params.insert(
            "min_samples_split".into(),
            ParamValue::Int(self.min_samples_split as i64),
        );
        params.insert(
            "min_samples_leaf".into(),
            ParamValue::Int(self.min_samples_leaf as i64),
        );
        params
    }
}

/// Integral parameter with a lower bound.
pub(crate) fn positive(name: &str, value: &ParamValue, min: usize) -> SwResult<usize> {
    let v = param_as_usize(name, value)?;
    if v < min {
        return Err(config_error!("{} must be at least {}, got {}", name, min, v));
    }
    Ok(v)
}
