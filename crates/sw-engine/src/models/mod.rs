//! Reference estimators used by the command-line tuner and the tests.

mod boosting;
mod ridge;
mod tree;

pub use boosting::GradientBoostingRegressor;
pub use ridge::RidgeRegression;
pub use tree::DecisionTreeRegressor;

use sw_types::{validation_error, SwResult};

fn unknown_param(model: &str, name: &str) -> sw_types::SwError {
    sw_types::config_error!("unknown parameter {} for {}", name, model)
}

fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> SwResult<usize> {
    if x.is_empty() || x.len() != y.len() {
        return Err(validation_error!(
            "need matching non-empty features and target, got {} rows and {} targets",
            x.len(),
            y.len()
        ));
    }
    let width = x[0].len();
    if x.iter().any(|row| row.len() != width) {
        return Err(validation_error!("feature rows have differing widths"));
    }
    Ok(width)
}

fn check_width(x: &[Vec<f64>], expected: usize) -> SwResult<()> {
    match x.iter().find(|row| row.len() != expected) {
        Some(row) => Err(validation_error!(
            "expected {} features, got {}",
            expected,
            row.len()
        )),
        None => Ok(()),
    }
}
