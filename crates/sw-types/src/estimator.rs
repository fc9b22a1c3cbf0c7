//! The capability set a tunable model must offer.

use crate::errors::{SwError, SwResult};
use crate::params::ParamSet;

/// A supervised model that can be reconfigured, fitted and scored.
///
/// `set_params` merges the given names into the model's configuration and
/// rejects names it does not know. `predict` and `score` on a model that has
/// never been fitted return [`SwError::NotFitted`].
pub trait Estimator {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> SwResult<()>;

    fn predict(&self, x: &[Vec<f64>]) -> SwResult<Vec<f64>>;

    fn set_params(&mut self, params: &ParamSet) -> SwResult<()>;

    /// Current configuration.
    fn get_params(&self) -> ParamSet;

    /// Coefficient of determination of the predictions.
    fn score(&self, x: &[Vec<f64>], y: &[f64]) -> SwResult<f64> {
        let predictions = self.predict(x)?;
        r2_score(y, &predictions)
    }
}

/// R² of `y_pred` against `y_true`. A constant target scores 1.0 on an exact
/// fit and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> SwResult<f64> {
    if y_true.len() != y_pred.len() || y_true.is_empty() {
        return Err(SwError::Validation(format!(
            "cannot score {} predictions against {} targets",
            y_pred.len(),
            y_true.len()
        )));
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_score_one() {
        let y = [1.0, 2.0, 3.0];
        assert!((r2_score(&y, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_predictions_score_zero() {
        let y = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert!(r2_score(&y, &p).unwrap().abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(r2_score(&[1.0], &[1.0, 2.0]).is_err());
    }
}
