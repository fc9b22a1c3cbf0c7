//! Fold scoring rules. Every rule follows "higher is better".

use std::fmt;
use std::sync::Arc;
use sw_types::{config_error, r2_score, validation_error, SwResult};

/// User-supplied `(y_true, y_pred) -> score` function.
pub type ScoreFn = Arc<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync>;

#[derive(Clone, Default)]
pub enum Scoring {
    #[default]
    NegMeanSquaredError,
    NegMeanAbsoluteError,
    NegRootMeanSquaredError,
    R2,
    /// Fraction of predictions that round to the true label.
    Accuracy,
    Custom { name: String, func: ScoreFn },
}

impl Scoring {
    /// Parse one of the built-in metric names.
    pub fn from_name(name: &str) -> SwResult<Self> {
        match name {
            "neg_mean_squared_error" => Ok(Self::NegMeanSquaredError),
            "neg_mean_absolute_error" => Ok(Self::NegMeanAbsoluteError),
            "neg_root_mean_squared_error" => Ok(Self::NegRootMeanSquaredError),
            "r2" => Ok(Self::R2),
            "accuracy" => Ok(Self::Accuracy),
            other => Err(config_error!("unknown scoring name: {}", other)),
        }
    }

    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::NegMeanSquaredError => "neg_mean_squared_error",
            Self::NegMeanAbsoluteError => "neg_mean_absolute_error",
            Self::NegRootMeanSquaredError => "neg_root_mean_squared_error",
            Self::R2 => "r2",
            Self::Accuracy => "accuracy",
            Self::Custom { name, .. } => name,
        }
    }

    pub fn score(&self, y_true: &[f64], y_pred: &[f64]) -> SwResult<f64> {
        if y_true.len() != y_pred.len() || y_true.is_empty() {
            return Err(validation_error!(
                "cannot score {} predictions against {} targets",
                y_pred.len(),
                y_true.len()
            ));
        }
        let n = y_true.len() as f64;
        let errors = y_true.iter().zip(y_pred).map(|(t, p)| t - p);
        let score = match self {
            Self::NegMeanSquaredError => -errors.map(|e| e * e).sum::<f64>() / n,
            Self::NegMeanAbsoluteError => -errors.map(f64::abs).sum::<f64>() / n,
            Self::NegRootMeanSquaredError => -(errors.map(|e| e * e).sum::<f64>() / n).sqrt(),
            Self::R2 => r2_score(y_true, y_pred)?,
            Self::Accuracy => {
                let hits = y_true
                    .iter()
                    .zip(y_pred)
                    .filter(|(t, p)| t.round() == p.round())
                    .count();
                hits as f64 / n
            }
            Self::Custom { func, .. } => func(y_true, y_pred),
        };
        Ok(score)
    }
}

impl fmt::Debug for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scoring({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y: [f64; 4] = [1.0, 2.0, 3.0, 4.0];
    const P: [f64; 4] = [1.0, 2.0, 3.0, 6.0];

    #[test]
    fn error_metrics_are_negated() {
        let mse = Scoring::NegMeanSquaredError.score(&Y, &P).unwrap();
        assert!((mse + 1.0).abs() < 1e-12);

        let mae = Scoring::NegMeanAbsoluteError.score(&Y, &P).unwrap();
        assert!((mae + 0.5).abs() < 1e-12);

        let rmse = Scoring::NegRootMeanSquaredError.score(&Y, &P).unwrap();
        assert!((rmse + 1.0).abs() < 1e-12);
    }

    #[test]
    fn accuracy_compares_rounded_labels() {
        let acc = Scoring::Accuracy
            .score(&[0.0, 1.0, 1.0, 0.0], &[0.1, 0.8, 0.2, 0.4])
            .unwrap();
        assert!((acc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn names_round_trip_through_parser() {
        for name in [
            "neg_mean_squared_error",
            "neg_mean_absolute_error",
            "neg_root_mean_squared_error",
            "r2",
            "accuracy",
        ] {
            assert_eq!(Scoring::from_name(name).unwrap().name(), name);
        }
        assert!(Scoring::from_name("f1_macro").unwrap_err().is_config());
    }

    #[test]
    fn custom_scorer_is_called_verbatim() {
        let scoring = Scoring::custom("max_error", |t, p| {
            -t.iter().zip(p).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
        });
        assert_eq!(scoring.score(&Y, &P).unwrap(), -2.0);
        assert_eq!(format!("{scoring:?}"), "Scoring(max_error)");
    }

    #[test]
    fn default_is_negative_mse() {
        assert_eq!(Scoring::default().name(), "neg_mean_squared_error");
    }
}
