//! L2-regularized linear regression solved in closed form.

use sw_types::{
    config_error, param_as_bool, param_as_f64, validation_error, Estimator, ParamSet, ParamValue,
    SwError, SwResult,
};

use super::{check_training_data, check_width, unknown_param};

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeRegression {
    alpha: f64,
    fit_intercept: bool,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl RidgeRegression {
    pub fn new() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for RidgeRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> SwResult<()> {
        let p = check_training_data(x, y)?;
        let n = x.len() as f64;

        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean: Vec<f64> = (0..p)
                .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
                .collect();
            (x_mean, y.iter().sum::<f64>() / n)
        } else {
            (vec![0.0; p], 0.0)
        };

        // Normal equations on centered data: (XᵀX + αI) w = Xᵀy
        let mut gram = vec![vec![0.0; p]; p];
        let mut rhs = vec![0.0; p];
        for (row, target) in x.iter().zip(y) {
            let yc = target - y_mean;
            for i in 0..p {
                let xi = row[i] - x_mean[i];
                rhs[i] += xi * yc;
                for j in i..p {
                    gram[i][j] += xi * (row[j] - x_mean[j]);
                }
            }
        }
        for i in 0..p {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
            gram[i][i] += self.alpha;
        }

        let coefficients = solve(gram, rhs)?;
        self.intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> SwResult<Vec<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| SwError::NotFitted("RidgeRegression".into()))?;
        check_width(x, coefficients.len())?;
        Ok(x.iter()
            .map(|row| {
                self.intercept + row.iter().zip(coefficients).map(|(v, w)| v * w).sum::<f64>()
            })
            .collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> SwResult<()> {
        for (name, value) in params {
            match name.as_str() {
                "alpha" => {
                    let alpha = param_as_f64(name, value)?;
                    if alpha < 0.0 {
                        return Err(config_error!("alpha must be non-negative, got {}", alpha));
                    }
                    self.alpha = alpha;
                }
                "fit_intercept" => self.fit_intercept = param_as_bool(name, value)?,
                _ => return Err(unknown_param("RidgeRegression", name)),
            }
        }
        Ok(())
    }

    fn get_params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("alpha".into(), ParamValue::Float(self.alpha));
        params.insert("fit_intercept".into(), ParamValue::Bool(self.fit_intercept));
        params
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> SwResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(validation_error!(
                "singular system; increase alpha or remove collinear features"
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Ok(solution)
}
