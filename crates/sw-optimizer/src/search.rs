//! Search space definitions for one optimization stage.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sw_types::{OptimizerError, ParamSet, ParamValue};

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Hyperparameter name as the model knows it (e.g. "max_depth").
    pub name: String,
    /// The distribution candidates are drawn from.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous uniform range [low, high].
    Uniform { low: f64, high: f64 },
    /// Uniform range snapped to multiples of `q`. Values stay real.
    QUniform { low: f64, high: f64, q: f64 },
    /// Log-uniform range (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64 },
    /// Categorical choices.
    Choice { values: Vec<ParamValue> },
}

impl ParameterKind {
    /// Draw one value from this distribution.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamValue {
        match self {
            Self::Uniform { low, high } => ParamValue::Float(rng.random_range(*low..=*high)),
            Self::QUniform { low, high, q } => {
                let raw: f64 = rng.random_range(*low..=*high);
                ParamValue::Float(quantize(raw, *q))
            }
            Self::LogUniform { low, high } => {
                let log_val: f64 = rng.random_range(low.ln()..=high.ln());
                ParamValue::Float(log_val.exp().clamp(*low, *high))
            }
            Self::IntRange { low, high } => ParamValue::Int(rng.random_range(*low..=*high)),
            Self::Choice { values } => values[rng.random_range(0..values.len())].clone(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), OptimizerError> {
        let invalid = |message: &str| OptimizerError::InvalidDistribution {
            parameter: name.to_string(),
            message: message.to_string(),
        };
        match self {
            Self::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite() && low < high) {
                    return Err(invalid("bounds must be finite with low < high"));
                }
                if !(high - low).is_finite() {
                    return Err(invalid("range width overflows f64"));
                }
            }
            Self::QUniform { low, high, q } => {
                if !(low.is_finite() && high.is_finite() && low < high) {
                    return Err(invalid("bounds must be finite with low < high"));
                }
                if !(high - low).is_finite() {
                    return Err(invalid("range width overflows f64"));
                }
                if !(q.is_finite() && *q > 0.0) {
                    return Err(invalid("q must be positive"));
                }
            }
            Self::LogUniform { low, high } => {
                if !(*low > 0.0 && high.is_finite() && low < high) {
                    return Err(invalid("bounds must satisfy 0 < low < high"));
                }
            }
            Self::IntRange { low, high } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
            }
            Self::Choice { values } => {
                if values.is_empty() {
                    return Err(invalid("choice needs at least one value"));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn quantize(value: f64, q: f64) -> f64 {
    (value / q).round() * q
}

/// The parameter sub-space searched during one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Optional label used in progress output.
    #[serde(default)]
    pub name: Option<String>,
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            name: None,
            parameters: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            parameters: Vec::new(),
        }
    }

    pub fn add_uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, ParameterKind::Uniform { low, high })
    }

    pub fn add_quniform(self, name: impl Into<String>, low: f64, high: f64, q: f64) -> Self {
        self.add(name, ParameterKind::QUniform { low, high, q })
    }

    pub fn add_log_uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, ParameterKind::LogUniform { low, high })
    }

    pub fn add_int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(name, ParameterKind::IntRange { low, high })
    }

    pub fn add_choice(self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.add(name, ParameterKind::Choice { values })
    }

    fn add(mut self, name: impl Into<String>, kind: ParameterKind) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Reject empty spaces, duplicate names and malformed distributions.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if self.parameters.is_empty() {
            return Err(OptimizerError::EmptySpace);
        }
        for (i, param) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(OptimizerError::InvalidDistribution {
                    parameter: param.name.clone(),
                    message: "parameter listed twice in one stage".to_string(),
                });
            }
            param.kind.validate(&param.name)?;
        }
        Ok(())
    }

    /// Independent random draw of every parameter.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamSet {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.kind.sample(rng)))
            .collect()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}
