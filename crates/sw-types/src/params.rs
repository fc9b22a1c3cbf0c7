//! Concrete hyperparameter values and assignments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{SwError, SwResult};

/// A concrete hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Numeric view of the value. Booleans and strings are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A parameter assignment: name -> value, ordered by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Union of two assignments where `overlay` wins on key conflicts.
pub fn merge_params(base: &ParamSet, overlay: &ParamSet) -> ParamSet {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Renders an assignment as `{a: 1, b: 0.5}` for log lines.
pub fn format_params(params: &ParamSet) -> String {
    let body: Vec<String> = params.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", body.join(", "))
}

/// Reads a non-negative integral parameter; reals are rejected.
pub fn param_as_usize(name: &str, value: &ParamValue) -> SwResult<usize> {
    match value {
        ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
        other => Err(SwError::Config(format!(
            "parameter {name} expects a non-negative integer, got {other} ({})",
            other.kind()
        ))),
    }
}

/// Reads a finite real parameter; integers are widened.
pub fn param_as_f64(name: &str, value: &ParamValue) -> SwResult<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(SwError::Config(format!(
            "parameter {name} expects a finite number, got {value} ({})",
            value.kind()
        ))),
    }
}

pub fn param_as_bool(name: &str, value: &ParamValue) -> SwResult<bool> {
    value.as_bool().ok_or_else(|| {
        SwError::Config(format!(
            "parameter {name} expects a bool, got {value} ({})",
            value.kind()
        ))
    })
}
