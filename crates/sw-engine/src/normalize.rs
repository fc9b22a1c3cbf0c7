//! Integer coercion for parameters whose search distribution is continuous.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use sw_types::{validation_error, ParamSet, ParamValue, SwResult};

/// Parameter names that must reach the model as integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerRules {
    names: BTreeSet<String>,
}

impl IntegerRules {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// No coercion at all.
    pub fn none() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Copy of `params` with every listed key truncated to an integer.
    ///
    /// Keys are never added or dropped, and applying this twice gives the
    /// same result as applying it once.
    pub fn normalize(&self, params: &ParamSet) -> SwResult<ParamSet> {
        params
            .iter()
            .map(|(name, value)| -> SwResult<(String, ParamValue)> {
                let value = if self.contains(name) {
                    truncate(name, value)?
                } else {
                    value.clone()
                };
                Ok((name.clone(), value))
            })
            .collect()
    }
}

impl Default for IntegerRules {
    fn default() -> Self {
        Self::new(["max_depth", "reg_alpha"])
    }
}

fn truncate(name: &str, value: &ParamValue) -> SwResult<ParamValue> {
    match value {
        ParamValue::Int(v) => Ok(ParamValue::Int(*v)),
        ParamValue::Bool(v) => Ok(ParamValue::Int(i64::from(*v))),
        ParamValue::Float(v) => float_to_int(name, *v),
        ParamValue::Str(s) => s.trim().parse::<i64>().map(ParamValue::Int).map_err(|_| {
            validation_error!(
                "parameter {} must be integral, got non-integral string {:?}",
                name,
                s
            )
        }),
    }
}

fn float_to_int(name: &str, v: f64) -> SwResult<ParamValue> {
    let t = v.trunc();
    if !t.is_finite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err(validation_error!(
            "parameter {} must be integral, got out-of-range value {}",
            name,
            v
        ));
    }
    Ok(ParamValue::Int(t as i64))
}
