//! Typed sample values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Type a sample token is decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Str,
    Int,
    Float,
    Bool,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Str => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueType {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "str" => Ok(ValueType::Str),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" => Ok(ValueType::Bool),
            other => Err(MonitorError::UnknownType(other.to_string())),
        }
    }
}

/// A decoded sample token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// One entry of a field's time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricEntry {
    Scalar(MetricValue),
    Vector(Vec<MetricValue>),
}

/// Arrival-ordered entries of one field.
pub type MetricSeries = Vec<MetricEntry>;

/// Time series per field name.
pub type Measurements = BTreeMap<String, MetricSeries>;

/// Decode one token.
///
/// Booleans accept `true`/`1`/`on` and `false`/`0`/`off`, case-insensitively.
pub fn decode(token: &str, kind: ValueType) -> Result<MetricValue> {
    let invalid = || MonitorError::Decode {
        token: token.to_string(),
        kind,
    };

    match kind {
        ValueType::Str => Ok(MetricValue::Text(token.to_string())),
        ValueType::Int => token.parse().map(MetricValue::Int).map_err(|_| invalid()),
        ValueType::Float => token.parse().map(MetricValue::Float).map_err(|_| invalid()),
        ValueType::Bool => match token.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Ok(MetricValue::Bool(true)),
            "false" | "0" | "off" => Ok(MetricValue::Bool(false)),
            _ => Err(invalid()),
        },
    }
}
