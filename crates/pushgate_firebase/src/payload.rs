//! Data payloads and their normalisation to the provider's string-only data channel.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;

/// A payload value as accepted from API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    String(String),
    Bool(bool),
    Number(Number),
    /// Objects, arrays and null
    Structured(Value),
}

/// Application-defined key/value data of a data-only message.
pub type Payload = HashMap<String, PayloadValue>;

impl PayloadValue {
    /// Renders the value as a string: strings unchanged, everything else as compact JSON.
    /// Integral floats are written without a fraction.
    pub fn normalize(&self) -> String {
        match self {
            PayloadValue::String(value) => value.clone(),
            PayloadValue::Bool(value) => value.to_string(),
            PayloadValue::Number(value) => normalize_number(value),
            PayloadValue::Structured(value) => value.to_string(),
        }
    }
}

/// Integral floats lose their fraction (`1.0` -> `"1"`, `1e2` -> `"100"`),
/// matching how JSON numbers are usually stringified.
fn normalize_number(value: &Number) -> String {
    match value.as_f64() {
        Some(float)
            if value.is_f64() && float.fract() == 0.0 && float.abs() < MAX_EXACT_INTEGER =>
        {
            format!("{}", float as i64)
        }
        _ => value.to_string(),
    }
}

/// 2^53; integral floats at or above this render through `Number`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(value) => PayloadValue::String(value),
            Value::Bool(value) => PayloadValue::Bool(value),
            Value::Number(value) => PayloadValue::Number(value),
            other => PayloadValue::Structured(other),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::String(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::String(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Number(value.into())
    }
}

/// Converts every value of `payload` to a string.
pub fn normalize_payload(payload: &Payload) -> HashMap<String, String> {
    payload
        .iter()
        .map(|(key, value)| (key.clone(), value.normalize()))
        .collect()
}
