//! Case folding and loose value coercion shared by the filter engine.
//!
//! Stored records come from a schemaless document store, so numbers may be
//! stored as strings and optional fields may be missing or empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(Infinity|(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?)").expect("valid float regex")
});

pub fn fold(s: &str) -> String {
    s.to_lowercase()
}

pub fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    fold(haystack).starts_with(&fold(prefix))
}

/// Parse the longest numeric prefix of `s`, ignoring leading whitespace.
///
/// `"12.5/hr"` parses as `12.5`; `"abc"` and `""` do not parse.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let trimmed = s.trim_start();
    let m = FLOAT_PREFIX.find(trimmed)?;
    let raw = m.as_str();
    match raw.trim_start_matches(['+', '-']) {
        "Infinity" => Some(if raw.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }),
        _ => raw.parse::<f64>().ok(),
    }
}

pub fn value_to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

/// Loose truthiness: null, false, 0, NaN and the empty string are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}
