//! Defensive numeric extraction from untyped JSON.
//!
//! The upstream service writes the literal string `"Error"` in place of a
//! count when its own aggregation fails, and omits fields for empty ranges.
//! Every number that reaches KPI arithmetic goes through this module.

use serde_json::{Map, Value};

/// Sentinel the service emits instead of a number.
pub const ERROR_SENTINEL: &str = "Error";

/// Whether strings like `"3.0"` may be coerced to an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FloatStrings {
    /// Only integer strings (`"42"`) are accepted.
    #[default]
    Reject,
    /// Float strings are parsed and truncated toward zero.
    Allow,
}

/// Read an integer field, falling back to `default` for anything unusable.
///
/// `default` is returned when the key is absent, the value is `null`, the
/// `"Error"` sentinel, a boolean, an array or object, or a string that is not
/// an integer.
pub fn safe_numeric_get(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
    safe_numeric_get_with(map, key, default, FloatStrings::Reject)
}

/// [`safe_numeric_get`] with an explicit policy for float strings.
pub fn safe_numeric_get_with(
    map: &Map<String, Value>,
    key: &str,
    default: i64,
    float_strings: FloatStrings,
) -> i64 {
    map.get(key)
        .and_then(|v| coerce_int(v, float_strings))
        .unwrap_or(default)
}

/// Coerce a single JSON value to an integer, or `None` if it is not numeric.
pub fn coerce_int(value: &Value, float_strings: FloatStrings) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_float)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == ERROR_SENTINEL {
                return None;
            }
            s.parse::<i64>().ok().or_else(|| match float_strings {
                FloatStrings::Allow => s.parse::<f64>().ok().and_then(truncate_float),
                FloatStrings::Reject => None,
            })
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Truncate toward zero; NaN, infinities and out-of-range values are rejected.
fn truncate_float(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t < i64::MIN as f64 || t > i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}
