// Cell value coercion shared by every phase that reads raw properties.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Whether a cell carries nothing: missing, null, or whitespace-only text.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text form of a scalar cell. Blank cells, arrays and objects yield `None`.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Spreadsheet truthiness: `true`, `yes`, `y`, `x` and `1` (any case) are set.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "x" | "1"
        ),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Read an integral cell. `Err` carries the offending text.
pub fn parse_integer(value: &Value) -> Result<i128, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(i128::from(u))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i128),
                    _ => Err(n.to_string()),
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i128>().or_else(|_| match trimmed.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i128),
                _ => Err(trimmed.to_string()),
            })
        }
        other => Err(other.to_string()),
    }
}

/// Read a numeric cell as a float. `Err` carries the offending text.
pub fn parse_float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| n.to_string()),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| s.trim().to_string()),
        other => Err(other.to_string()),
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Whether a name can be used verbatim as a type or field identifier.
pub fn is_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// The `package.Model` key used by the hierarchy and import tables.
pub fn qualified_name(package: &str, model: &str) -> String {
    format!("{package}.{model}")
}
