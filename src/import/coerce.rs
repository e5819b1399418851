//! Cell value coercion. Never fails: unusable input degrades to a default and
//! is reported through [`Coerced::diagnostic`].

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Why a coerced value differs from what the spreadsheet held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The cell held something that could not be parsed; the default was used.
    Defaulted,
    /// The text was cut to the configured maximum length.
    Truncated,
    /// A score outside {0, 10, 20}; stored as given.
    OutOfRangeScore,
}

/// Scores the dashboard offers for each metric.
pub const ALLOWED_SCORES: [i32; 3] = [0, 10, 20];

#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub diagnostic: Option<DiagnosticKind>,
}

impl<T> Coerced<T> {
    fn clean(value: T) -> Self {
        Self { value, diagnostic: None }
    }

    fn flagged(value: T, kind: DiagnosticKind) -> Self {
        Self { value, diagnostic: Some(kind) }
    }
}

/// Text form of a cell for diagnostics.
pub fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Name, role, email and mobile: falsy cells become `None`.
pub fn to_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

/// Years of experience. Missing or blank is 0 without a diagnostic.
pub fn to_experience(value: Option<&Value>) -> Coerced<f64> {
    if is_blank(value) {
        return Coerced::clean(0.0);
    }
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(years) if years.is_finite() && years >= 0.0 => Coerced::clean(years),
        _ => Coerced::flagged(0.0, DiagnosticKind::Defaulted),
    }
}

/// One of the four evaluation scores. Any integer is accepted; values
/// outside [`ALLOWED_SCORES`] are flagged but kept.
pub fn to_score(value: Option<&Value>) -> Coerced<i32> {
    if is_blank(value) {
        return Coerced::clean(0);
    }
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };
    match parsed.and_then(|n| i32::try_from(n).ok()) {
        Some(score) if ALLOWED_SCORES.contains(&score) => Coerced::clean(score),
        Some(score) => Coerced::flagged(score, DiagnosticKind::OutOfRangeScore),
        None => Coerced::flagged(0, DiagnosticKind::Defaulted),
    }
}

/// Skills cell to text, truncated to `max_len` characters.
pub fn to_skills(value: Option<&Value>, max_len: usize) -> Coerced<Option<String>> {
    let text = match value {
        None | Some(Value::Null) => return Coerced::clean(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(display_raw)
            .collect::<Vec<_>>()
            .join(", "),
        Some(object @ Value::Object(_)) => object.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };
    if text.is_empty() {
        return Coerced::clean(None);
    }
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => Coerced::flagged(Some(text[..cut].to_string()), DiagnosticKind::Truncated),
        None => Coerced::clean(Some(text)),
    }
}
