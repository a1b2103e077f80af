//! # Time String Normalization
//!
//! Upstream timing strings are free-form: the API may append a timezone
//! abbreviation (`"04:12 (PKT)"`), drop a leading zero (`"4:12"`) or send
//! garbage. This module scans for the first `H:MM`/`HH:MM` substring and turns
//! it into a canonical zero-padded `HH:MM`.
//!
//! Out-of-range fields are clamped rather than rejected: `"25:99"` becomes
//! `"23:59"`. Only text with no recognisable time at all is refused.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Loose pattern: 1–2 digit hour, colon, exactly 2 digit minute, anywhere in the text.
static LOOSE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2}):([0-9]{2})").expect("loose time pattern is valid"));

/// Strict canonical shape.
static CANONICAL_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}$").expect("canonical time pattern is valid"));

/// Normalize a raw time string into canonical `HH:MM`.
///
/// Returns `None` when no time-like substring exists.
///
/// # Example
/// ```
/// use prayer_arc_lib::normalize::normalize;
///
/// assert_eq!(normalize("25:99").as_deref(), Some("23:59"));
/// assert_eq!(normalize("4:07 (PKT)").as_deref(), Some("04:07"));
/// assert_eq!(normalize("bad"), None);
/// ```
pub fn normalize(raw: &str) -> Option<String> {
    let caps = LOOSE_TIME.captures(raw)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    Some(format!("{:02}:{:02}", hour.min(23), minute.min(59)))
}

/// Normalize an arbitrary JSON value.
///
/// The value is first coerced to text: strings as-is, numbers and booleans by
/// their textual form, arrays by joining their elements with `,`. Missing
/// values, `null` and objects carry no time and yield `None`.
pub fn normalize_value(raw: Option<&Value>) -> Option<String> {
    normalize(&coerce_to_text(raw?)?)
}

/// Strict check for the canonical `HH:MM` shape.
pub fn is_canonical(value: &str) -> bool {
    CANONICAL_TIME.is_match(value)
}

fn coerce_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| coerce_to_text(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Null | Value::Object(_) => None,
    }
}
