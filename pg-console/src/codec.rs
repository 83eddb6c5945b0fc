//! Row codec: type-directed input handling for grid cells
//!
//! Pure functions mapping a catalog type name to an input affordance, checking
//! raw user input against it, and converting between stored values and the
//! strings shown in edit forms. Empty input always means SQL NULL.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Tokens accepted for boolean columns (compared case-insensitively)
pub const BOOLEAN_TOKENS: [&str; 8] = ["true", "false", "0", "1", "t", "f", "yes", "no"];

const TRUE_TOKENS: [&str; 4] = ["true", "t", "1", "yes"];
const FALSE_TOKENS: [&str; 4] = ["false", "f", "0", "no"];

/// How a column's values are entered and displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Integer,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
    Text,
}

impl InputKind {
    /// HTML `<input type>` used by the grid's edit forms
    pub fn html_input_type(self) -> &'static str {
        match self {
            InputKind::Integer | InputKind::Decimal => "number",
            InputKind::Boolean => "checkbox",
            InputKind::Date => "date",
            InputKind::Time => "time",
            InputKind::Timestamp => "datetime-local",
            InputKind::Text => "text",
        }
    }
}

/// Result of checking one raw input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub message: String,
}

impl ValidationOutcome {
    fn valid() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            valid: false,
            message: message.to_string(),
        }
    }
}

/// Map a catalog type name to its input kind, defaulting to text
///
/// Matching is case-insensitive and ignores type modifiers, so
/// `"NUMERIC(10,2)"` and `"timestamp(3) without time zone"` classify like
/// their bare forms.
pub fn classify(sql_type: &str) -> InputKind {
    match normalize_type_name(sql_type).as_str() {
        "integer" | "int" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "serial"
        | "serial4" | "serial8" | "smallserial" | "bigserial" => InputKind::Integer,
        "numeric" | "decimal" | "real" | "double precision" | "float" | "float4" | "float8" => {
            InputKind::Decimal
        }
        "boolean" | "bool" => InputKind::Boolean,
        "date" => InputKind::Date,
        "time" | "time without time zone" | "time with time zone" | "timetz" => InputKind::Time,
        "timestamp" | "timestamp without time zone" | "timestamp with time zone" | "timestamptz" => {
            InputKind::Timestamp
        }
        _ => InputKind::Text,
    }
}

/// Check raw input against the column type
pub fn validate(raw: &str, sql_type: &str) -> ValidationOutcome {
    if raw.is_empty() {
        return ValidationOutcome::valid();
    }

    match classify(sql_type) {
        InputKind::Integer if parse_integer(raw).is_none() => {
            ValidationOutcome::invalid("Please enter a valid integer")
        }
        InputKind::Decimal if parse_decimal(raw).is_none() => {
            ValidationOutcome::invalid("Please enter a valid number")
        }
        InputKind::Boolean if parse_boolean(raw).is_none() => {
            ValidationOutcome::invalid("Please enter true or false")
        }
        InputKind::Date if parse_instant(raw).is_none() => {
            ValidationOutcome::invalid("Please enter a valid date (YYYY-MM-DD)")
        }
        InputKind::Timestamp if parse_instant(raw).is_none() => {
            ValidationOutcome::invalid("Please enter a valid timestamp")
        }
        InputKind::Time if !is_strict_time(raw) => {
            ValidationOutcome::invalid("Please enter a valid time (HH:MM:SS)")
        }
        _ => ValidationOutcome::valid(),
    }
}

/// Canonical display string for a stored value; NULL formats as ""
pub fn format(value: &Value, sql_type: &str) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
    };

    match classify(sql_type) {
        InputKind::Date => parse_instant(&text)
            .map(|instant| instant.format("%Y-%m-%d").to_string())
            .unwrap_or(text),
        InputKind::Timestamp => parse_instant(&text)
            .map(|instant| instant.format("%Y-%m-%dT%H:%M").to_string())
            .unwrap_or(text),
        InputKind::Boolean => {
            let truthy = match value {
                Value::Bool(flag) => *flag,
                _ => parse_boolean(&text) == Some(true),
            };
            truthy.to_string()
        }
        _ => text,
    }
}

/// Convert raw form input into the value submitted to the server
///
/// Empty input is NULL for every type. Input that does not parse for a
/// numeric or boolean column is passed through as text and left for the
/// database to reject.
pub fn parse(raw: &str, sql_type: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }

    let parsed = match classify(sql_type) {
        InputKind::Integer => parse_integer(raw).map(Value::from),
        InputKind::Decimal => parse_decimal(raw).and_then(Number::from_f64).map(Value::Number),
        InputKind::Boolean => parse_boolean(raw).map(Value::Bool),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn normalize_type_name(sql_type: &str) -> String {
    let mut bare = String::with_capacity(sql_type.len());
    let mut depth = 0usize;
    for character in sql_type.chars() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => bare.push(character.to_ascii_lowercase()),
            _ => {}
        }
    }
    bare.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

fn parse_boolean(raw: &str) -> Option<bool> {
    let token = raw.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse a calendar date or date-time, normalizing offsets to UTC
fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.naive_utc());
    }
    // Postgres text output for timestamptz, e.g. "2024-01-05 10:30:00+00"
    if let Ok(instant) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(instant.naive_utc());
    }
    if let Some(instant) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(instant);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `HH:MM:SS` with a 24-hour clock and nothing else
fn is_strict_time(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 8 || bytes[2] != b':' || bytes[5] != b':' {
        return false;
    }
    let field = |start: usize| -> Option<u8> {
        let pair = &bytes[start..start + 2];
        pair.iter()
            .all(u8::is_ascii_digit)
            .then(|| (pair[0] - b'0') * 10 + (pair[1] - b'0'))
    };
    matches!(
        (field(0), field(3), field(6)),
        (Some(hours), Some(minutes), Some(seconds)) if hours < 24 && minutes < 60 && seconds < 60
    )
}
