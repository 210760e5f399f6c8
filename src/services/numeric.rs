// src/services/numeric.rs
//! Conversion between financial-statement cell text ("1.23B", "(4.50%)", "-")
//! and numbers.
//!
//! `format` and `parse` are deliberately not inverses: anything below 10 in
//! magnitude is treated as a ratio and rendered as a percentage, so
//! `parse(format(x)) == x` only holds at or above 10 and, below it, through
//! the `%` suffix which `parse` scales back by 0.01.
use log::warn;
use serde_json::Value;

use crate::error::CodecError;

/// Text of a cell with no data.
pub const MISSING: &str = "-";

fn unit_scale(unit: char) -> Option<f64> {
    match unit {
        'M' => Some(1e6),
        'B' => Some(1e9),
        'T' => Some(1e12),
        '%' => Some(0.01),
        _ => None,
    }
}

/// Parses cell text, reporting malformed text as an error. Dashes are
/// missing data, not errors.
pub fn try_parse(text: &str) -> Result<Option<f64>, CodecError> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(CodecError::Empty);
    }

    // "(12.5M)" is the statement convention for -12.5M
    let (negative, body) = match cleaned.strip_prefix('(') {
        Some(inner) => (true, inner.strip_suffix(')').unwrap_or(inner)),
        None => (false, cleaned.as_str()),
    };
    if body == "-" || body == "--" || (negative && body.is_empty()) {
        return Ok(None);
    }

    let magnitude = match body.parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            let mut chars = body.chars();
            let unit = chars
                .next_back()
                .ok_or_else(|| CodecError::Malformed(text.to_string()))?;
            let scale = unit_scale(unit).ok_or_else(|| CodecError::Malformed(text.to_string()))?;
            let digits = chars.as_str();
            digits
                .parse::<f64>()
                .map_err(|_| CodecError::Malformed(text.to_string()))?
                * scale
        }
    };

    Ok(Some(if negative { -magnitude } else { magnitude }))
}

/// Parses cell text; malformed text is logged and read as missing so one bad
/// cell never fails an ingestion.
pub fn parse(text: &str) -> Option<f64> {
    match try_parse(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unreadable numeric cell: {}", e);
            None
        }
    }
}

/// Parses a JSON value that should hold either a number or cell text.
pub fn parse_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse(s),
        Value::Null => None,
        other => {
            warn!("Unreadable numeric cell: {}", CodecError::Unsupported(other.to_string()));
            None
        }
    }
}

/// Magnitude-adaptive rendering: T/B/M above 10^12/10^9/10^6, a percentage
/// below 10, plain two decimals otherwise. Negatives go in parentheses.
pub fn format(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let magnitude = value.abs();
    let (scaled, suffix) = if magnitude > 1e12 {
        (magnitude / 1e12, "T")
    } else if magnitude > 1e9 {
        (magnitude / 1e9, "B")
    } else if magnitude > 1e6 {
        (magnitude / 1e6, "M")
    } else if magnitude < 10.0 {
        (magnitude * 100.0, "%")
    } else {
        (magnitude, "")
    };

    if value >= 0.0 {
        format!("{:.2}{}", scaled, suffix)
    } else {
        format!("({:.2}{})", scaled, suffix)
    }
}

pub fn format_or_missing(value: Option<f64>) -> String {
    value.map(format).unwrap_or_else(|| MISSING.to_string())
}
