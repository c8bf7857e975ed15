// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;
use std::sync::LazyLock;

use crate::model::{FieldKind, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceError {
    InvalidInt,
    InvalidFloat,
}

impl std::fmt::Display for CoerceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInt => f.write_str("invalid integer value"),
            Self::InvalidFloat => f.write_str("invalid decimal value"),
        }
    }
}

impl std::error::Error for CoerceError {}

pub type CoerceResult<T> = std::result::Result<T, CoerceError>;

/// Turn edited cell text into a value of the declared kind.
///
/// An error means the text is not a value of that kind; callers treat it as
/// "no change" and never store it.
pub fn coerce(raw: &str, kind: FieldKind) -> CoerceResult<FieldValue> {
    match kind {
        FieldKind::String => Ok(FieldValue::Text(normalize_line_breaks(raw))),
        FieldKind::Integer => parse_integer(raw).map(FieldValue::Integer),
        FieldKind::Float => parse_float(raw).map(FieldValue::Float),
        FieldKind::Boolean => Ok(FieldValue::Boolean(parse_boolean(raw))),
    }
}

pub fn parse_integer(raw: &str) -> CoerceResult<i64> {
    let trimmed = raw.trim();
    let digits = strip_sign(trimmed);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(CoerceError::InvalidInt);
    }
    trimmed.parse::<i64>().map_err(|_| CoerceError::InvalidInt)
}

pub fn parse_float(raw: &str) -> CoerceResult<f64> {
    let trimmed = raw.trim();
    let negative = trimmed.starts_with('-');
    let unsigned = strip_sign(trimmed);

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            if fraction.is_empty() {
                return Err(CoerceError::InvalidFloat);
            }
            (whole, fraction)
        }
        None => (unsigned, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(CoerceError::InvalidFloat);
    }
    let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(CoerceError::InvalidFloat);
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let canonical = if fraction.is_empty() {
        whole.to_owned()
    } else {
        format!("{whole}.{fraction}")
    };
    let value = canonical
        .parse::<f64>()
        .map_err(|_| CoerceError::InvalidFloat)?;
    if !value.is_finite() {
        return Err(CoerceError::InvalidFloat);
    }
    Ok(if negative { -value } else { value })
}

pub fn parse_boolean(raw: &str) -> bool {
    raw == "true" || raw == "1"
}

fn strip_sign(value: &str) -> &str {
    value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value)
}

static EMPTY_DIV_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<div>\s*<br\s*/?>\s*</div>").expect("valid regex"));
static DIV_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</div>\s*<div>").expect("valid regex"));
static LEADING_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<div>").expect("valid regex"));
static TRAILING_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</div>$").expect("valid regex"));
static STRAY_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?div>").expect("valid regex"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

/// Rich-text editors mark line breaks with `<br>` and `<div>` blocks; each
/// one becomes a single `\n`. Nothing else in the text is touched.
pub fn normalize_line_breaks(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = EMPTY_DIV_LINE.replace_all(&text, "<div></div>");
    let text = DIV_BOUNDARY.replace_all(&text, "\n");
    let text = LEADING_DIV.replace(&text, "");
    let text = TRAILING_DIV.replace(&text, "");
    let text = STRAY_DIV.replace_all(&text, "\n");
    LINE_BREAK.replace_all(&text, "\n").into_owned()
}

/// Inverse of [`normalize_line_breaks`] for writing text back into a
/// rich-text editor.
pub fn text_to_rich(text: &str) -> String {
    text.replace('\n', "<br>")
}
