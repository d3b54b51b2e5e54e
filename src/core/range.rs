// src/core/range.rs

use crate::constants::MAX_RANGE_ITEMS;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // Anything brace-wrapped containing `..` is treated as a range, valid or not.
    static ref RANGE_RE: Regex = Regex::new(r"^\{[^{}]*\.\.[^{}]*\}$").unwrap();
    static ref NUMERIC_RANGE_RE: Regex =
        Regex::new(r"^\{([+-]?\d+)\.\.([+-]?\d+)(?:\.\.([+-]?\d+))?\}$").unwrap();
    static ref ALPHA_RANGE_RE: Regex =
        Regex::new(r"^\{([A-Za-z])\.\.([A-Za-z])(?:\.\.([+-]?\d+))?\}$").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RangeError {
    #[error("Malformed range expression '{0}'.")]
    Malformed(String),
    #[error("Range expression '{0}' has a step of zero.")]
    ZeroStep(String),
    #[error("Range expression '{0}' mixes upper and lower case letters.")]
    MixedCase(String),
    #[error("Range expression '{expr}' would produce more than {max} items.")]
    TooLarge { expr: String, max: usize },
}

/// Returns true when `token` uses range syntax, e.g. `{1..10}` or `{a..e}`.
pub fn is_range_expression(token: &str) -> bool {
    RANGE_RE.is_match(token)
}

/// Expands a range expression into its explicit items.
///
/// Supported forms:
/// - `{1..5}`, `{5..1}`, `{0..20..5}`: inclusive integer ranges, with an optional step.
/// - `{01..10}`: zero-padded to the width of the widest bound.
/// - `{a..e}`, `{Z..V..2}`: single ASCII letters of the same case.
pub fn expand_range(token: &str) -> Result<Vec<String>, RangeError> {
    if let Some(caps) = NUMERIC_RANGE_RE.captures(token) {
        let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) else {
            return Err(RangeError::Malformed(token.to_string()));
        };
        let step = parse_step(token, caps.get(3).map(|m| m.as_str()))?;
        let width = padding_width(start.as_str(), end.as_str());
        let start = parse_bound(token, start.as_str())?;
        let end = parse_bound(token, end.as_str())?;

        let items = stepped(token, start, end, step)?
            .into_iter()
            .map(|n| match width {
                Some(w) => format!("{:0w$}", n, w = w),
                None => n.to_string(),
            })
            .collect();
        return Ok(items);
    }

    if let Some(caps) = ALPHA_RANGE_RE.captures(token) {
        let (Some(start), Some(end)) = (
            caps.get(1).and_then(|m| m.as_str().chars().next()),
            caps.get(2).and_then(|m| m.as_str().chars().next()),
        ) else {
            return Err(RangeError::Malformed(token.to_string()));
        };
        if start.is_ascii_uppercase() != end.is_ascii_uppercase() {
            return Err(RangeError::MixedCase(token.to_string()));
        }
        let step = parse_step(token, caps.get(3).map(|m| m.as_str()))?;
        let items = stepped(token, i64::from(u32::from(start)), i64::from(u32::from(end)), step)?
            .into_iter()
            .filter_map(|code| u32::try_from(code).ok().and_then(char::from_u32))
            .map(String::from)
            .collect();
        return Ok(items);
    }

    Err(RangeError::Malformed(token.to_string()))
}

fn parse_bound(token: &str, raw: &str) -> Result<i64, RangeError> {
    raw.parse::<i64>()
        .map_err(|_| RangeError::Malformed(token.to_string()))
}

fn parse_step(token: &str, raw: Option<&str>) -> Result<u64, RangeError> {
    let step = match raw {
        Some(s) => parse_bound(token, s)?.unsigned_abs(),
        None => 1,
    };
    if step == 0 {
        return Err(RangeError::ZeroStep(token.to_string()));
    }
    Ok(step)
}

/// Width to pad to when a bound is written with a leading zero (`01`, `-007`).
fn padding_width(start: &str, end: &str) -> Option<usize> {
    let digits = |s: &str| s.trim_start_matches(['+', '-']).to_string();
    let padded = |s: &str| {
        let d = digits(s);
        d.len() > 1 && d.starts_with('0')
    };
    if padded(start) || padded(end) {
        Some(start.len().max(end.len()))
    } else {
        None
    }
}

/// Inclusive walk from `start` towards `end`, in either direction.
fn stepped(token: &str, start: i64, end: i64, step: u64) -> Result<Vec<i64>, RangeError> {
    let span = start.abs_diff(end);
    let count = usize::try_from(span / step)
        .ok()
        .and_then(|n| n.checked_add(1))
        .filter(|n| *n <= MAX_RANGE_ITEMS)
        .ok_or_else(|| RangeError::TooLarge {
            expr: token.to_string(),
            max: MAX_RANGE_ITEMS,
        })?;

    let step = i64::try_from(step).map_err(|_| RangeError::Malformed(token.to_string()))?;
    let step = if start <= end { step } else { -step };
    Ok((0..count)
        .scan(start, |current, _| {
            let value = *current;
            *current = current.saturating_add(step);
            Some(value)
        })
        .collect())
}
