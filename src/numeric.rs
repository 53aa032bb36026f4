//! Numeric parser for free-text answers
//!
//! Chat clients paste numbers with invisible formatting characters and either
//! decimal separator. Everything that reaches the engines goes through here.
//!
//! Convention: `,` and `.` are both decimal separators and at most one may
//! appear. Thousands separators are not supported, so `100,000.50` is rejected.

use crate::error::BotError;
use crate::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Characters some clients insert around numbers. Removed before parsing.
const INVISIBLE: &[char] = &[
    '\u{00AD}', // soft hyphen
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{200E}', // left-to-right mark
    '\u{200F}', // right-to-left mark
    '\u{2060}', // word joiner
    '\u{2066}', // directional isolates
    '\u{2067}',
    '\u{2068}',
    '\u{2069}',
    '\u{FEFF}', // byte order mark
];

/// Strip invisible characters and surrounding whitespace.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !INVISIBLE.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a monetary amount.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    to_decimal(&clean(raw))
}

/// Parse a per-period rate as a fraction. A trailing `%` marks a percentage.
pub fn parse_rate(raw: &str) -> Result<Decimal> {
    let cleaned = clean(raw);
    match cleaned.strip_suffix('%') {
        Some(pct) => Ok(to_decimal(pct.trim_end())? / Decimal::ONE_HUNDRED),
        None => to_decimal(&cleaned),
    }
}

/// Parse a whole count such as a number of payments or a period index.
pub fn parse_count(raw: &str) -> Result<u32> {
    let value = to_decimal(&clean(raw))?;

    if !value.fract().is_zero() {
        return Err(BotError::Parse(format!("'{}' is not a whole number", value)));
    }
    if value.is_sign_negative() && !value.is_zero() {
        return Err(BotError::InvalidInput(
            "The number must be greater than zero.".to_string(),
        ));
    }

    value.to_u32().ok_or_else(|| {
        BotError::InvalidInput("That number is too large.".to_string())
    })
}

fn to_decimal(cleaned: &str) -> Result<Decimal> {
    let (negative, body) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned),
    };

    let mut digits = 0usize;
    let mut separators = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' | ',' => separators += 1,
            _ => {
                return Err(BotError::Parse(format!(
                    "unexpected character '{}' in '{}'",
                    c, cleaned
                )))
            }
        }
    }

    if digits == 0 {
        return Err(BotError::Parse(format!("'{}' contains no digits", cleaned)));
    }
    if separators > 1 {
        return Err(BotError::Parse(format!(
            "'{}' has more than one decimal separator",
            cleaned
        )));
    }

    let mut normalized = body.replace(',', ".");
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }
    if normalized.ends_with('.') {
        normalized.pop();
    }
    if negative {
        normalized.insert(0, '-');
    }

    Decimal::from_str(&normalized)
        .map_err(|e| BotError::Parse(format!("'{}' is not representable: {}", cleaned, e)))
}
