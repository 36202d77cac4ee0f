//! Exact conversion between human-readable decimal amounts and base units.
//!
//! Token amounts are carried as integer base units (`u128`) everywhere past
//! the input boundary. Parsing works on the decimal string directly so no
//! binary float ever touches an amount.

use std::fmt;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from amount parsing and scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    /// The input was empty or contained no digits.
    Empty,
    /// The input is not a plain non-negative decimal number.
    Malformed,
    /// The input has significant digits below the smallest base unit.
    TooPrecise,
    /// The scaled amount does not fit in 128 bits.
    Overflow,
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty amount"),
            Self::Malformed => write!(f, "malformed decimal amount"),
            Self::TooPrecise => write!(f, "amount is finer than the token's base unit"),
            Self::Overflow => write!(f, "amount overflows base units"),
        }
    }
}

impl std::error::Error for AmountError {}

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// `10^decimals`, or `None` on overflow.
pub fn base_unit(decimals: u32) -> Option<u128> {
    10u128.checked_pow(decimals)
}

/// Scale a human-readable decimal string (e.g. `"2.5"`) into base units.
///
/// Trailing zeros past `decimals` are accepted (`"1.500"` with 1 decimal);
/// any non-zero digit past `decimals` is rejected rather than truncated.
///
/// # Errors
///
/// Returns [`AmountError`] for empty, signed, exponent-form, or otherwise
/// malformed input, for sub-unit precision, and for overflow.
pub fn scale_by_decimals(input: &str, decimals: u32) -> Result<u128, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match input.split_once('.') {
        Some((i, f)) => (i, f),
        None => (input, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Empty);
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AmountError::Malformed);
    }

    let frac_significant = frac_part.trim_end_matches('0');
    if frac_significant.len() > decimals as usize {
        return Err(AmountError::TooPrecise);
    }

    let unit = base_unit(decimals).ok_or(AmountError::Overflow)?;
    let int_value = parse_digits(int_part)?;
    let mut scaled = int_value.checked_mul(unit).ok_or(AmountError::Overflow)?;

    if !frac_significant.is_empty() {
        let pad = decimals - frac_significant.len() as u32;
        let frac_value = parse_digits(frac_significant)?
            .checked_mul(base_unit(pad).ok_or(AmountError::Overflow)?)
            .ok_or(AmountError::Overflow)?;
        scaled = scaled.checked_add(frac_value).ok_or(AmountError::Overflow)?;
    }

    Ok(scaled)
}

/// Scale an already-integral human amount (e.g. a `premine` of `1000`).
pub fn scale_integer(value: u128, decimals: u32) -> Result<u128, AmountError> {
    let unit = base_unit(decimals).ok_or(AmountError::Overflow)?;
    value.checked_mul(unit).ok_or(AmountError::Overflow)
}

/// Render base units as a human-readable decimal string.
///
/// Trailing fractional zeros are dropped: `250_000_000` at 8 decimals
/// renders as `"2.5"`.
pub fn unscale_by_decimals(amount: u128, decimals: u32) -> String {
    let Some(unit) = base_unit(decimals) else {
        return amount.to_string();
    };
    let int_part = amount / unit;
    let frac_part = amount % unit;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0width$}", width = decimals as usize);
    format!("{int_part}.{}", frac.trim_end_matches('0'))
}

fn parse_digits(digits: &str) -> Result<u128, AmountError> {
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u128>().map_err(|_| AmountError::Overflow)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
