//! Exact fraction helpers.
//!
//! [`Fraction`] is a reduced `i128` ratio. Values enter through
//! [`parse_decimal`] or [`from_f64`], both of which clamp the denominator to
//! [`MAX_DENOMINATOR`] using the best rational approximation. Arithmetic on
//! fractions that are already exact is never re-clamped, and
//! [`parse_ratio`] reads stored values back without approximation.

use num_rational::Ratio;
use num_traits::Signed;

use crate::TimeError;

/// Exact rational number used for all time and speed math.
pub type Fraction = Ratio<i128>;

/// Largest denominator kept when ingesting decimal or float input.
pub const MAX_DENOMINATOR: i128 = 1_000_000;

/// Digits past the decimal point read from an input before approximation.
const MAX_FRACTION_DIGITS: usize = 24;

/// Digits allowed before the decimal point.
const MAX_INTEGER_DIGITS: usize = 12;

/// Build a fraction from an integer numerator and denominator.
///
/// Returns `None` when the denominator is zero.
pub fn ratio(numerator: i128, denominator: i128) -> Option<Fraction> {
    if denominator == 0 {
        None
    } else {
        Some(Fraction::new(numerator, denominator))
    }
}

/// Parse a plain decimal string (`"3"`, `"-0.5"`, `"2.333333"`) exactly, then
/// clamp its denominator to [`MAX_DENOMINATOR`].
pub fn parse_decimal(input: &str) -> Result<Fraction, TimeError> {
    let parse_err = || TimeError::Parse {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        Some(_) => (false, trimmed),
        None => return Err(parse_err()),
    };

    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (body, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(parse_err());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(parse_err());
    }

    let int_digits = int_part.trim_start_matches('0');
    if int_digits.len() > MAX_INTEGER_DIGITS {
        return Err(TimeError::OutOfRange {
            input: input.to_string(),
        });
    }

    let frac_part = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
    let scale = 10i128.pow(frac_part.len() as u32);

    let whole: i128 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().map_err(|_| parse_err())?
    };
    let frac: i128 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().map_err(|_| parse_err())?
    };

    let magnitude = Fraction::new(whole * scale + frac, scale);
    let value = if negative { -magnitude } else { magnitude };
    Ok(limit_denominator(&value, MAX_DENOMINATOR))
}

/// Convert a float to a bounded fraction through its shortest round-trip
/// decimal representation.
///
/// `0.1` becomes exactly `1/10`, not the binary expansion of the double.
pub fn from_f64(value: f64) -> Result<Fraction, TimeError> {
    if !value.is_finite() {
        return Err(TimeError::NonFinite {
            value: value.to_string(),
        });
    }
    // `Display` for f64 prints the shortest text that round-trips and never
    // uses exponent notation.
    parse_decimal(&format!("{value}"))
}

/// Parse an exact `"numerator/denominator"` ratio. The denominator is
/// kept as written, never clamped.
pub fn parse_ratio(input: &str) -> Result<Fraction, TimeError> {
    let parse_err = || TimeError::Parse {
        input: input.to_string(),
    };
    let (num, den) = input.trim().split_once('/').ok_or_else(parse_err)?;
    let num: i128 = num.trim().parse().map_err(|_| parse_err())?;
    let den: i128 = den.trim().parse().map_err(|_| parse_err())?;
    ratio(num, den).ok_or_else(|| TimeError::OutOfRange {
        input: input.to_string(),
    })
}

/// Lossless text form read back by [`parse_ratio`]: `"7/3"`.
pub fn to_ratio_string(value: &Fraction) -> String {
    format!("{}/{}", value.numer(), value.denom())
}

/// Convert a fraction to the nearest float. Presentation only.
pub fn to_f64(value: &Fraction) -> f64 {
    *value.numer() as f64 / *value.denom() as f64
}

/// Best rational approximation of `value` with denominator at most
/// `max_denominator`.
pub fn limit_denominator(value: &Fraction, max_denominator: i128) -> Fraction {
    let max_denominator = max_denominator.max(1);
    if *value.denom() <= max_denominator {
        return *value;
    }

    let negative = value.is_negative();
    let target = value.abs();

    let (mut p0, mut q0, mut p1, mut q1) = (0i128, 1i128, 1i128, 0i128);
    let (mut n, mut d) = (*target.numer(), *target.denom());
    loop {
        let a = n / d;
        let q2 = q0 + a * q1;
        if q2 > max_denominator {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q2);
        (n, d) = (d, n - a * d);
    }

    let k = (max_denominator - q0) / q1;
    let lower = Fraction::new(p0 + k * p1, q0 + k * q1);
    let upper = Fraction::new(p1, q1);

    let chosen = if (upper - target).abs() <= (lower - target).abs() {
        upper
    } else {
        lower
    };

    if negative {
        -chosen
    } else {
        chosen
    }
}

/// Round to a fixed number of decimal places, returned as a scaled integer.
///
/// `round_to_decimals(7/3, 3) == 2333`. Used for dedup keys.
pub fn round_to_decimals(value: &Fraction, decimals: u32) -> i128 {
    let scale = Fraction::from_integer(10i128.pow(decimals));
    (value * scale).round().to_integer()
}

/// Absolute distance between two fractions.
pub fn distance(a: &Fraction, b: &Fraction) -> Fraction {
    (a - b).abs()
}

/// Clamp `value` into `[low, high]`.
pub fn clamp(value: Fraction, low: Fraction, high: Fraction) -> Fraction {
    if value < low {
        low
    } else if value > high {
        high
    } else {
        value
    }
}
