//! Exact wall-clock durations and timestamps.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::fraction::{from_f64, parse_decimal, to_f64, Fraction};
use crate::TimeError;

/// A timestamp or duration in seconds, held as an exact fraction.
///
/// Serialized losslessly through [`fraction_serde`]; numbers and decimal
/// strings are accepted on input and clamped to the bounded denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Seconds(Fraction);

impl Seconds {
    pub const ZERO: Seconds = Seconds(Fraction::new_raw(0, 1));

    /// Wrap an exact fraction of seconds.
    pub fn new(value: Fraction) -> Self {
        Self(value)
    }

    /// Exact `numerator / denominator` seconds. `None` for a zero denominator.
    pub fn from_ratio(numerator: i128, denominator: i128) -> Option<Self> {
        crate::fraction::ratio(numerator, denominator).map(Self)
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(Fraction::new(millis as i128, 1000))
    }

    pub fn from_integer(secs: i64) -> Self {
        Self(Fraction::from_integer(secs as i128))
    }

    /// Ingest a float through its shortest decimal text.
    pub fn from_f64(secs: f64) -> Result<Self, TimeError> {
        from_f64(secs).map(Self)
    }

    /// Parse a decimal string such as `"2.333333"`.
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        parse_decimal(input).map(Self)
    }

    pub fn as_fraction(&self) -> Fraction {
        self.0
    }

    /// Float view for display and JSON. Never feed it back into the math.
    pub fn to_f64(&self) -> f64 {
        to_f64(&self.0)
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Midpoint between two instants.
    pub fn midpoint(a: Seconds, b: Seconds) -> Seconds {
        Self((a.0 + b.0) / Fraction::from_integer(2))
    }

    /// `self / other` as an exact ratio, `None` when `other` is zero.
    pub fn ratio_to(&self, other: Seconds) -> Option<Fraction> {
        if other.0.is_zero() {
            None
        } else {
            Some(self.0 / other.0)
        }
    }

    /// Whether two instants lie within `tolerance` of each other.
    pub fn approx_eq(&self, other: Seconds, tolerance: Seconds) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }
}

impl From<Fraction> for Seconds {
    fn from(value: Fraction) -> Self {
        Self(value)
    }
}

impl Add for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 + rhs.0)
    }
}

impl Sub for Seconds {
    type Output = Seconds;

    fn sub(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 - rhs.0)
    }
}

impl Neg for Seconds {
    type Output = Seconds;

    fn neg(self) -> Seconds {
        Seconds(-self.0)
    }
}

impl Mul<Fraction> for Seconds {
    type Output = Seconds;

    fn mul(self, rhs: Fraction) -> Seconds {
        Seconds(self.0 * rhs)
    }
}

/// Panics on a zero divisor, like integer division. Speeds are validated
/// positive before they reach here.
impl Div<Fraction> for Seconds {
    type Output = Seconds;

    fn div(self, rhs: Fraction) -> Seconds {
        Seconds(self.0 / rhs)
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_f64())
    }
}

impl Serialize for Seconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fraction_serde::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        fraction_serde::deserialize(deserializer).map(Self)
    }
}

/// Serde adapter for speed ratios and other bare fractions.
///
/// Whole values are written as JSON integers and everything else as an
/// exact `"num/den"` string. Floats and decimal strings are still read,
/// through the bounded-denominator ingestion path.
pub mod fraction_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::fraction::{from_f64, parse_decimal, parse_ratio, to_ratio_string, Fraction};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FractionRepr {
        Integer(i64),
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Fraction, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(*value.numer()) {
            Ok(whole) if value.is_integer() => serializer.serialize_i64(whole),
            _ => serializer.serialize_str(&to_ratio_string(value)),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fraction, D::Error> {
        let parsed = match FractionRepr::deserialize(deserializer)? {
            FractionRepr::Integer(whole) => Ok(Fraction::from_integer(whole as i128)),
            FractionRepr::Number(value) => from_f64(value),
            FractionRepr::Text(text) if text.contains('/') => parse_ratio(&text),
            FractionRepr::Text(text) => parse_decimal(&text),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}
