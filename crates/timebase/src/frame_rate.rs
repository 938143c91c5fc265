//! Exact frame rates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fraction::{to_f64, Fraction};
use crate::TimeError;

/// Broadcast rates that measured values snap to, with their tolerance.
const BROADCAST_RATES: [(f64, FrameRate); 3] = [
    (23.976, FrameRate::FPS_23_976),
    (29.97, FrameRate::FPS_29_97),
    (59.94, FrameRate::FPS_59_94),
];

const BROADCAST_TOLERANCE: f64 = 0.01;

/// A frame rate held as an exact `numerator / denominator` ratio.
///
/// Deserialization goes through [`FrameRate::new`], so stored rates are
/// validated and reduced like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StoredFrameRate")]
pub struct FrameRate {
    numerator: u32,
    denominator: u32,
    drop_frame: bool,
}

#[derive(Deserialize)]
struct StoredFrameRate {
    numerator: u32,
    denominator: u32,
}

impl TryFrom<StoredFrameRate> for FrameRate {
    type Error = TimeError;

    fn try_from(stored: StoredFrameRate) -> Result<Self, Self::Error> {
        FrameRate::new(stored.numerator, stored.denominator)
    }
}

impl FrameRate {
    pub const FPS_23_976: FrameRate = FrameRate::ntsc(24_000);
    pub const FPS_24: FrameRate = FrameRate::integer(24);
    pub const FPS_25: FrameRate = FrameRate::integer(25);
    pub const FPS_29_97: FrameRate = FrameRate::ntsc(30_000);
    pub const FPS_30: FrameRate = FrameRate::integer(30);
    pub const FPS_50: FrameRate = FrameRate::integer(50);
    pub const FPS_59_94: FrameRate = FrameRate::ntsc(60_000);
    pub const FPS_60: FrameRate = FrameRate::integer(60);

    const fn ntsc(numerator: u32) -> Self {
        Self {
            numerator,
            denominator: 1001,
            drop_frame: true,
        }
    }

    const fn integer(fps: u32) -> Self {
        Self {
            numerator: fps,
            denominator: 1,
            drop_frame: false,
        }
    }

    /// Build a rate from an exact ratio. A `/1001` denominator marks a
    /// drop-frame rate.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, TimeError> {
        if numerator == 0 || denominator == 0 {
            return Err(TimeError::InvalidFrameRate {
                reason: format!("{numerator}/{denominator}"),
            });
        }
        let reduced = Fraction::new(numerator as i128, denominator as i128);
        Ok(Self {
            numerator: *reduced.numer() as u32,
            denominator: *reduced.denom() as u32,
            drop_frame: *reduced.denom() == 1001,
        })
    }

    /// Map a measured rate onto a canonical one: within 0.01 of 23.976,
    /// 29.97 or 59.94 snaps to the exact `/1001` ratio; anything else is
    /// rounded to an integer rate.
    pub fn from_measured(fps: f64) -> Result<Self, TimeError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TimeError::InvalidFrameRate {
                reason: fps.to_string(),
            });
        }

        for (nominal, rate) in BROADCAST_RATES {
            if (fps - nominal).abs() < BROADCAST_TOLERANCE {
                return Ok(rate);
            }
        }

        let rounded = fps.round().max(1.0);
        Ok(Self::integer(rounded as u32))
    }

    /// Parse a probe-style rate (`"24000/1001"`, `"25/1"`, `"29.97"`) and
    /// canonicalize it with [`FrameRate::from_measured`].
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        let parse_err = || TimeError::Parse {
            input: input.to_string(),
        };
        let trimmed = input.trim();

        let measured = match trimmed.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.trim().parse().map_err(|_| parse_err())?;
                let den: f64 = den.trim().parse().map_err(|_| parse_err())?;
                if den == 0.0 {
                    return Err(TimeError::InvalidFrameRate {
                        reason: trimmed.to_string(),
                    });
                }
                num / den
            }
            None => trimmed.parse().map_err(|_| parse_err())?,
        };

        Self::from_measured(measured)
    }

    /// Frames per second as an exact fraction.
    pub fn fps(&self) -> Fraction {
        Fraction::new(self.numerator as i128, self.denominator as i128)
    }

    /// Duration of a single frame.
    pub fn frame_duration(&self) -> Fraction {
        Fraction::new(self.denominator as i128, self.numerator as i128)
    }

    /// Exact duration of `count` frames.
    pub fn frames_to_seconds(&self, count: i64) -> Fraction {
        self.frame_duration() * Fraction::from_integer(count as i128)
    }

    /// Frame index nearest to `seconds` (half away from zero).
    pub fn seconds_to_frames(&self, seconds: &Fraction) -> i64 {
        (seconds * self.fps()).round().to_integer() as i64
    }

    pub fn is_drop_frame(&self) -> bool {
        self.drop_frame
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn as_f64(&self) -> f64 {
        to_f64(&self.fps())
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}fps", self.numerator)
        } else {
            write!(f, "{:.3}fps", self.as_f64())
        }
    }
}
