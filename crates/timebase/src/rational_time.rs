//! Rate-tagged exact time values.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;
use crate::frame_rate::FrameRate;
use crate::seconds::Seconds;
use crate::TimeError;

/// An exact time value tagged with the frame rate it is measured against.
///
/// Values at different rates are not comparable (`partial_cmp` returns
/// `None`) and cannot be added; convert one side with
/// [`RationalTime::rescale`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    seconds: Seconds,
    rate: FrameRate,
}

impl RationalTime {
    pub fn from_seconds(seconds: Seconds, rate: FrameRate) -> Self {
        Self { seconds, rate }
    }

    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        Self {
            seconds: Seconds::new(rate.frames_to_seconds(frames)),
            rate,
        }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Exact seconds. Convert to `f64` only when leaving the system.
    pub fn to_seconds(&self) -> Fraction {
        self.seconds.as_fraction()
    }

    pub fn seconds(&self) -> Seconds {
        self.seconds
    }

    /// Nearest frame index at `rate` (half away from zero).
    pub fn to_frames(&self, rate: FrameRate) -> i64 {
        rate.seconds_to_frames(&self.seconds.as_fraction())
    }

    /// Nearest frame index at this value's own rate.
    pub fn frames(&self) -> i64 {
        self.to_frames(self.rate)
    }

    /// Snap to the nearest frame boundary of this value's rate.
    pub fn snap_to_frame(&self) -> Self {
        Self::from_frames(self.frames(), self.rate)
    }

    /// Explicit conversion to another rate, snapped to that rate's frames.
    pub fn rescale(&self, rate: FrameRate) -> Self {
        Self::from_frames(self.to_frames(rate), rate)
    }

    pub fn checked_add(&self, other: &RationalTime) -> Result<Self, TimeError> {
        self.require_same_rate(other)?;
        Ok(Self {
            seconds: self.seconds + other.seconds,
            rate: self.rate,
        })
    }

    pub fn checked_sub(&self, other: &RationalTime) -> Result<Self, TimeError> {
        self.require_same_rate(other)?;
        Ok(Self {
            seconds: self.seconds - other.seconds,
            rate: self.rate,
        })
    }

    fn require_same_rate(&self, other: &RationalTime) -> Result<(), TimeError> {
        if self.rate != other.rate {
            return Err(TimeError::RateMismatch {
                left: self.rate.to_string(),
                right: other.rate.to_string(),
            });
        }
        Ok(())
    }
}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.rate != other.rate {
            return None;
        }
        Some(self.seconds.cmp(&other.seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frames_round_trip_at_ntsc_rate() {
        let rate = FrameRate::FPS_23_976;
        let t = RationalTime::from_frames(48, rate);
        assert_eq!(t.to_seconds(), Fraction::new(2002, 1000));
        assert_eq!(t.frames(), 48);
    }

    #[test]
    fn test_from_seconds_to_frames() {
        let t = RationalTime::from_seconds(Seconds::parse("1.0").unwrap(), FrameRate::FPS_60);
        assert_eq!(t.to_frames(FrameRate::FPS_60), 60);
        // 1s at 23.976 is 23.976 frames, nearest is 24.
        assert_eq!(t.to_frames(FrameRate::FPS_23_976), 24);
    }

    #[test]
    fn test_mixed_rates_refuse_arithmetic_and_comparison() {
        let a = RationalTime::from_frames(10, FrameRate::FPS_24);
        let b = RationalTime::from_frames(10, FrameRate::FPS_25);
        assert!(a.checked_add(&b).is_err());
        assert!(a.checked_sub(&b).is_err());
        assert_eq!(a.partial_cmp(&b), None);

        let b24 = b.rescale(FrameRate::FPS_24);
        assert_eq!(b24.rate(), FrameRate::FPS_24);
        assert!(a.checked_add(&b24).is_ok());
    }

    #[test]
    fn test_same_rate_arithmetic() {
        let rate = FrameRate::FPS_29_97;
        let a = RationalTime::from_frames(30, rate);
        let b = RationalTime::from_frames(15, rate);
        assert_eq!(a.checked_sub(&b).unwrap().frames(), 15);
        assert_eq!(a.checked_add(&b).unwrap().frames(), 45);
        assert!(b < a);
    }

    #[test]
    fn test_snap_to_frame() {
        let t = RationalTime::from_seconds(Seconds::parse("1.01").unwrap(), FrameRate::FPS_24);
        let snapped = t.snap_to_frame();
        assert_eq!(snapped.frames(), 24);
        assert_eq!(snapped.to_seconds(), Fraction::from_integer(1));
    }

    #[test]
    fn test_deserialize_checks_rate() {
        let t = RationalTime::from_frames(7, FrameRate::FPS_23_976);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(serde_json::from_str::<RationalTime>(&json).unwrap(), t);

        let broken = r#"{"seconds": "1/2", "rate": {"numerator": 24, "denominator": 0}}"#;
        assert!(serde_json::from_str::<RationalTime>(broken).is_err());
    }

    proptest! {
        #[test]
        fn prop_independent_computations_agree(micros in 0i64..36_000_000_000) {
            let text = format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000);
            let a = RationalTime::from_seconds(Seconds::parse(&text).unwrap(), FrameRate::FPS_23_976);
            let b = RationalTime::from_seconds(
                Seconds::from_f64(micros as f64 / 1_000_000.0).unwrap(),
                FrameRate::FPS_23_976,
            );
            prop_assert_eq!(a, b);
            prop_assert_eq!(a.frames(), b.frames());
        }
    }
}
