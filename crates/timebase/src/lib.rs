//! SceneSync Timebase: the RationalTime engine.
//!
//! Every duration, timestamp, and playback speed in SceneSync is an exact
//! fraction. Floating-point values are accepted only at the edges:
//!
//! - **Ingestion:** an `f64` is read through its shortest round-trip decimal
//!   text and clamped to a bounded denominator ([`MAX_DENOMINATOR`]).
//! - **Presentation:** [`to_f64`] converts back for display. JSON keeps the
//!   exact `"num/den"` text, so stored values round-trip unchanged.
//!
//! Frame rates are exact ratios (`24000/1001`, never `23.976`), so two
//! timings computed independently for the same clip agree bit-for-bit.

pub mod fraction;
pub mod frame_rate;
pub mod rational_time;
pub mod seconds;

pub use fraction::*;
pub use frame_rate::FrameRate;
pub use rational_time::RationalTime;
pub use seconds::Seconds;

/// Errors produced while ingesting or combining time values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("value is not a finite number: {value}")]
    NonFinite { value: String },

    #[error("cannot parse '{input}' as a decimal or ratio")]
    Parse { input: String },

    #[error("value '{input}' is out of range")]
    OutOfRange { input: String },

    #[error("invalid frame rate: {reason}")]
    InvalidFrameRate { reason: String },

    #[error("frame rate mismatch: {left} vs {right}")]
    RateMismatch { left: String, right: String },
}
