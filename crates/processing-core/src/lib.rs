//! SceneSync Processing Core
//!
//! The decision-making half of SceneSync:
//! - **Matcher:** reconcile per-anchor index hits into a scene match
//! - **Continuity:** find scenes that continue in the same episode, merge
//!   them into one unit and undo that merge
//! - **Gaps:** exact playback speed, timing shortfalls, and ranked
//!   excerpt extensions that bring playback back toward real time
//!
//! This crate is pure computation: no I/O, no external processes.
//! All inputs are data; all outputs are data.

pub mod continuity;
pub mod gaps;
pub mod matcher;

pub use continuity::{
    build_merge_chains, detect_continuous_pairs, merge, undo_merge, ContinuityConfig,
    ContinuityPair, MergeError, MergeOutcome, UndoOutcome,
};
pub use gaps::{
    calculate_gaps, compute_raw_speed, compute_speed, generate_candidates, CandidateStrategy,
    GapCandidate, GapConfig, GapContext, GapError, GapInfo, GapResolution, GapState,
};
pub use matcher::{AnchorCandidates, AnchorPoints, MatcherConfig, ScoredTriple, TemporalMatcher};
