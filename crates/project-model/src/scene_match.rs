//! Source matches for target scenes.

use serde::{Deserialize, Serialize};

use scenesync_timebase::seconds::fraction_serde;
use scenesync_timebase::{Fraction, Seconds};

use crate::project::ProjectError;

/// One ranked hit returned by the similarity index for a single anchor frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Source episode identifier.
    pub episode: String,

    /// Position of the matching frame inside the episode.
    pub timestamp: Seconds,

    /// Similarity score, higher is better.
    pub similarity: f64,

    /// Series the episode belongs to, when the index knows it.
    #[serde(default)]
    pub series: Option<String>,
}

/// A ranked fallback match kept next to the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMatch {
    pub episode: String,

    pub start_time: Seconds,

    pub end_time: Seconds,

    pub confidence: f64,

    #[serde(with = "fraction_serde")]
    pub speed_ratio: Fraction,

    /// Number of anchors that agreed on this placement.
    pub vote_count: u32,
}

/// Where a target scene was found in the source material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMatch {
    /// Index of the owning scene. Rewritten by `SceneTimeline::reindex`.
    pub scene_index: usize,

    /// Source episode. Empty when nothing matched.
    pub episode: String,

    /// Start of the source excerpt.
    pub start_time: Seconds,

    /// End of the source excerpt.
    pub end_time: Seconds,

    /// Match confidence in `[0.0, 1.0]`; `0.0` means unmatched.
    pub confidence: f64,

    /// Target duration over source span implied by the matched anchors.
    #[serde(with = "fraction_serde")]
    pub speed_ratio: Fraction,

    /// Whether a user accepted this match.
    #[serde(default)]
    pub confirmed: bool,

    /// Up to five ranked alternatives, one per episode.
    #[serde(default)]
    pub alternatives: Vec<AlternativeMatch>,

    /// Original scene indices this scene was merged from. Only used by undo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<Vec<usize>>,

    /// Why matching failed for this scene, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SceneMatch {
    /// A zero-confidence record for a scene that produced no match.
    pub fn unmatched(scene_index: usize) -> Self {
        Self {
            scene_index,
            episode: String::new(),
            start_time: Seconds::ZERO,
            end_time: Seconds::ZERO,
            confidence: 0.0,
            speed_ratio: Fraction::from_integer(0),
            confirmed: false,
            alternatives: vec![],
            merged_from: None,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether this record points at a usable source excerpt.
    pub fn is_matched(&self) -> bool {
        !self.episode.is_empty() && self.end_time > self.start_time
    }

    pub fn source_duration(&self) -> Seconds {
        self.end_time - self.start_time
    }

    pub fn is_merged(&self) -> bool {
        self.merged_from
            .as_ref()
            .map(|indices| !indices.is_empty())
            .unwrap_or(false)
    }

    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Promote alternative `position` to the primary match and confirm it.
    pub fn select_alternative(&mut self, position: usize) -> Result<(), ProjectError> {
        let alternative = self
            .alternatives
            .get(position)
            .cloned()
            .ok_or_else(|| ProjectError::ValidationError {
                message: format!(
                    "scene {} has no alternative #{position} ({} available)",
                    self.scene_index,
                    self.alternatives.len()
                ),
            })?;

        self.episode = alternative.episode;
        self.start_time = alternative.start_time;
        self.end_time = alternative.end_time;
        self.confidence = alternative.confidence;
        self.speed_ratio = alternative.speed_ratio;
        self.confirmed = true;
        self.error = None;
        Ok(())
    }
}
