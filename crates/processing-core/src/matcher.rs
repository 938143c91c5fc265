//! Temporal scene matching: reconcile per-anchor neighbours into a match.
//!
//! # Algorithm
//!
//! 1. **Anchor** three frames per scene: `start + ε`, the midpoint, `end - ε`.
//! 2. **Search** (done by the caller) returns the top-k candidates per anchor.
//! 3. **Triples**: every (start, mid, end) combination is kept only when all
//!    three agree on the episode, their timestamps strictly increase, and the
//!    implied speed ratio lies inside the accepted window.
//! 4. **Score** each triple by weighted similarity plus a midpoint bonus.
//! 5. **Select** the best triple as the primary match and the best triple of
//!    every other episode as ranked alternatives.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use scenesync_common::MatchingDefaults;
use scenesync_project_model::{AlternativeMatch, MatchCandidate, Scene, SceneMatch};
use scenesync_timebase::{fraction, Fraction, Seconds};

/// Configuration for the temporal matcher.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Distance of the edge anchors from the scene boundaries.
    pub anchor_offset: Seconds,

    /// Neighbours requested per anchor.
    pub top_k: usize,

    /// Lowest accepted implied speed ratio (inclusive).
    pub min_speed_ratio: Fraction,

    /// Highest accepted implied speed ratio (inclusive).
    pub max_speed_ratio: Fraction,

    pub start_weight: f64,
    pub mid_weight: f64,
    pub end_weight: f64,

    /// Bonus for a middle anchor sitting exactly on the source midpoint.
    pub midpoint_bonus: f64,

    /// Alternatives kept per scene.
    pub max_alternatives: usize,

    /// Whether the index may return horizontally flipped hits.
    pub allow_flip: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            anchor_offset: Seconds::from_millis(100),
            top_k: 5,
            min_speed_ratio: Fraction::new(7, 10),
            max_speed_ratio: Fraction::new(8, 5),
            start_weight: 1.0,
            mid_weight: 0.8,
            end_weight: 1.0,
            midpoint_bonus: 0.1,
            max_alternatives: 5,
            allow_flip: true,
        }
    }
}

impl From<&MatchingDefaults> for MatcherConfig {
    fn from(defaults: &MatchingDefaults) -> Self {
        let fallback = Self::default();
        Self {
            anchor_offset: Seconds::from_f64(defaults.anchor_offset_secs)
                .unwrap_or(fallback.anchor_offset),
            top_k: defaults.top_k.max(1),
            min_speed_ratio: fraction::from_f64(defaults.min_speed_ratio)
                .unwrap_or(fallback.min_speed_ratio),
            max_speed_ratio: fraction::from_f64(defaults.max_speed_ratio)
                .unwrap_or(fallback.max_speed_ratio),
            start_weight: defaults.start_weight,
            mid_weight: defaults.mid_weight,
            end_weight: defaults.end_weight,
            midpoint_bonus: defaults.midpoint_bonus,
            max_alternatives: defaults.max_alternatives,
            allow_flip: defaults.allow_flip,
        }
    }
}

/// Target-timeline positions of the three anchor frames of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPoints {
    pub start: Seconds,
    pub mid: Seconds,
    pub end: Seconds,
}

impl AnchorPoints {
    pub fn as_array(&self) -> [Seconds; 3] {
        [self.start, self.mid, self.end]
    }
}

/// Index results for the three anchors of one scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidates {
    #[serde(default)]
    pub start: Vec<MatchCandidate>,
    #[serde(default)]
    pub mid: Vec<MatchCandidate>,
    #[serde(default)]
    pub end: Vec<MatchCandidate>,
}

impl AnchorCandidates {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.mid.is_empty() && self.end.is_empty()
    }
}

/// An accepted (start, mid, end) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTriple {
    pub episode: String,
    pub start: Seconds,
    pub mid: Seconds,
    pub end: Seconds,
    pub score: f64,
    pub speed_ratio: Fraction,
    pub vote_count: u32,
}

/// Matches scenes against per-anchor candidate lists.
pub struct TemporalMatcher {
    config: MatcherConfig,
}

impl TemporalMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MatcherConfig::default())
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Anchor frames for `scene`. Scenes shorter than two offsets put the
    /// edge anchors on the midpoint.
    pub fn anchor_points(&self, scene: &Scene) -> AnchorPoints {
        let mid = scene.midpoint();
        let start = (scene.start_time + self.config.anchor_offset).min(mid);
        let end = (scene.end_time - self.config.anchor_offset).max(mid);
        AnchorPoints { start, mid, end }
    }

    /// All accepted triples, best first.
    ///
    /// Ordering is score descending, then vote count descending; equal keys
    /// keep enumeration order (start, then mid, then end candidate).
    pub fn score_triples(&self, scene_duration: Seconds, candidates: &AnchorCandidates) -> Vec<ScoredTriple> {
        let cfg = &self.config;
        let weight_sum = cfg.start_weight + cfg.mid_weight + cfg.end_weight;
        let mut triples = Vec::new();

        for s in &candidates.start {
            for m in candidates.mid.iter().filter(|m| m.episode == s.episode) {
                for e in candidates.end.iter().filter(|e| e.episode == s.episode) {
                    if !(s.timestamp < m.timestamp && m.timestamp < e.timestamp) {
                        continue;
                    }

                    let span = e.timestamp - s.timestamp;
                    let Some(speed_ratio) = scene_duration.ratio_to(span) else {
                        continue;
                    };
                    if speed_ratio < cfg.min_speed_ratio || speed_ratio > cfg.max_speed_ratio {
                        continue;
                    }

                    let weighted = cfg.start_weight * s.similarity
                        + cfg.mid_weight * m.similarity
                        + cfg.end_weight * e.similarity;
                    let base = if weight_sum > 0.0 { weighted / weight_sum } else { 0.0 };

                    triples.push(ScoredTriple {
                        episode: s.episode.clone(),
                        start: s.timestamp,
                        mid: m.timestamp,
                        end: e.timestamp,
                        score: base + self.midpoint_bonus(s.timestamp, m.timestamp, e.timestamp),
                        speed_ratio,
                        vote_count: 3,
                    });
                }
            }
        }

        triples.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.vote_count.cmp(&a.vote_count))
        });
        triples
    }

    /// Bonus shrinking linearly from the configured maximum (mid exactly on
    /// the source midpoint) to zero (mid half a span away).
    fn midpoint_bonus(&self, start: Seconds, mid: Seconds, end: Seconds) -> f64 {
        let half_span = (end - start) * Fraction::new(1, 2);
        let deviation = (mid - Seconds::midpoint(start, end)).abs();
        match deviation.ratio_to(half_span) {
            Some(relative) if relative < Fraction::from_integer(1) => {
                self.config.midpoint_bonus * fraction::to_f64(&(Fraction::from_integer(1) - relative))
            }
            _ => 0.0,
        }
    }

    /// Reconcile the candidates of one scene into a [`SceneMatch`].
    ///
    /// With no viable triple the result is a zero-confidence record with an
    /// empty episode.
    pub fn reconcile(&self, scene: &Scene, candidates: &AnchorCandidates) -> SceneMatch {
        let triples = self.score_triples(scene.duration(), candidates);

        let Some(best) = triples.first() else {
            tracing::debug!(
                scene = scene.index,
                start_hits = candidates.start.len(),
                mid_hits = candidates.mid.len(),
                end_hits = candidates.end.len(),
                "No consistent anchor triple"
            );
            return SceneMatch::unmatched(scene.index);
        };

        let (start_time, end_time) = self.excerpt_bounds(best);
        let alternatives = self.alternatives(&triples);

        tracing::debug!(
            scene = scene.index,
            episode = %best.episode,
            score = best.score,
            alternatives = alternatives.len(),
            "Scene matched"
        );

        SceneMatch {
            scene_index: scene.index,
            episode: best.episode.clone(),
            start_time,
            end_time,
            confidence: best.score.min(1.0),
            speed_ratio: best.speed_ratio,
            confirmed: false,
            alternatives,
            merged_from: None,
            error: None,
        }
    }

    /// The anchor span pushed back out by the anchor offset so the excerpt
    /// covers the whole scene. The start never goes below zero.
    fn excerpt_bounds(&self, triple: &ScoredTriple) -> (Seconds, Seconds) {
        let start = (triple.start - self.config.anchor_offset).max(Seconds::ZERO);
        let end = triple.end + self.config.anchor_offset;
        (start, end)
    }

    /// Best triple per episode, in ranking order.
    fn alternatives(&self, triples: &[ScoredTriple]) -> Vec<AlternativeMatch> {
        let mut seen = HashSet::new();
        triples
            .iter()
            .filter(|t| seen.insert(t.episode.as_str()))
            .take(self.config.max_alternatives)
            .map(|t| {
                let (start_time, end_time) = self.excerpt_bounds(t);
                AlternativeMatch {
                    episode: t.episode.clone(),
                    start_time,
                    end_time,
                    confidence: t.score.min(1.0),
                    speed_ratio: t.speed_ratio,
                    vote_count: t.vote_count,
                }
            })
            .collect()
    }
}
