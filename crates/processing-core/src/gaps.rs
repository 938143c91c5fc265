//! Playback speed, timing gaps and gap-filling candidates.
//!
//! A matched excerpt of `source` seconds must fill `target` seconds of the
//! output timeline, so it plays at `source / target`. Below the speed floor
//! the footage would crawl; instead the excerpt is extended inside the source
//! video, preferably without crossing a shot boundary.
//!
//! # Candidate strategies
//!
//! 1. **Shot fill**: grow toward 1.0x without leaving the current shot.
//! 2. **Extend end** to the next cut (minus a safety margin).
//! 3. **Extend start** to the previous cut (plus a safety margin).
//! 4. **Extend both** to the surrounding cuts.
//! 5. **Fallback** when none of the above is valid: the exact extension to
//!    1.0x, backward, forward or split evenly, clamped to the video.
//!
//! Every candidate must land inside the speed window; survivors are ranked
//! by distance from 1.0x.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use scenesync_common::GapDefaults;
use scenesync_project_model::{SceneMatch, SceneTiming, SceneTimeline};
use scenesync_timebase::seconds::fraction_serde;
use scenesync_timebase::{fraction, Fraction, FrameRate, RationalTime, Seconds};

/// Configuration for gap detection and candidate generation.
#[derive(Debug, Clone)]
pub struct GapConfig {
    /// Lowest acceptable playback speed; below it a gap is reported.
    pub speed_floor: Fraction,

    /// Highest acceptable playback speed.
    pub speed_ceiling: Fraction,

    /// Source frames kept clear of a cut when extending to it.
    pub safety_frames: u32,

    /// Output sequence rate target durations are snapped to.
    pub sequence_rate: Option<FrameRate>,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            speed_floor: Fraction::new(3, 4),
            speed_ceiling: Fraction::new(8, 5),
            safety_frames: 3,
            sequence_rate: None,
        }
    }
}

impl From<&GapDefaults> for GapConfig {
    fn from(defaults: &GapDefaults) -> Self {
        let fallback = Self::default();
        Self {
            speed_floor: fraction::from_f64(defaults.speed_floor).unwrap_or(fallback.speed_floor),
            speed_ceiling: fraction::from_f64(defaults.speed_ceiling)
                .unwrap_or(fallback.speed_ceiling),
            safety_frames: defaults.safety_frames,
            sequence_rate: defaults
                .sequence_fps
                .and_then(|fps| FrameRate::from_measured(fps).ok()),
        }
    }
}

impl GapConfig {
    pub fn accepts(&self, speed: &Fraction) -> bool {
        *speed >= self.speed_floor && *speed <= self.speed_ceiling
    }

    /// Snap a target duration to the sequence rate, if one is configured.
    pub fn snap_target(&self, target: Seconds) -> Seconds {
        match self.sequence_rate {
            Some(rate) => RationalTime::from_seconds(target, rate).snap_to_frame().seconds(),
            None => target,
        }
    }
}

/// Playback speed of `[start, end]` stretched over `target_duration`,
/// unclamped. `None` for a non-positive target or a reversed excerpt.
pub fn compute_raw_speed(start: Seconds, end: Seconds, target_duration: Seconds) -> Option<Fraction> {
    if !target_duration.is_positive() || end < start {
        return None;
    }
    (end - start).ratio_to(target_duration)
}

/// [`compute_raw_speed`] clamped to the configured speed window.
pub fn compute_speed(
    start: Seconds,
    end: Seconds,
    target_duration: Seconds,
    config: &GapConfig,
) -> Option<Fraction> {
    compute_raw_speed(start, end, target_duration)
        .map(|raw| fraction::clamp(raw, config.speed_floor, config.speed_ceiling))
}

/// Where a scene stands in gap resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapState {
    NoGap,
    GapDetected,
    CandidatesGenerated,
    Resolved,
    Skipped,
}

impl fmt::Display for GapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GapState::NoGap => "no_gap",
            GapState::GapDetected => "gap_detected",
            GapState::CandidatesGenerated => "candidates_generated",
            GapState::Resolved => "resolved",
            GapState::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Timing snapshot of one matched scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapInfo {
    pub scene_index: usize,
    pub episode: String,
    pub start_time: Seconds,
    pub end_time: Seconds,
    pub source_duration: Seconds,
    pub target_duration: Seconds,

    /// Required speed, unclamped.
    #[serde(with = "fraction_serde")]
    pub current_speed: Fraction,

    /// Ideal speed.
    #[serde(with = "fraction_serde")]
    pub target_speed: Fraction,

    /// Speed after clamping to the window.
    #[serde(with = "fraction_serde")]
    pub effective_speed: Fraction,

    /// `target - source / effective`. Positive is footage missing at the
    /// floor, negative is overrun at the ceiling, zero inside the window.
    pub gap_duration: Seconds,

    pub state: GapState,
}

impl GapInfo {
    /// Snapshot for one matched excerpt.
    pub fn compute(
        scene_index: usize,
        scene_match: &SceneMatch,
        target_duration: Seconds,
        config: &GapConfig,
    ) -> Option<Self> {
        let target_duration = config.snap_target(target_duration);
        let current_speed =
            compute_raw_speed(scene_match.start_time, scene_match.end_time, target_duration)?;
        let effective_speed = fraction::clamp(current_speed, config.speed_floor, config.speed_ceiling);
        let source_duration = scene_match.source_duration();
        let gap_duration = if *effective_speed.numer() > 0 {
            target_duration - source_duration / effective_speed
        } else {
            target_duration
        };
        let state = if current_speed < config.speed_floor {
            GapState::GapDetected
        } else {
            GapState::NoGap
        };

        Some(Self {
            scene_index,
            episode: scene_match.episode.clone(),
            start_time: scene_match.start_time,
            end_time: scene_match.end_time,
            source_duration,
            target_duration,
            current_speed,
            target_speed: Fraction::from_integer(1),
            effective_speed,
            gap_duration,
            state,
        })
    }

    pub fn has_gap(&self) -> bool {
        self.state == GapState::GapDetected
    }
}

/// Gap snapshots for every matched scene of `timeline`.
///
/// A scene without an explicit timing must fill its own duration.
pub fn calculate_gaps(timeline: &SceneTimeline, timings: &[SceneTiming], config: &GapConfig) -> Vec<GapInfo> {
    timeline
        .entries()
        .iter()
        .filter_map(|entry| {
            let scene_match = entry.scene_match.as_ref().filter(|m| m.is_matched())?;
            let target = timings
                .iter()
                .find(|t| t.scene_index == entry.scene.index)
                .map(|t| t.target_duration)
                .unwrap_or_else(|| entry.scene.duration());

            let info = GapInfo::compute(entry.scene.index, scene_match, target, config);
            if info.is_none() {
                tracing::warn!(scene = entry.scene.index, target = %target, "Skipping scene with non-positive target duration");
            }
            info
        })
        .collect()
}

/// How a candidate was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStrategy {
    ShotFill,
    ExtendEnd,
    ExtendStart,
    ExtendBoth,
    FallbackBackward,
    FallbackForward,
    FallbackSplit,
}

/// A proposed replacement excerpt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapCandidate {
    pub strategy: CandidateStrategy,
    pub start_time: Seconds,
    pub end_time: Seconds,

    /// Playback speed the excerpt yields over the target duration.
    #[serde(with = "fraction_serde")]
    pub speed: Fraction,

    pub rationale: String,
}

impl GapCandidate {
    pub fn distance_from_realtime(&self) -> Fraction {
        fraction::distance(&self.speed, &Fraction::from_integer(1))
    }
}

/// Everything candidate generation needs to know about one gap.
#[derive(Debug, Clone)]
pub struct GapContext<'a> {
    pub start_time: Seconds,
    pub end_time: Seconds,
    pub target_duration: Seconds,

    /// Shot boundaries of the source video, sorted, including 0 and the
    /// video duration.
    pub cuts: &'a [Seconds],

    pub source_rate: FrameRate,
    pub video_duration: Seconds,
}

impl<'a> GapContext<'a> {
    pub fn from_info(
        info: &GapInfo,
        cuts: &'a [Seconds],
        source_rate: FrameRate,
        video_duration: Seconds,
    ) -> Self {
        Self {
            start_time: info.start_time,
            end_time: info.end_time,
            target_duration: info.target_duration,
            cuts,
            source_rate,
            video_duration,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GapError {
    #[error("target duration must be positive, got {0}")]
    InvalidTarget(Seconds),

    #[error("excerpt end {end} is not after its start {start}")]
    InvalidExcerpt { start: Seconds, end: Seconds },

    #[error("cannot {action} a gap in state {from}")]
    InvalidTransition { from: GapState, action: &'static str },

    #[error("candidate #{position} does not exist ({available} available)")]
    CandidateNotFound { position: usize, available: usize },
}

/// Ranked replacement excerpts for one gap.
pub fn generate_candidates(context: &GapContext<'_>, config: &GapConfig) -> Result<Vec<GapCandidate>, GapError> {
    let GapContext {
        start_time: start,
        end_time: end,
        target_duration: target,
        ..
    } = *context;

    if !target.is_positive() {
        return Err(GapError::InvalidTarget(target));
    }
    if end <= start {
        return Err(GapError::InvalidExcerpt { start, end });
    }

    let margin = Seconds::new(context.source_rate.frames_to_seconds(config.safety_frames as i64));
    // Cuts closer to the excerpt than the margin pin that side in place.
    let prev_bound = context
        .cuts
        .iter()
        .rev()
        .find(|&&cut| cut <= start)
        .map(|&cut| cut + margin)
        .filter(|&bound| bound <= start);
    let next_bound = context
        .cuts
        .iter()
        .find(|&&cut| cut >= end)
        .map(|&cut| cut - margin)
        .filter(|&bound| bound >= end);

    let mut proposals: Vec<(CandidateStrategy, Seconds, Seconds)> = Vec::new();

    // Shot fill: extend the end first, then the start, stopping at 1.0x.
    let shot_end = next_bound.unwrap_or(end);
    let shot_start = prev_bound.unwrap_or(start);
    let fill_end = (start + target).min(shot_end).max(end);
    let missing = target - (fill_end - start);
    let fill_start = if missing.is_positive() {
        (start - missing).max(shot_start)
    } else {
        start
    };
    if (fill_start, fill_end) != (start, end) {
        proposals.push((CandidateStrategy::ShotFill, fill_start, fill_end));
    }

    if let Some(next) = next_bound {
        proposals.push((CandidateStrategy::ExtendEnd, start, next));
    }
    if let Some(prev) = prev_bound {
        proposals.push((CandidateStrategy::ExtendStart, prev, end));
    }
    if let (Some(prev), Some(next)) = (prev_bound, next_bound) {
        proposals.push((CandidateStrategy::ExtendBoth, prev, next));
    }

    let mut seen = HashSet::new();
    let mut candidates = validate(context, config, proposals, &mut seen);

    if candidates.is_empty() {
        let needed = target - (end - start);
        let half = needed * Fraction::new(1, 2);
        let fallback = vec![
            (CandidateStrategy::FallbackBackward, start - needed, end),
            (CandidateStrategy::FallbackForward, start, end + needed),
            (CandidateStrategy::FallbackSplit, start - half, end + half),
        ];
        candidates = validate(context, config, fallback, &mut seen);
    }

    candidates.sort_by_key(GapCandidate::distance_from_realtime);

    tracing::debug!(
        candidates = candidates.len(),
        prev_cut = ?prev_bound.map(|s| s.to_f64()),
        next_cut = ?next_bound.map(|s| s.to_f64()),
        "Generated gap candidates"
    );
    Ok(candidates)
}

/// Clamp to the video, check the speed window and drop duplicates
/// (by millisecond-rounded bounds).
fn validate(
    context: &GapContext<'_>,
    config: &GapConfig,
    proposals: Vec<(CandidateStrategy, Seconds, Seconds)>,
    seen: &mut HashSet<(i128, i128)>,
) -> Vec<GapCandidate> {
    let upper = if context.video_duration.is_positive() {
        Some(context.video_duration)
    } else {
        None
    };

    proposals
        .into_iter()
        .filter_map(|(strategy, start, end)| {
            let start = start.max(Seconds::ZERO);
            let end = upper.map_or(end, |limit| end.min(limit));
            if end <= start {
                return None;
            }

            let speed = compute_raw_speed(start, end, context.target_duration)?;
            if !config.accepts(&speed) {
                return None;
            }

            let key = (
                fraction::round_to_decimals(&start.as_fraction(), 3),
                fraction::round_to_decimals(&end.as_fraction(), 3),
            );
            if !seen.insert(key) {
                return None;
            }

            Some(GapCandidate {
                strategy,
                start_time: start,
                end_time: end,
                speed,
                rationale: rationale(strategy, start, end, &speed),
            })
        })
        .collect()
}

fn rationale(strategy: CandidateStrategy, start: Seconds, end: Seconds, speed: &Fraction) -> String {
    let what = match strategy {
        CandidateStrategy::ShotFill => "Extend within the current shot",
        CandidateStrategy::ExtendEnd => "Extend the end to the next cut",
        CandidateStrategy::ExtendStart => "Extend the start to the previous cut",
        CandidateStrategy::ExtendBoth => "Extend to both surrounding cuts",
        CandidateStrategy::FallbackBackward => "Extend backward to real time",
        CandidateStrategy::FallbackForward => "Extend forward to real time",
        CandidateStrategy::FallbackSplit => "Extend both ways to real time",
    };
    format!(
        "{what}: {} - {} at {:.3}x",
        start,
        end,
        fraction::to_f64(speed)
    )
}

/// Per-scene gap state machine.
///
/// `NoGap` is terminal. `GapDetected` moves to `CandidatesGenerated` or
/// `Skipped`; `CandidatesGenerated` moves to `Resolved` or `Skipped`.
#[derive(Debug, Clone)]
pub struct GapResolution {
    info: GapInfo,
    state: GapState,
    candidates: Vec<GapCandidate>,
    chosen: Option<GapCandidate>,
}

impl GapResolution {
    pub fn new(info: GapInfo) -> Self {
        let state = info.state;
        Self {
            info,
            state,
            candidates: vec![],
            chosen: None,
        }
    }

    pub fn state(&self) -> GapState {
        self.state
    }

    pub fn info(&self) -> &GapInfo {
        &self.info
    }

    pub fn candidates(&self) -> &[GapCandidate] {
        &self.candidates
    }

    pub fn chosen(&self) -> Option<&GapCandidate> {
        self.chosen.as_ref()
    }

    fn require(&self, allowed: &[GapState], action: &'static str) -> Result<(), GapError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(GapError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Record generated candidates.
    pub fn set_candidates(&mut self, candidates: Vec<GapCandidate>) -> Result<(), GapError> {
        self.require(&[GapState::GapDetected], "generate candidates for")?;
        self.candidates = candidates;
        self.state = GapState::CandidatesGenerated;
        Ok(())
    }

    /// Accept candidate `position` and return `scene_match` retimed onto it.
    pub fn resolve(&mut self, position: usize, scene_match: &SceneMatch) -> Result<SceneMatch, GapError> {
        self.require(&[GapState::CandidatesGenerated], "resolve")?;
        let candidate = self
            .candidates
            .get(position)
            .cloned()
            .ok_or(GapError::CandidateNotFound {
                position,
                available: self.candidates.len(),
            })?;

        let mut retimed = scene_match.clone();
        retimed.start_time = candidate.start_time;
        retimed.end_time = candidate.end_time;
        retimed.speed_ratio = self
            .info
            .target_duration
            .ratio_to(candidate.end_time - candidate.start_time)
            .unwrap_or(retimed.speed_ratio);
        retimed.confirmed = true;

        tracing::info!(
            scene = self.info.scene_index,
            strategy = ?candidate.strategy,
            speed = fraction::to_f64(&candidate.speed),
            "Gap resolved"
        );

        self.chosen = Some(candidate);
        self.state = GapState::Resolved;
        Ok(retimed)
    }

    /// Leave the gap as is.
    pub fn skip(&mut self) -> Result<(), GapError> {
        self.require(&[GapState::GapDetected, GapState::CandidatesGenerated], "skip")?;
        self.state = GapState::Skipped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scenesync_project_model::Scene;

    fn secs(text: &str) -> Seconds {
        Seconds::parse(text).unwrap()
    }

    fn matched(start: &str, end: &str) -> SceneMatch {
        let mut m = SceneMatch::unmatched(0);
        m.episode = "ep01".to_string();
        m.start_time = secs(start);
        m.end_time = secs(end);
        m.confidence = 0.9;
        m
    }

    fn cuts(values: &[&str]) -> Vec<Seconds> {
        values.iter().map(|v| secs(v)).collect()
    }

    #[test]
    fn test_compute_speed_scenario_no_gap() {
        let config = GapConfig {
            sequence_rate: Some(FrameRate::FPS_60),
            ..GapConfig::default()
        };
        let info = GapInfo::compute(0, &matched("2.0", "3.0"), secs("1.0"), &config).unwrap();
        assert_eq!(info.current_speed, Fraction::from_integer(1));
        assert_eq!(info.effective_speed, Fraction::from_integer(1));
        assert_eq!(info.gap_duration, Seconds::ZERO);
        assert_eq!(info.state, GapState::NoGap);
    }

    #[test]
    fn test_gap_scenario_exact_fractions() {
        let info =
            GapInfo::compute(0, &matched("10.0", "10.5"), secs("3.0"), &GapConfig::default()).unwrap();
        assert_eq!(info.current_speed, Fraction::new(1, 6));
        assert_eq!(info.effective_speed, Fraction::new(3, 4));
        assert_eq!(info.gap_duration, Seconds::from_ratio(7, 3).unwrap());
        assert!(info.has_gap());
    }

    #[test]
    fn test_speed_none_for_non_positive_target() {
        assert!(compute_raw_speed(secs("1"), secs("2"), Seconds::ZERO).is_none());
        assert!(compute_speed(secs("1"), secs("2"), secs("-1"), &GapConfig::default()).is_none());
    }

    #[test]
    fn test_ceiling_clamp() {
        let speed = compute_speed(secs("0"), secs("4"), secs("2"), &GapConfig::default()).unwrap();
        assert_eq!(speed, Fraction::new(8, 5));
    }

    #[test]
    fn test_calculate_gaps_uses_timings_and_scene_fallback() {
        let scenes = vec![
            Scene::new(0, secs("0"), secs("2")),
            Scene::new(1, secs("2"), secs("4")),
            Scene::new(2, secs("4"), secs("6")),
        ];
        let mut second = matched("50.0", "51.0");
        second.scene_index = 1;
        let mut first = matched("10.0", "12.0");
        first.scene_index = 0;
        let timeline = SceneTimeline::from_parts(scenes, vec![first, second]).unwrap();
        let timings = vec![SceneTiming {
            scene_index: 0,
            target_duration: secs("4.0"),
        }];

        let gaps = calculate_gaps(&timeline, &timings, &GapConfig::default());

        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].target_duration, secs("4.0"));
        assert_eq!(gaps[0].current_speed, Fraction::new(1, 2));
        assert!(gaps[0].has_gap());
        assert_eq!(gaps[1].target_duration, secs("2.0"));
        assert!(gaps[1].has_gap());
    }

    #[test]
    fn test_shot_fill_reaches_realtime_inside_shot() {
        let cut_list = cuts(&["0", "5", "20", "60"]);
        let context = GapContext {
            start_time: secs("10.0"),
            end_time: secs("11.0"),
            target_duration: secs("3.0"),
            cuts: &cut_list,
            source_rate: FrameRate::FPS_25,
            video_duration: secs("60"),
        };

        let candidates = generate_candidates(&context, &GapConfig::default()).unwrap();

        let best = &candidates[0];
        assert_eq!(best.strategy, CandidateStrategy::ShotFill);
        assert_eq!(best.start_time, secs("10.0"));
        assert_eq!(best.end_time, secs("13.0"));
        assert_eq!(best.speed, Fraction::from_integer(1));
        assert!(candidates.iter().all(|c| c.strategy != CandidateStrategy::FallbackForward));
    }

    #[test]
    fn test_cut_extensions_keep_safety_margin() {
        let cut_list = cuts(&["0", "8", "12.5", "30"]);
        let context = GapContext {
            start_time: secs("9.0"),
            end_time: secs("10.0"),
            target_duration: secs("4.0"),
            cuts: &cut_list,
            source_rate: FrameRate::FPS_25,
            video_duration: secs("30"),
        };

        let candidates = generate_candidates(&context, &GapConfig::default()).unwrap();

        // Shot is [8.12, 12.38]: end-only reaches 3.38s, both reach 4.26s.
        let both = candidates
            .iter()
            .find(|c| c.strategy == CandidateStrategy::ExtendBoth)
            .unwrap();
        assert_eq!(both.start_time, secs("8.12"));
        assert_eq!(both.end_time, secs("12.38"));
        let end_only = candidates
            .iter()
            .find(|c| c.strategy == CandidateStrategy::ExtendEnd)
            .unwrap();
        assert_eq!(end_only.end_time, secs("12.38"));
        assert_eq!(candidates[0].speed, Fraction::from_integer(1));
    }

    #[test]
    fn test_fallback_when_shot_too_short() {
        let cut_list = cuts(&["0", "9.9", "10.3", "100"]);
        let context = GapContext {
            start_time: secs("10.0"),
            end_time: secs("10.2"),
            target_duration: secs("3.0"),
            cuts: &cut_list,
            source_rate: FrameRate::FPS_25,
            video_duration: secs("100"),
        };

        let candidates = generate_candidates(&context, &GapConfig::default()).unwrap();

        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.speed == Fraction::from_integer(1)));
        assert_eq!(candidates[0].strategy, CandidateStrategy::FallbackBackward);
        assert_eq!(candidates[0].start_time, secs("7.2"));
        assert_eq!(candidates[2].start_time, secs("8.6"));
        assert_eq!(candidates[2].end_time, secs("11.6"));
    }

    #[test]
    fn test_fallback_is_bounded_by_video() {
        let cut_list = cuts(&["0", "2"]);
        let context = GapContext {
            start_time: secs("0.1"),
            end_time: secs("1.9"),
            target_duration: secs("2.4"),
            cuts: &cut_list,
            source_rate: FrameRate::FPS_23_976,
            video_duration: secs("2"),
        };

        let candidates = generate_candidates(&context, &GapConfig::default()).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].strategy, CandidateStrategy::FallbackSplit);
        assert_eq!(candidates[0].start_time, Seconds::ZERO);
        assert_eq!(candidates[0].end_time, secs("2"));
        assert!(candidates.iter().all(|c| c.start_time >= Seconds::ZERO));
        assert!(candidates.iter().all(|c| c.end_time <= secs("2")));
        assert!(candidates.iter().all(|c| GapConfig::default().accepts(&c.speed)));
    }

    #[test]
    fn test_invalid_context_rejected() {
        let context = GapContext {
            start_time: secs("5"),
            end_time: secs("5"),
            target_duration: secs("1"),
            cuts: &[],
            source_rate: FrameRate::FPS_24,
            video_duration: secs("10"),
        };
        assert!(matches!(
            generate_candidates(&context, &GapConfig::default()),
            Err(GapError::InvalidExcerpt { .. })
        ));
    }

    #[test]
    fn test_resolution_state_machine() {
        let scene_match = matched("10.0", "10.5");
        let info = GapInfo::compute(0, &scene_match, secs("3.0"), &GapConfig::default()).unwrap();
        let mut resolution = GapResolution::new(info);
        assert_eq!(resolution.state(), GapState::GapDetected);
        assert!(resolution.resolve(0, &scene_match).is_err());

        resolution
            .set_candidates(vec![GapCandidate {
                strategy: CandidateStrategy::ExtendEnd,
                start_time: secs("10.0"),
                end_time: secs("13.0"),
                speed: Fraction::from_integer(1),
                rationale: String::new(),
            }])
            .unwrap();
        assert!(resolution.resolve(3, &scene_match).is_err());

        let retimed = resolution.resolve(0, &scene_match).unwrap();
        assert_eq!(retimed.end_time, secs("13.0"));
        assert_eq!(retimed.speed_ratio, Fraction::from_integer(1));
        assert!(retimed.confirmed);
        assert_eq!(resolution.state(), GapState::Resolved);
        assert!(resolution.skip().is_err());
    }

    #[test]
    fn test_no_gap_cannot_be_resolved_or_skipped() {
        let scene_match = matched("0", "1");
        let info = GapInfo::compute(0, &scene_match, secs("1"), &GapConfig::default()).unwrap();
        let mut resolution = GapResolution::new(info);
        assert!(resolution.set_candidates(vec![]).is_err());
        assert!(resolution.skip().is_err());
    }

    proptest! {
        #[test]
        fn prop_speed_is_reproducible(start in 0u32..10_000_000, len in 1u32..10_000_000, target in 1u32..10_000_000) {
            let fmt = |micros: u32| format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000);
            let s = secs(&fmt(start));
            let e = secs(&fmt(start + len));
            let t = secs(&fmt(target));
            let a = compute_raw_speed(s, e, t).unwrap();
            let b = compute_raw_speed(secs(&fmt(start)), secs(&fmt(start + len)), secs(&fmt(target))).unwrap();
            prop_assert_eq!(a, b);
            prop_assert_eq!(a, Fraction::new(len as i128, target as i128));
        }

        #[test]
        fn prop_effective_speed_is_clamped(len in 1u32..10_000_000, target in 1u32..10_000_000) {
            let config = GapConfig::default();
            let raw = Fraction::new(len as i128, target as i128);
            let effective = compute_speed(
                Seconds::ZERO,
                Seconds::from_ratio(len as i128, 1_000_000).unwrap(),
                Seconds::from_ratio(target as i128, 1_000_000).unwrap(),
                &config,
            ).unwrap();
            if raw < config.speed_floor {
                prop_assert_eq!(effective, Fraction::new(3, 4));
            } else if raw > config.speed_ceiling {
                prop_assert_eq!(effective, Fraction::new(8, 5));
            } else {
                prop_assert_eq!(effective, raw);
            }
        }

        #[test]
        fn prop_candidates_are_valid(
            start_ms in 0i64..50_000,
            len_ms in 10i64..3_000,
            target_ms in 100i64..8_000,
            cut_ms in proptest::collection::vec(1i64..100_000, 0..12),
        ) {
            let video = Seconds::from_integer(100);
            let mut cut_list: Vec<Seconds> = cut_ms.into_iter().map(Seconds::from_millis).collect();
            cut_list.push(Seconds::ZERO);
            cut_list.push(video);
            cut_list.sort();
            cut_list.dedup();

            let context = GapContext {
                start_time: Seconds::from_millis(start_ms),
                end_time: Seconds::from_millis(start_ms + len_ms),
                target_duration: Seconds::from_millis(target_ms),
                cuts: &cut_list,
                source_rate: FrameRate::FPS_29_97,
                video_duration: video,
            };
            let config = GapConfig::default();
            let candidates = generate_candidates(&context, &config).unwrap();

            for c in &candidates {
                prop_assert!(c.end_time > c.start_time);
                prop_assert!(config.accepts(&c.speed));
                prop_assert!(c.start_time >= Seconds::ZERO);
                prop_assert!(c.end_time <= video);
            }
            for pair in candidates.windows(2) {
                prop_assert!(pair[0].distance_from_realtime() <= pair[1].distance_from_realtime());
            }
        }
    }
}
