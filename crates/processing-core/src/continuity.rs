//! Continuity detection, merge chains, merge and undo.
//!
//! Two adjacent target scenes are *continuous* when they come from the same
//! source episode and the second one starts (in source time) roughly where
//! the first one ends. Runs of continuous scenes are merged into a single
//! scene that is matched again as a whole; the pre-merge timeline is kept in
//! a [`MergeBackup`] so every merge can be undone exactly.

use serde::{Deserialize, Serialize};

use scenesync_common::ContinuityDefaults;
use scenesync_project_model::{
    MergeBackup, MergeChain, Scene, SceneEntry, SceneMatch, SceneTimeline,
};
use scenesync_timebase::Seconds;

/// Configuration for continuity detection.
#[derive(Debug, Clone)]
pub struct ContinuityConfig {
    /// Largest source-time jump between two scenes that still counts as
    /// continuous (inclusive).
    pub tolerance: Seconds,

    /// Minimum confidence for a match (or alternative) to vote.
    pub min_confidence: f64,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            tolerance: Seconds::from_integer(2),
            min_confidence: 0.5,
        }
    }
}

impl From<&ContinuityDefaults> for ContinuityConfig {
    fn from(defaults: &ContinuityDefaults) -> Self {
        let fallback = Self::default();
        Self {
            tolerance: Seconds::from_f64(defaults.tolerance_secs).unwrap_or(fallback.tolerance),
            min_confidence: defaults.min_confidence,
        }
    }
}

/// Two adjacent scenes found continuous in one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityPair {
    pub left: usize,
    pub right: usize,
    pub episode: String,

    /// Source-time jump from the end of `left` to the start of `right`.
    /// Negative when the excerpts overlap.
    pub gap: Seconds,
}

/// Result of [`merge`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub timeline: SceneTimeline,

    /// Snapshot to persist before the new timeline. `None` when nothing
    /// was merged.
    pub backup: Option<MergeBackup>,

    /// New indices of the merged scenes; these need re-matching.
    pub merged_indices: Vec<usize>,
}

/// Result of [`undo_merge`].
#[derive(Debug, Clone)]
pub struct UndoOutcome {
    pub timeline: SceneTimeline,

    /// Merged scenes still present after the undo.
    pub remaining_merged: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("timeline already contains merged scenes; undo them before merging again")]
    AlreadyMerged,

    #[error("invalid merge chain: {reason}")]
    InvalidChain { reason: String },

    #[error("scene {index} does not exist (timeline has {len} scenes)")]
    SceneNotFound { index: usize, len: usize },

    #[error("scene {index} is not a merged scene")]
    NotMerged { index: usize },

    #[error("no merge backup is available")]
    NoBackup,

    #[error("merge backup has no record of original scene {index}")]
    BackupMismatch { index: usize },
}

/// `(episode, time)` votes of one match: the primary when confident enough,
/// otherwise every confident alternative.
fn votes(scene_match: &SceneMatch, min_confidence: f64, at_end: bool) -> Vec<(&str, Seconds)> {
    if scene_match.is_matched() && scene_match.confidence >= min_confidence {
        let time = if at_end {
            scene_match.end_time
        } else {
            scene_match.start_time
        };
        return vec![(scene_match.episode.as_str(), time)];
    }

    scene_match
        .alternatives
        .iter()
        .filter(|alt| alt.confidence >= min_confidence)
        .map(|alt| {
            let time = if at_end { alt.end_time } else { alt.start_time };
            (alt.episode.as_str(), time)
        })
        .collect()
}

/// Find every adjacent pair of scenes that continues in the same episode.
///
/// For each pair the first shared episode (in candidate order) within the
/// tolerance decides the edge.
pub fn detect_continuous_pairs(timeline: &SceneTimeline, config: &ContinuityConfig) -> Vec<ContinuityPair> {
    let mut pairs = Vec::new();

    for window in timeline.entries().windows(2) {
        let (Some(left), Some(right)) = (&window[0].scene_match, &window[1].scene_match) else {
            continue;
        };

        let left_votes = votes(left, config.min_confidence, true);
        let right_votes = votes(right, config.min_confidence, false);

        let edge = left_votes.iter().find_map(|(episode, end)| {
            right_votes
                .iter()
                .filter(|(other, _)| other == episode)
                .map(|(_, start)| *start - *end)
                .find(|gap| gap.abs() <= config.tolerance)
                .map(|gap| (episode.to_string(), gap))
        });

        if let Some((episode, gap)) = edge {
            pairs.push(ContinuityPair {
                left: window[0].scene.index,
                right: window[1].scene.index,
                episode,
                gap,
            });
        }
    }

    tracing::debug!(pairs = pairs.len(), "Continuity detection finished");
    pairs
}

/// Group pairs into chains of consecutive scenes sharing one episode.
///
/// A chain breaks when the next edge does not start at the chain's last
/// scene or names a different episode. An edge whose left scene already
/// ends a chain is dropped, so chains never share a scene.
pub fn build_merge_chains(pairs: &[ContinuityPair]) -> Vec<MergeChain> {
    let mut sorted: Vec<&ContinuityPair> = pairs.iter().collect();
    sorted.sort_by_key(|p| p.left);

    let mut chains: Vec<MergeChain> = Vec::new();
    for pair in sorted {
        if pair.right != pair.left + 1 {
            continue;
        }
        match chains.last_mut() {
            Some(chain) if chain.last() == Some(pair.left) && chain.episode == pair.episode => {
                chain.indices.push(pair.right);
            }
            Some(chain) if chain.last().is_some_and(|last| last >= pair.left) => {
                tracing::debug!(
                    left = pair.left,
                    episode = %pair.episode,
                    "Skipping edge whose left scene already ends a chain"
                );
            }
            _ => chains.push(MergeChain {
                indices: vec![pair.left, pair.right],
                episode: pair.episode.clone(),
            }),
        }
    }
    chains
}

fn validate_chains(timeline: &SceneTimeline, chains: &[MergeChain]) -> Result<(), MergeError> {
    let invalid = |reason: String| MergeError::InvalidChain { reason };
    let mut previous_last: Option<usize> = None;

    for chain in chains {
        let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
            return Err(invalid("empty chain".to_string()));
        };
        if chain.indices.len() < 2 {
            return Err(invalid(format!("chain at scene {first} has a single scene")));
        }
        if chain.indices.windows(2).any(|w| w[1] != w[0] + 1) {
            return Err(invalid(format!(
                "chain {:?} is not ascending and consecutive",
                chain.indices
            )));
        }
        if last >= timeline.len() {
            return Err(invalid(format!(
                "chain {:?} exceeds a timeline of {} scenes",
                chain.indices,
                timeline.len()
            )));
        }
        if previous_last.is_some_and(|prev| first <= prev) {
            return Err(invalid(format!(
                "chain {:?} overlaps or precedes the previous chain",
                chain.indices
            )));
        }
        previous_last = Some(last);
    }
    Ok(())
}

/// Collapse every chain into one scene spanning `[first.start, last.end]`.
///
/// Each merged scene gets a placeholder match naming the chain episode,
/// zero confidence and `merged_from` set; it is re-matched afterwards.
/// Nothing is mutated when validation fails.
pub fn merge(timeline: &SceneTimeline, chains: &[MergeChain]) -> Result<MergeOutcome, MergeError> {
    if chains.is_empty() {
        return Ok(MergeOutcome {
            timeline: timeline.clone(),
            backup: None,
            merged_indices: vec![],
        });
    }
    if timeline.has_merged_scenes() {
        return Err(MergeError::AlreadyMerged);
    }
    validate_chains(timeline, chains)?;

    let backup = MergeBackup::capture(timeline, chains);
    let entries = timeline.entries();
    let mut merged_entries: Vec<SceneEntry> = Vec::with_capacity(entries.len());
    let mut merged_indices = Vec::with_capacity(chains.len());
    let mut chain_iter = chains.iter().peekable();
    let mut position = 0;

    while position < entries.len() {
        match chain_iter.next_if(|c| c.first() == Some(position)) {
            Some(chain) => {
                let last = chain.last().unwrap_or(position);
                let new_index = merged_entries.len();
                let scene = Scene::new(
                    new_index,
                    entries[position].scene.start_time,
                    entries[last].scene.end_time,
                );
                let mut placeholder = SceneMatch::unmatched(new_index);
                placeholder.episode = chain.episode.clone();
                placeholder.merged_from = Some(chain.indices.clone());

                merged_entries.push(SceneEntry::new(scene, Some(placeholder)));
                merged_indices.push(new_index);
                position = last + 1;
            }
            None => {
                merged_entries.push(entries[position].clone());
                position += 1;
            }
        }
    }

    tracing::info!(
        chains = chains.len(),
        before = entries.len(),
        after = merged_entries.len(),
        "Merged continuous scenes"
    );

    Ok(MergeOutcome {
        timeline: SceneTimeline::from_entries(merged_entries),
        backup: Some(backup),
        merged_indices,
    })
}

/// Restore the original scenes and matches behind merged scene `scene_index`.
pub fn undo_merge(
    timeline: &SceneTimeline,
    scene_index: usize,
    backup: &MergeBackup,
) -> Result<UndoOutcome, MergeError> {
    let entry = timeline.get(scene_index).ok_or(MergeError::SceneNotFound {
        index: scene_index,
        len: timeline.len(),
    })?;

    let originals = entry
        .scene_match
        .as_ref()
        .and_then(|m| m.merged_from.clone())
        .filter(|indices| !indices.is_empty())
        .ok_or(MergeError::NotMerged { index: scene_index })?;

    let restored = originals
        .iter()
        .map(|&index| {
            let scene = backup
                .scene(index)
                .cloned()
                .ok_or(MergeError::BackupMismatch { index })?;
            Ok(SceneEntry::new(scene, backup.match_for(index).cloned()))
        })
        .collect::<Result<Vec<_>, MergeError>>()?;

    let mut restored_timeline = timeline.clone();
    restored_timeline
        .splice(scene_index..=scene_index, restored)
        .map_err(|_| MergeError::SceneNotFound {
            index: scene_index,
            len: timeline.len(),
        })?;

    let remaining_merged = restored_timeline
        .entries()
        .iter()
        .filter(|e| e.scene_match.as_ref().is_some_and(SceneMatch::is_merged))
        .count();

    tracing::info!(
        scene = scene_index,
        restored = originals.len(),
        remaining_merged,
        "Undid merge"
    );

    Ok(UndoOutcome {
        timeline: restored_timeline,
        remaining_merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesync_project_model::AlternativeMatch;
    use scenesync_timebase::Fraction;

    fn secs(text: &str) -> Seconds {
        Seconds::parse(text).unwrap()
    }

    fn matched(episode: &str, start: &str, end: &str, confidence: f64) -> SceneMatch {
        let mut m = SceneMatch::unmatched(0);
        m.episode = episode.to_string();
        m.start_time = secs(start);
        m.end_time = secs(end);
        m.confidence = confidence;
        m.speed_ratio = Fraction::from_integer(1);
        m
    }

    fn timeline(matches: Vec<Option<SceneMatch>>) -> SceneTimeline {
        let entries = matches
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                let scene = Scene::new(i, Seconds::from_integer(i as i64), Seconds::from_integer(i as i64 + 1));
                SceneEntry::new(scene, m)
            })
            .collect();
        SceneTimeline::from_entries(entries)
    }

    #[test]
    fn test_detects_continuous_pair() {
        let t = timeline(vec![
            Some(matched("ep01", "10.0", "11.0", 0.9)),
            Some(matched("ep01", "11.5", "12.5", 0.9)),
            Some(matched("ep02", "12.5", "13.5", 0.9)),
        ]);

        let pairs = detect_continuous_pairs(&t, &ContinuityConfig::default());

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].left, 0);
        assert_eq!(pairs[0].right, 1);
        assert_eq!(pairs[0].episode, "ep01");
        assert_eq!(pairs[0].gap, secs("0.5"));
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let exact = timeline(vec![
            Some(matched("ep", "0.0", "1.0", 0.9)),
            Some(matched("ep", "3.0", "4.0", 0.9)),
        ]);
        assert_eq!(detect_continuous_pairs(&exact, &ContinuityConfig::default()).len(), 1);

        let beyond = timeline(vec![
            Some(matched("ep", "0.0", "1.0", 0.9)),
            Some(matched("ep", "3.001", "4.0", 0.9)),
        ]);
        assert!(detect_continuous_pairs(&beyond, &ContinuityConfig::default()).is_empty());

        let backwards = timeline(vec![
            Some(matched("ep", "5.0", "6.0", 0.9)),
            Some(matched("ep", "4.0", "5.0", 0.9)),
        ]);
        assert_eq!(detect_continuous_pairs(&backwards, &ContinuityConfig::default()).len(), 1);
    }

    #[test]
    fn test_low_confidence_primary_falls_back_to_alternatives() {
        let mut weak = matched("wrong", "90.0", "91.0", 0.3);
        weak.alternatives.push(AlternativeMatch {
            episode: "ep07".to_string(),
            start_time: secs("20.0"),
            end_time: secs("21.0"),
            confidence: 0.6,
            speed_ratio: Fraction::from_integer(1),
            vote_count: 3,
        });
        let t = timeline(vec![Some(weak), Some(matched("ep07", "21.2", "22.0", 0.8))]);

        let pairs = detect_continuous_pairs(&t, &ContinuityConfig::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].episode, "ep07");
    }

    #[test]
    fn test_unmatched_scene_breaks_continuity() {
        let t = timeline(vec![
            Some(matched("ep", "0.0", "1.0", 0.9)),
            None,
            Some(matched("ep", "1.0", "2.0", 0.9)),
        ]);
        assert!(detect_continuous_pairs(&t, &ContinuityConfig::default()).is_empty());
    }

    #[test]
    fn test_chains_break_on_episode_change() {
        let pair = |left: usize, episode: &str| ContinuityPair {
            left,
            right: left + 1,
            episode: episode.to_string(),
            gap: Seconds::ZERO,
        };
        let chains = build_merge_chains(&[pair(0, "a"), pair(1, "a"), pair(2, "b"), pair(5, "a")]);

        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].indices, vec![0, 1, 2]);
        assert_eq!(chains[0].episode, "a");
        assert_eq!(chains[1].indices, vec![5, 6]);

        let resumed = build_merge_chains(&[pair(0, "a"), pair(1, "a"), pair(2, "b"), pair(3, "b")]);
        assert_eq!(resumed.len(), 2);
        assert_eq!(resumed[0].indices, vec![0, 1, 2]);
        assert_eq!(resumed[1].indices, vec![3, 4]);
        assert_eq!(resumed[1].episode, "b");
    }

    #[test]
    fn test_chains_at_episode_junction_merge_cleanly() {
        // Scene 2 sits in both episodes through its alternatives.
        let mut junction = matched("unsure", "70.0", "71.0", 0.2);
        for (episode, start, end) in [("a", "2.0", "3.0"), ("b", "50.0", "51.0")] {
            junction.alternatives.push(AlternativeMatch {
                episode: episode.to_string(),
                start_time: secs(start),
                end_time: secs(end),
                confidence: 0.7,
                speed_ratio: Fraction::from_integer(1),
                vote_count: 3,
            });
        }
        let t = timeline(vec![
            Some(matched("a", "0.0", "1.0", 0.9)),
            Some(matched("a", "1.0", "2.0", 0.9)),
            Some(junction),
            Some(matched("b", "51.0", "52.0", 0.9)),
        ]);

        let pairs = detect_continuous_pairs(&t, &ContinuityConfig::default());
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].episode, "b");

        let chains = build_merge_chains(&pairs);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].indices, vec![0, 1, 2]);

        let outcome = merge(&t, &chains).unwrap();
        assert_eq!(outcome.timeline.len(), 2);
        assert_eq!(outcome.merged_indices, vec![0]);
        assert_eq!(outcome.timeline.match_at(1).unwrap().episode, "b");
        assert!(outcome.timeline.validate().is_ok());
    }

    #[test]
    fn test_merge_collapses_chain() {
        let t = timeline(vec![
            Some(matched("ep", "0.0", "1.0", 0.9)),
            Some(matched("ep", "1.0", "2.0", 0.9)),
            Some(matched("ep", "2.0", "3.0", 0.9)),
            Some(matched("other", "50.0", "51.0", 0.9)),
        ]);
        let chains = vec![MergeChain {
            indices: vec![0, 1, 2],
            episode: "ep".to_string(),
        }];

        let outcome = merge(&t, &chains).unwrap();

        assert_eq!(outcome.timeline.len(), 2);
        assert_eq!(outcome.merged_indices, vec![0]);
        let merged = &outcome.timeline.entries()[0];
        assert_eq!(merged.scene.start_time, Seconds::from_integer(0));
        assert_eq!(merged.scene.end_time, Seconds::from_integer(3));
        let placeholder = merged.scene_match.as_ref().unwrap();
        assert_eq!(placeholder.merged_from, Some(vec![0, 1, 2]));
        assert_eq!(placeholder.confidence, 0.0);
        assert_eq!(outcome.timeline.match_at(1).unwrap().episode, "other");
        assert!(outcome.timeline.validate().is_ok());
        assert!(outcome.backup.is_some());
    }

    #[test]
    fn test_merge_rejects_invalid_chains_without_mutation() {
        let t = timeline(vec![None, None, None]);
        let bad = |indices: Vec<usize>| MergeChain {
            indices,
            episode: "ep".to_string(),
        };

        assert!(matches!(merge(&t, &[bad(vec![0])]), Err(MergeError::InvalidChain { .. })));
        assert!(matches!(merge(&t, &[bad(vec![0, 2])]), Err(MergeError::InvalidChain { .. })));
        assert!(matches!(merge(&t, &[bad(vec![2, 3])]), Err(MergeError::InvalidChain { .. })));
        assert!(matches!(
            merge(&t, &[bad(vec![0, 1]), bad(vec![1, 2])]),
            Err(MergeError::InvalidChain { .. })
        ));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_merge_twice_is_rejected() {
        let t = timeline(vec![None, None, None]);
        let chain = MergeChain {
            indices: vec![0, 1],
            episode: "ep".to_string(),
        };
        let first = merge(&t, std::slice::from_ref(&chain)).unwrap();
        let again = merge(
            &first.timeline,
            &[MergeChain {
                indices: vec![0, 1],
                episode: "ep".to_string(),
            }],
        );
        assert!(matches!(again, Err(MergeError::AlreadyMerged)));
    }

    #[test]
    fn test_undo_non_merged_scene_is_rejected() {
        let t = timeline(vec![Some(matched("ep", "0.0", "1.0", 0.9))]);
        let backup = MergeBackup::capture(&t, &[]);
        assert!(matches!(undo_merge(&t, 0, &backup), Err(MergeError::NotMerged { index: 0 })));
        assert!(matches!(undo_merge(&t, 4, &backup), Err(MergeError::SceneNotFound { .. })));
    }

    #[test]
    fn test_undo_reports_remaining_merges() {
        let t = timeline(vec![None, None, None, None, None]);
        let chains = vec![
            MergeChain {
                indices: vec![0, 1],
                episode: "a".to_string(),
            },
            MergeChain {
                indices: vec![3, 4],
                episode: "b".to_string(),
            },
        ];
        let outcome = merge(&t, &chains).unwrap();
        let backup = outcome.backup.unwrap();
        assert_eq!(outcome.merged_indices, vec![0, 2]);

        let first = undo_merge(&outcome.timeline, 2, &backup).unwrap();
        assert_eq!(first.remaining_merged, 1);
        let second = undo_merge(&first.timeline, 0, &backup).unwrap();
        assert_eq!(second.remaining_merged, 0);
        assert_eq!(second.timeline, t);
    }
}
