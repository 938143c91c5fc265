//! Ordered scene/match collection.
//!
//! Scenes and their matches travel together as [`SceneEntry`] pairs so a
//! structural edit (merge, split, undo) can never leave a match pointing at
//! the wrong scene. Every edit ends with [`SceneTimeline::reindex`].

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use scenesync_timebase::Seconds;

use crate::project::ProjectError;
use crate::scene::Scene;
use crate::scene_match::SceneMatch;

/// Allowed slack between one scene's end and the next scene's start.
pub fn boundary_tolerance() -> Seconds {
    Seconds::from_millis(1)
}

/// A scene and its (optional) match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub scene: Scene,

    #[serde(default)]
    pub scene_match: Option<SceneMatch>,
}

impl SceneEntry {
    pub fn new(scene: Scene, scene_match: Option<SceneMatch>) -> Self {
        Self { scene, scene_match }
    }
}

/// The target timeline: scenes in order, each with its match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneTimeline {
    entries: Vec<SceneEntry>,
}

impl SceneTimeline {
    /// A timeline of unmatched scenes.
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self::from_entries(
            scenes
                .into_iter()
                .map(|scene| SceneEntry::new(scene, None))
                .collect(),
        )
    }

    pub fn from_entries(entries: Vec<SceneEntry>) -> Self {
        let mut timeline = Self { entries };
        timeline.reindex();
        timeline
    }

    /// Pair a scene list with a match list keyed by `scene_index`.
    ///
    /// Scenes keep their given order; a match for an unknown scene or two
    /// matches for the same scene are rejected.
    pub fn from_parts(scenes: Vec<Scene>, matches: Vec<SceneMatch>) -> Result<Self, ProjectError> {
        let mut entries: Vec<SceneEntry> = scenes
            .into_iter()
            .map(|scene| SceneEntry::new(scene, None))
            .collect();

        for scene_match in matches {
            let position = entries
                .iter()
                .position(|entry| entry.scene.index == scene_match.scene_index)
                .ok_or_else(|| ProjectError::ValidationError {
                    message: format!(
                        "match refers to unknown scene {}",
                        scene_match.scene_index
                    ),
                })?;

            let slot = &mut entries[position].scene_match;
            if slot.is_some() {
                return Err(ProjectError::ValidationError {
                    message: format!("scene {} has more than one match", scene_match.scene_index),
                });
            }
            *slot = Some(scene_match);
        }

        Ok(Self::from_entries(entries))
    }

    /// Split back into the persisted scene and match lists.
    pub fn into_parts(self) -> (Vec<Scene>, Vec<SceneMatch>) {
        let mut scenes = Vec::with_capacity(self.entries.len());
        let mut matches = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            scenes.push(entry.scene);
            if let Some(m) = entry.scene_match {
                matches.push(m);
            }
        }
        (scenes, matches)
    }

    pub fn scenes(&self) -> Vec<Scene> {
        self.entries.iter().map(|e| e.scene.clone()).collect()
    }

    pub fn matches(&self) -> Vec<SceneMatch> {
        self.entries
            .iter()
            .filter_map(|e| e.scene_match.clone())
            .collect()
    }

    pub fn entries(&self) -> &[SceneEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SceneEntry> {
        self.entries
    }

    pub fn get(&self, index: usize) -> Option<&SceneEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn match_at(&self, index: usize) -> Option<&SceneMatch> {
        self.entries.get(index).and_then(|e| e.scene_match.as_ref())
    }

    /// Attach a match to scene `index`, replacing any previous one.
    pub fn set_match(&mut self, index: usize, mut scene_match: SceneMatch) -> Result<(), ProjectError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        scene_match.scene_index = index;
        entry.scene_match = Some(scene_match);
        Ok(())
    }

    /// Whether any scene currently stands for several merged originals.
    pub fn has_merged_scenes(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.scene_match.as_ref().map(SceneMatch::is_merged).unwrap_or(false))
    }

    /// Renumber scenes and matches to their positions.
    pub fn reindex(&mut self) {
        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.scene.index = position;
            if let Some(m) = entry.scene_match.as_mut() {
                m.scene_index = position;
            }
        }
    }

    /// Replace the entries in `range` with `replacement`, then reindex.
    pub fn splice(
        &mut self,
        range: RangeInclusive<usize>,
        replacement: Vec<SceneEntry>,
    ) -> Result<(), ProjectError> {
        if range.is_empty() || *range.end() >= self.entries.len() {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "range {}..={} is outside a timeline of {} scenes",
                    range.start(),
                    range.end(),
                    self.entries.len()
                ),
            });
        }
        self.entries.splice(range, replacement);
        self.reindex();
        Ok(())
    }

    /// Split scene `index` at `at`. Both halves lose their match and need
    /// re-matching.
    pub fn split_scene(&mut self, index: usize, at: Seconds) -> Result<(), ProjectError> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| out_of_range(index, self.entries.len()))?;

        if !entry.scene.contains(at) {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "split point {at} is not inside scene {index} ({} - {})",
                    entry.scene.start_time, entry.scene.end_time
                ),
            });
        }

        let first = Scene::new(index, entry.scene.start_time, at);
        let second = Scene::new(index + 1, at, entry.scene.end_time);
        self.splice(
            index..=index,
            vec![SceneEntry::new(first, None), SceneEntry::new(second, None)],
        )
    }

    /// Check ordering and contiguity: every scene has positive length and
    /// ends where the next one starts (within 1ms).
    pub fn validate(&self) -> Result<(), ProjectError> {
        let tolerance = boundary_tolerance();

        for (position, entry) in self.entries.iter().enumerate() {
            if entry.scene.index != position {
                return Err(ProjectError::ValidationError {
                    message: format!(
                        "scene at position {position} is numbered {}",
                        entry.scene.index
                    ),
                });
            }
            if entry.scene.end_time <= entry.scene.start_time {
                return Err(ProjectError::ValidationError {
                    message: format!("scene {position} has non-positive duration"),
                });
            }
        }

        for pair in self.entries.windows(2) {
            let (left, right) = (&pair[0].scene, &pair[1].scene);
            if !left.end_time.approx_eq(right.start_time, tolerance) {
                return Err(ProjectError::ValidationError {
                    message: format!(
                        "scenes {} and {} are not contiguous ({} vs {})",
                        left.index, right.index, left.end_time, right.start_time
                    ),
                });
            }
        }

        Ok(())
    }
}

fn out_of_range(index: usize, len: usize) -> ProjectError {
    ProjectError::ValidationError {
        message: format!("scene {index} does not exist (timeline has {len} scenes)"),
    }
}
