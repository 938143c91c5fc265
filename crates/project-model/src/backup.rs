//! Merge chains and the pre-merge snapshot used for undo.

use serde::{Deserialize, Serialize};

use crate::scene::Scene;
use crate::scene_match::SceneMatch;
use crate::timeline::SceneTimeline;

/// A run of continuity-linked scenes collapsed into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeChain {
    /// Original scene indices, ascending and consecutive.
    pub indices: Vec<usize>,

    /// Episode every link of the chain agreed on.
    pub episode: String,
}

impl MergeChain {
    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.indices.last().copied()
    }
}

/// Everything needed to restore the timeline as it was before a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeBackup {
    /// When the snapshot was taken (RFC 3339).
    pub saved_at: String,

    pub scenes: Vec<Scene>,

    pub matches: Vec<SceneMatch>,

    pub chains: Vec<MergeChain>,
}

impl MergeBackup {
    /// Snapshot `timeline` before applying `chains`.
    pub fn capture(timeline: &SceneTimeline, chains: &[MergeChain]) -> Self {
        Self {
            saved_at: chrono::Utc::now().to_rfc3339(),
            scenes: timeline.scenes(),
            matches: timeline.matches(),
            chains: chains.to_vec(),
        }
    }

    /// The original match of scene `index`, if it had one.
    pub fn match_for(&self, index: usize) -> Option<&SceneMatch> {
        self.matches.iter().find(|m| m.scene_index == index)
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.index == index)
    }
}
