//! Per-scene matching against the similarity index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use scenesync_common::SceneSyncResult;
use scenesync_media::FrameExtractor;
use scenesync_processing_core::{AnchorCandidates, TemporalMatcher};
use scenesync_project_model::{Scene, SceneMatch};

use crate::index::SimilarityIndex;

/// Where to look for source footage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScope {
    /// Library directory the similarity index was built from.
    pub library: PathBuf,

    /// Restrict matches to one series.
    #[serde(default)]
    pub series: Option<String>,
}

/// Progress of a batch match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    Started { total: usize },
    SceneMatched { index: usize, scene_match: SceneMatch },
    Finished { matches: Vec<SceneMatch> },
}

/// Extracts anchor frames of a target scene, searches them, and reconciles
/// the hits.
pub struct SceneMatcher {
    frames: Arc<dyn FrameExtractor>,
    matcher: TemporalMatcher,
}

impl SceneMatcher {
    pub fn new(frames: Arc<dyn FrameExtractor>, matcher: TemporalMatcher) -> Self {
        Self { frames, matcher }
    }

    pub fn matcher(&self) -> &TemporalMatcher {
        &self.matcher
    }

    /// Match one scene. Extraction and index failures do not propagate:
    /// the scene gets a zero-confidence match carrying the error.
    pub async fn match_scene(
        &self,
        index: &dyn SimilarityIndex,
        target_video: &Path,
        scene: &Scene,
        scope: &SourceScope,
    ) -> SceneMatch {
        match self.anchor_candidates(index, target_video, scene, scope).await {
            Ok(candidates) => self.matcher.reconcile(scene, &candidates),
            Err(e) => {
                tracing::warn!(scene = scene.index, error = %e, "Scene matching failed");
                SceneMatch::unmatched(scene.index).with_error(e.to_string())
            }
        }
    }

    /// Search results for the three anchors of `scene`.
    pub async fn anchor_candidates(
        &self,
        index: &dyn SimilarityIndex,
        target_video: &Path,
        scene: &Scene,
        scope: &SourceScope,
    ) -> SceneSyncResult<AnchorCandidates> {
        let config = self.matcher.config();
        let anchors = self.matcher.anchor_points(scene);
        let mut hits = Vec::with_capacity(3);

        for at in anchors.as_array() {
            let frame = self.frames.extract_frame(target_video, at).await?;
            let found = index
                .search(&frame, config.top_k, config.allow_flip, scope.series.as_deref())
                .await?;
            hits.push(found);
        }

        let mut hits = hits.into_iter();
        Ok(AnchorCandidates {
            start: hits.next().unwrap_or_default(),
            mid: hits.next().unwrap_or_default(),
            end: hits.next().unwrap_or_default(),
        })
    }
}
