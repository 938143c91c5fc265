//! The service object that owns all shared state.
//!
//! One [`SceneSyncService`] is built at startup and handed out by `Arc`.
//! It holds the similarity index handle, the probe and scene-cut caches,
//! and the project store; every operation loads the project documents it
//! needs, applies a pure computation from `scenesync-processing-core`, and
//! writes the result back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use scenesync_common::{AppConfig, SceneSyncError, SceneSyncResult};
use scenesync_media::{
    CachedProbe, FfmpegFrameExtractor, FfmpegSceneCutDetector, FfprobeProbe, FrameExtractor, MediaProbe,
    SceneCutDetector, SceneCutParams, SceneCutService,
};
use scenesync_processing_core::{
    build_merge_chains, calculate_gaps, detect_continuous_pairs, merge, undo_merge, ContinuityConfig,
    ContinuityPair, GapConfig, GapError, GapInfo, GapResolution, MatcherConfig, MergeError, MergeOutcome,
    TemporalMatcher, UndoOutcome,
};
use scenesync_project_model::{
    MergeChain, ProjectError, ProjectStore, Scene, SceneMatch, SceneTiming, SceneTimeline,
};
use scenesync_timebase::Seconds;

use crate::gaps::GapResolver;
use crate::index::{IndexHandle, IndexLoader};
use crate::matching::{MatchEvent, SceneMatcher, SourceScope};
use crate::sources::SourceLibrary;

const EVENT_BUFFER: usize = 16;

/// External collaborators of the service.
pub struct ServiceParts {
    pub index_loader: Box<dyn IndexLoader>,
    pub frames: Arc<dyn FrameExtractor>,
    pub probe: Arc<dyn MediaProbe>,
    pub detector: Box<dyn SceneCutDetector>,
    pub library: Arc<dyn SourceLibrary>,
}

impl ServiceParts {
    /// ffmpeg/ffprobe-backed media tools around the given index loader and
    /// source library.
    pub fn ffmpeg(index_loader: impl IndexLoader + 'static, library: impl SourceLibrary + 'static) -> Self {
        Self {
            index_loader: Box::new(index_loader),
            frames: Arc::new(FfmpegFrameExtractor::new()),
            probe: Arc::new(CachedProbe::new(FfprobeProbe::new())),
            detector: Box::new(FfmpegSceneCutDetector::new()),
            library: Arc::new(library),
        }
    }
}

pub struct SceneSyncService {
    store: ProjectStore,
    index: IndexHandle,
    matcher: SceneMatcher,
    gaps: GapResolver,
    continuity: ContinuityConfig,
}

impl SceneSyncService {
    pub fn new(config: &AppConfig, parts: ServiceParts) -> Self {
        let cuts = SceneCutService::new(
            parts.detector,
            SceneCutParams::from(&config.scene_cuts),
            config.scene_cuts.max_concurrent,
        )
        .with_cache_dir(config.cache_dir.join("scene_cuts"));

        Self {
            store: ProjectStore::new(&config.projects_dir),
            index: IndexHandle::new(parts.index_loader),
            matcher: SceneMatcher::new(
                parts.frames,
                TemporalMatcher::new(MatcherConfig::from(&config.matching)),
            ),
            gaps: GapResolver::new(
                Arc::new(cuts),
                parts.probe,
                parts.library,
                GapConfig::from(&config.gaps),
            ),
            continuity: ContinuityConfig::from(&config.continuity),
        }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Store the scene list of a project, dropping any previous matches.
    pub fn import_scenes(&self, project_id: &str, scenes: Vec<Scene>) -> SceneSyncResult<SceneTimeline> {
        let timeline = SceneTimeline::new(scenes);
        timeline.validate().map_err(project_error)?;
        self.store
            .save_timeline(project_id, &timeline)
            .map_err(project_error)?;

        tracing::info!(project = project_id, scenes = timeline.len(), "Scenes imported");
        Ok(timeline)
    }

    /// Scenes and matches of a project. A project without scenes is an
    /// empty timeline.
    pub fn timeline(&self, project_id: &str) -> SceneSyncResult<SceneTimeline> {
        Ok(self
            .store
            .load_timeline(project_id)
            .map_err(project_error)?
            .unwrap_or_default())
    }

    /// Match every scene of the project against the library in `scope`.
    ///
    /// Matches arrive on the returned channel in scene order; each one is
    /// persisted before it is sent. Merged scenes keep their `merged_from`. Dropping the receiver abandons the
    /// scenes not yet matched. Only loading the project or the index can
    /// fail the request; per-scene failures come back as zero-confidence
    /// matches.
    pub async fn find_matches(
        self: &Arc<Self>,
        project_id: &str,
        target_video: impl Into<PathBuf>,
        scope: SourceScope,
    ) -> SceneSyncResult<mpsc::Receiver<MatchEvent>> {
        let mut timeline = self.timeline(project_id)?;
        let index = self.index.get(&scope.library).await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let service = Arc::clone(self);
        let project_id = project_id.to_string();
        let target_video = target_video.into();

        tokio::spawn(async move {
            let total = timeline.len();
            tracing::info!(project = %project_id, total, "Matching started");
            if tx.send(MatchEvent::Started { total }).await.is_err() {
                return;
            }

            let scenes = timeline.scenes();
            for scene in &scenes {
                if tx.is_closed() {
                    tracing::info!(project = %project_id, scene = scene.index, "Match receiver dropped; stopping");
                    return;
                }

                let mut scene_match = service
                    .matcher
                    .match_scene(index.as_ref(), &target_video, scene, &scope)
                    .await;
                // A merged scene stays undoable after a fresh match.
                scene_match.merged_from = timeline
                    .match_at(scene.index)
                    .and_then(|previous| previous.merged_from.clone());

                let persisted = timeline
                    .set_match(scene.index, scene_match.clone())
                    .and_then(|()| service.store.save_matches(&project_id, &timeline.matches()));
                if let Err(e) = persisted {
                    tracing::error!(project = %project_id, scene = scene.index, error = %e, "Failed to persist match; stopping");
                    return;
                }

                let event = MatchEvent::SceneMatched {
                    index: scene.index,
                    scene_match,
                };
                if tx.send(event).await.is_err() {
                    tracing::info!(project = %project_id, scene = scene.index, "Match receiver dropped; stopping");
                    return;
                }
            }

            tracing::info!(project = %project_id, total, "Matching finished");
            let _ = tx
                .send(MatchEvent::Finished {
                    matches: timeline.matches(),
                })
                .await;
        });

        Ok(rx)
    }

    /// Re-match the merged scenes at `indices`, keeping their `merged_from`
    /// and leaving every other match untouched.
    pub async fn rematch_merged(
        &self,
        project_id: &str,
        target_video: &Path,
        scope: &SourceScope,
        indices: &[usize],
    ) -> SceneSyncResult<Vec<SceneMatch>> {
        let mut timeline = self.timeline(project_id)?;

        let mut targets = Vec::with_capacity(indices.len());
        for &index in indices {
            let merged_from = timeline
                .match_at(index)
                .and_then(|m| m.merged_from.clone())
                .ok_or_else(|| {
                    SceneSyncError::invalid_input(format!("scene {index} is not a merged scene"))
                })?;
            let scene = timeline
                .get(index)
                .map(|entry| entry.scene.clone())
                .ok_or_else(|| SceneSyncError::invalid_input(format!("scene {index} does not exist")))?;
            targets.push((scene, merged_from));
        }
        if targets.is_empty() {
            return Ok(vec![]);
        }

        let index = self.index.get(&scope.library).await?;
        let mut rematched = Vec::with_capacity(targets.len());
        for (scene, merged_from) in targets {
            let mut scene_match = self
                .matcher
                .match_scene(index.as_ref(), target_video, &scene, scope)
                .await;
            scene_match.merged_from = Some(merged_from);
            timeline
                .set_match(scene.index, scene_match.clone())
                .map_err(project_error)?;
            rematched.push(scene_match);
        }

        self.store
            .save_matches(project_id, &timeline.matches())
            .map_err(project_error)?;
        tracing::info!(project = project_id, rematched = rematched.len(), "Merged scenes re-matched");
        Ok(rematched)
    }

    /// Adjacent scene pairs that continue in the same episode.
    pub fn detect_continuity(&self, project_id: &str) -> SceneSyncResult<Vec<ContinuityPair>> {
        let timeline = self.timeline(project_id)?;
        Ok(detect_continuous_pairs(&timeline, &self.continuity))
    }

    /// Merge chains the project's continuity pairs would produce.
    pub fn merge_chains(&self, project_id: &str) -> SceneSyncResult<Vec<MergeChain>> {
        Ok(build_merge_chains(&self.detect_continuity(project_id)?))
    }

    /// Merge `chains` and persist the result. The backup is written before
    /// the new timeline so an interrupted merge can still be undone.
    pub fn merge(&self, project_id: &str, chains: &[MergeChain]) -> SceneSyncResult<MergeOutcome> {
        let timeline = self.timeline(project_id)?;
        let outcome = merge(&timeline, chains).map_err(merge_error)?;

        if let Some(backup) = outcome.backup.as_ref() {
            self.store
                .save_merge_backup(project_id, backup)
                .map_err(project_error)?;
            self.store
                .save_timeline(project_id, &outcome.timeline)
                .map_err(project_error)?;
        }
        Ok(outcome)
    }

    /// Detect continuity and merge every chain found.
    pub fn merge_continuous(&self, project_id: &str) -> SceneSyncResult<MergeOutcome> {
        let chains = self.merge_chains(project_id)?;
        self.merge(project_id, &chains)
    }

    /// Restore the original scenes behind merged scene `scene_index`.
    /// The backup is removed once no merged scene remains.
    pub fn undo_merge(&self, project_id: &str, scene_index: usize) -> SceneSyncResult<UndoOutcome> {
        let timeline = self.timeline(project_id)?;
        let backup = self
            .store
            .load_merge_backup(project_id)
            .map_err(project_error)?
            .ok_or_else(|| merge_error(MergeError::NoBackup))?;

        let outcome = undo_merge(&timeline, scene_index, &backup).map_err(merge_error)?;
        self.store
            .save_timeline(project_id, &outcome.timeline)
            .map_err(project_error)?;
        if outcome.remaining_merged == 0 {
            self.store
                .clear_merge_backup(project_id)
                .map_err(project_error)?;
        }
        Ok(outcome)
    }

    /// Gap snapshots for every matched scene.
    pub fn calculate_gaps(&self, project_id: &str, timings: &[SceneTiming]) -> SceneSyncResult<Vec<GapInfo>> {
        let timeline = self.timeline(project_id)?;
        Ok(calculate_gaps(&timeline, timings, self.gaps.config()))
    }

    /// Gap state of one scene, with candidates when it has a gap.
    pub async fn gap_candidates(
        &self,
        project_id: &str,
        scene_index: usize,
        target_duration: Seconds,
    ) -> SceneSyncResult<GapResolution> {
        let timeline = self.timeline(project_id)?;
        let scene_match = matched_scene(&timeline, scene_index)?;
        let info = GapInfo::compute(scene_index, scene_match, target_duration, self.gaps.config())
            .ok_or_else(|| gap_error(GapError::InvalidTarget(target_duration)))?;
        self.gaps.prepare(info).await
    }

    /// Apply candidate `position` of `resolution` to its scene and persist
    /// the retimed match.
    pub fn resolve_gap(
        &self,
        project_id: &str,
        resolution: &mut GapResolution,
        position: usize,
    ) -> SceneSyncResult<SceneMatch> {
        let mut timeline = self.timeline(project_id)?;
        let scene_index = resolution.info().scene_index;
        let current = matched_scene(&timeline, scene_index)?;

        let retimed = resolution.resolve(position, current).map_err(gap_error)?;
        self.replace_match(project_id, &mut timeline, retimed)
    }

    /// Promote alternative `position` of scene `scene_index`.
    pub fn select_alternative(
        &self,
        project_id: &str,
        scene_index: usize,
        position: usize,
    ) -> SceneSyncResult<SceneMatch> {
        let mut timeline = self.timeline(project_id)?;
        let mut scene_match = existing_match(&timeline, scene_index)?.clone();
        scene_match
            .select_alternative(position)
            .map_err(project_error)?;
        self.replace_match(project_id, &mut timeline, scene_match)
    }

    pub fn confirm_match(&self, project_id: &str, scene_index: usize) -> SceneSyncResult<SceneMatch> {
        let mut timeline = self.timeline(project_id)?;
        let mut scene_match = existing_match(&timeline, scene_index)?.clone();
        scene_match.confirm();
        self.replace_match(project_id, &mut timeline, scene_match)
    }

    /// Split scene `scene_index` at `at`. Both halves need re-matching.
    pub fn split_scene(&self, project_id: &str, scene_index: usize, at: Seconds) -> SceneSyncResult<SceneTimeline> {
        let mut timeline = self.timeline(project_id)?;
        if timeline.has_merged_scenes() {
            return Err(SceneSyncError::invalid_input(
                "cannot split while merged scenes exist; undo the merge first",
            ));
        }
        timeline.split_scene(scene_index, at).map_err(project_error)?;
        self.store
            .save_timeline(project_id, &timeline)
            .map_err(project_error)?;

        tracing::info!(project = project_id, scene = scene_index, at = %at, "Scene split");
        Ok(timeline)
    }

    fn replace_match(
        &self,
        project_id: &str,
        timeline: &mut SceneTimeline,
        scene_match: SceneMatch,
    ) -> SceneSyncResult<SceneMatch> {
        let scene_index = scene_match.scene_index;
        timeline
            .set_match(scene_index, scene_match.clone())
            .map_err(project_error)?;
        self.store
            .save_matches(project_id, &timeline.matches())
            .map_err(project_error)?;
        Ok(scene_match)
    }
}

fn existing_match(timeline: &SceneTimeline, scene_index: usize) -> SceneSyncResult<&SceneMatch> {
    timeline
        .match_at(scene_index)
        .ok_or_else(|| SceneSyncError::invalid_input(format!("scene {scene_index} has no match")))
}

fn matched_scene(timeline: &SceneTimeline, scene_index: usize) -> SceneSyncResult<&SceneMatch> {
    let scene_match = existing_match(timeline, scene_index)?;
    if !scene_match.is_matched() {
        return Err(SceneSyncError::invalid_input(format!("scene {scene_index} is unmatched")));
    }
    Ok(scene_match)
}

fn project_error(e: ProjectError) -> SceneSyncError {
    SceneSyncError::project(e.to_string())
}

fn merge_error(e: MergeError) -> SceneSyncError {
    SceneSyncError::continuity(e.to_string())
}

fn gap_error(e: GapError) -> SceneSyncError {
    SceneSyncError::gap(e.to_string())
}
