//! Gap resolution against real source videos.

use std::sync::Arc;

use scenesync_common::{SceneSyncError, SceneSyncResult};
use scenesync_media::{MediaProbe, SceneCutDetector, SceneCutService};
use scenesync_processing_core::{generate_candidates, GapConfig, GapContext, GapInfo, GapResolution, GapState};
use scenesync_timebase::Seconds;

use crate::sources::SourceLibrary;

/// Turns a [`GapInfo`] into a [`GapResolution`] with candidates, using the
/// source video's frame rate, duration and shot boundaries.
pub struct GapResolver {
    cuts: Arc<SceneCutService<Box<dyn SceneCutDetector>>>,
    probe: Arc<dyn MediaProbe>,
    library: Arc<dyn SourceLibrary>,
    config: GapConfig,
}

impl GapResolver {
    pub fn new(
        cuts: Arc<SceneCutService<Box<dyn SceneCutDetector>>>,
        probe: Arc<dyn MediaProbe>,
        library: Arc<dyn SourceLibrary>,
        config: GapConfig,
    ) -> Self {
        Self {
            cuts,
            probe,
            library,
            config,
        }
    }

    pub fn config(&self) -> &GapConfig {
        &self.config
    }

    /// Start resolving `info`. Scenes without a gap come back in the
    /// `NoGap` state with no candidates.
    ///
    /// Failing cut detection degrades to a single shot spanning the whole
    /// video, which leaves only the fallback extensions.
    pub async fn prepare(&self, info: GapInfo) -> SceneSyncResult<GapResolution> {
        let mut resolution = GapResolution::new(info);
        if resolution.state() != GapState::GapDetected {
            return Ok(resolution);
        }

        let info = resolution.info().clone();
        let source = self.library.resolve(&info.episode).ok_or_else(|| {
            SceneSyncError::media(format!("no source video for episode '{}'", info.episode))
        })?;

        let rate = self.probe.frame_rate(&source).await?;
        let duration = self.probe.duration(&source).await?;

        let cuts: Vec<Seconds> = match self.cuts.cuts(&source).await {
            Ok(cuts) => cuts.as_ref().clone(),
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    error = %e,
                    "Scene cut detection failed; using whole video as one shot"
                );
                vec![Seconds::ZERO, duration]
            }
        };

        let context = GapContext::from_info(&info, &cuts, rate, duration);
        let candidates = generate_candidates(&context, &self.config)
            .map_err(|e| SceneSyncError::gap(e.to_string()))?;

        tracing::info!(
            scene = info.scene_index,
            episode = %info.episode,
            candidates = candidates.len(),
            "Gap candidates generated"
        );

        resolution
            .set_candidates(candidates)
            .map_err(|e| SceneSyncError::gap(e.to_string()))?;
        Ok(resolution)
    }
}
