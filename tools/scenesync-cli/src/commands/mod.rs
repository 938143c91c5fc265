pub mod candidates;
pub mod continuity;
pub mod cuts;
pub mod gaps;
pub mod import;
pub mod merge;
pub mod probe;
pub mod reconcile;
pub mod speed;
pub mod undo;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;

use scenesync_common::{AppConfig, SceneSyncError, SceneSyncResult};
use scenesync_pipeline::{DirectorySourceLibrary, IndexLoader, SceneSyncService, ServiceParts, SimilarityIndex};
use scenesync_timebase::Seconds;

/// The CLI ships without an embedding index; commands that need one fail
/// with an index error.
struct NoIndex;

#[async_trait::async_trait]
impl IndexLoader for NoIndex {
    async fn load(&self, library: &Path) -> SceneSyncResult<Arc<dyn SimilarityIndex>> {
        Err(SceneSyncError::index(format!(
            "no similarity index available for {}",
            library.display()
        )))
    }
}

pub fn service(config: &AppConfig, library: PathBuf) -> SceneSyncService {
    SceneSyncService::new(
        config,
        ServiceParts::ffmpeg(NoIndex, DirectorySourceLibrary::new(library)),
    )
}

pub fn parse_seconds(text: &str, what: &str) -> anyhow::Result<Seconds> {
    Seconds::parse(text).map_err(|e| anyhow::anyhow!("Invalid {what} '{text}': {e}"))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
