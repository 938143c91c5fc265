//! Cached, deduplicated scene-cut detection.
//!
//! Lookup order for a source video:
//!
//! 1. In-memory map keyed by the resolved path.
//! 2. `<cache_dir>/<hash>.cuts.json` written by an earlier run.
//! 3. The detector, behind a semaphore bounding how many different
//!    sources are analysed at once.
//!
//! Concurrent requests for one source share a single `OnceCell`: the first
//! caller runs steps 2 and 3, the others wait for its result. The map
//! mutex is only held to fetch or insert that cell.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{OnceCell, Semaphore};

use scenesync_common::{SceneSyncError, SceneSyncResult};
use scenesync_timebase::Seconds;

use crate::probe::resolve_path;
use crate::scene_cuts::{SceneCutDetector, SceneCutParams};

type CutList = Arc<Vec<Seconds>>;

/// On-disk form of one detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CutCacheFile {
    source: PathBuf,
    threshold: f64,
    min_scene_len: Seconds,
    cuts: Vec<Seconds>,
}

/// Scene cuts per source video, detected at most once per process.
pub struct SceneCutService<D> {
    detector: D,
    params: SceneCutParams,
    cache_dir: Option<PathBuf>,
    entries: Mutex<HashMap<PathBuf, Arc<OnceCell<CutList>>>>,
    permits: Semaphore,
}

impl<D: SceneCutDetector> SceneCutService<D> {
    /// `max_concurrent` is clamped to at least one.
    pub fn new(detector: D, params: SceneCutParams, max_concurrent: usize) -> Self {
        Self {
            detector,
            params,
            cache_dir: None,
            entries: Mutex::new(HashMap::new()),
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Persist results under `cache_dir` and reuse them across runs.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn params(&self) -> &SceneCutParams {
        &self.params
    }

    /// Cut list of `path`, detecting it if nobody has yet.
    ///
    /// A failed detection is not cached; the next request tries again.
    pub async fn cuts(&self, path: &Path) -> SceneSyncResult<CutList> {
        let key = resolve_path(path).await;
        let cell = self.cell_for(&key)?;

        let cuts = cell
            .get_or_try_init(|| self.load_or_detect(&key))
            .await?
            .clone();
        Ok(cuts)
    }

    /// Whether `path` is already in the in-memory cache.
    pub async fn is_cached(&self, path: &Path) -> bool {
        let key = resolve_path(path).await;
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&key).map(|cell| cell.initialized()))
            .unwrap_or(false)
    }

    fn cell_for(&self, key: &Path) -> SceneSyncResult<Arc<OnceCell<CutList>>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SceneSyncError::media("scene cut cache lock poisoned"))?;
        Ok(entries.entry(key.to_path_buf()).or_default().clone())
    }

    async fn load_or_detect(&self, key: &Path) -> SceneSyncResult<CutList> {
        if let Some(cuts) = self.read_disk(key).await {
            tracing::debug!(path = %key.display(), "Scene cuts loaded from disk cache");
            return Ok(Arc::new(cuts));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SceneSyncError::media("scene cut detector is shut down"))?;

        tracing::info!(path = %key.display(), "Detecting scene cuts");
        let cuts = self.detector.detect(key, &self.params).await?;
        self.write_disk(key, &cuts).await;
        Ok(Arc::new(cuts))
    }

    fn disk_path(&self, key: &Path) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let fingerprint = format!(
            "{}|{}|{}",
            key.display(),
            self.params.threshold,
            self.params.min_scene_len
        );
        Some(dir.join(format!("{:016x}.cuts.json", fnv1a_64(&fingerprint))))
    }

    /// A missing, unreadable or mismatched file is a miss.
    async fn read_disk(&self, key: &Path) -> Option<Vec<Seconds>> {
        let file = self.disk_path(key)?;
        let content = tokio::fs::read_to_string(&file).await.ok()?;

        let cached: CutCacheFile = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Ignoring malformed scene cut cache");
                return None;
            }
        };

        let usable = cached.source == key
            && cached.threshold == self.params.threshold
            && cached.min_scene_len == self.params.min_scene_len
            && cached.cuts.len() >= 2
            && cached.cuts.windows(2).all(|w| w[0] < w[1]);
        usable.then_some(cached.cuts)
    }

    async fn write_disk(&self, key: &Path, cuts: &[Seconds]) {
        let Some(file) = self.disk_path(key) else {
            return;
        };
        let document = CutCacheFile {
            source: key.to_path_buf(),
            threshold: self.params.threshold,
            min_scene_len: self.params.min_scene_len,
            cuts: cuts.to_vec(),
        };

        if let Err(e) = write_json_atomic(&file, &document).await {
            tracing::warn!(file = %file.display(), error = %e, "Failed to persist scene cuts");
        }
    }
}

async fn write_json_atomic(file: &Path, document: &CutCacheFile) -> SceneSyncResult<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(document)?;
    let tmp = file.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, file).await?;
    Ok(())
}

/// FNV-1a, stable across runs and platforms.
fn fnv1a_64(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
