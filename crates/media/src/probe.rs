//! Frame-rate and duration probing.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scenesync_common::{SceneSyncError, SceneSyncResult};
use scenesync_timebase::{FrameRate, Seconds};

use crate::process::run_tool;

/// Reads stream properties of a source video.
#[async_trait::async_trait]
pub trait MediaProbe: Send + Sync {
    /// Exact frame rate of the first video stream, canonicalized.
    async fn frame_rate(&self, path: &Path) -> SceneSyncResult<FrameRate>;

    /// Container duration.
    async fn duration(&self, path: &Path) -> SceneSyncResult<Seconds>;
}

#[async_trait::async_trait]
impl<T: MediaProbe + ?Sized> MediaProbe for std::sync::Arc<T> {
    async fn frame_rate(&self, path: &Path) -> SceneSyncResult<FrameRate> {
        (**self).frame_rate(path).await
    }

    async fn duration(&self, path: &Path) -> SceneSyncResult<Seconds> {
        (**self).duration(path).await
    }
}

/// [`MediaProbe`] backed by `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffprobe binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait::async_trait]
impl MediaProbe for FfprobeProbe {
    async fn frame_rate(&self, path: &Path) -> SceneSyncResult<FrameRate> {
        let mut args: Vec<&OsStr> = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=r_frame_rate,avg_frame_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsStr::new)
        .collect();
        args.push(path.as_os_str());
        let output = run_tool(&self.binary, args).await?;

        let rate = parse_frame_rate_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(path = %path.display(), rate = %rate, "Probed frame rate");
        Ok(rate)
    }

    async fn duration(&self, path: &Path) -> SceneSyncResult<Seconds> {
        let mut args: Vec<&OsStr> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsStr::new)
        .collect();
        args.push(path.as_os_str());
        let output = run_tool(&self.binary, args).await?;

        parse_duration_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// First usable rate among the printed lines. ffprobe reports `0/0` for
/// streams without a rate.
pub fn parse_frame_rate_output(stdout: &str) -> SceneSyncResult<FrameRate> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "0/0")
        .find_map(|line| FrameRate::parse(line).ok())
        .ok_or_else(|| {
            SceneSyncError::media(format!("ffprobe reported no usable frame rate: {:?}", stdout.trim()))
        })
}

pub fn parse_duration_output(stdout: &str) -> SceneSyncResult<Seconds> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let duration = Seconds::parse(line)
        .map_err(|e| SceneSyncError::media(format!("ffprobe duration {line:?}: {e}")))?;
    if !duration.is_positive() {
        return Err(SceneSyncError::media(format!("ffprobe duration {line:?} is not positive")));
    }
    Ok(duration)
}

/// Canonical form of `path` used as a cache key. Falls back to the path as
/// given when it cannot be resolved.
pub(crate) async fn resolve_path(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Wraps a probe and remembers frame rates per resolved path.
pub struct CachedProbe<P> {
    inner: P,
    rates: Mutex<HashMap<PathBuf, FrameRate>>,
}

impl<P: MediaProbe> CachedProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            rates: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &Path) -> Option<FrameRate> {
        self.rates
            .lock()
            .ok()
            .and_then(|rates| rates.get(key).copied())
    }
}

#[async_trait::async_trait]
impl<P: MediaProbe> MediaProbe for CachedProbe<P> {
    async fn frame_rate(&self, path: &Path) -> SceneSyncResult<FrameRate> {
        let key = resolve_path(path).await;
        if let Some(rate) = self.cached(&key) {
            return Ok(rate);
        }

        let rate = self.inner.frame_rate(&key).await?;
        if let Ok(mut rates) = self.rates.lock() {
            rates.insert(key, rate);
        }
        Ok(rate)
    }

    async fn duration(&self, path: &Path) -> SceneSyncResult<Seconds> {
        self.inner.duration(path).await
    }
}
