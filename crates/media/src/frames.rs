//! Single-frame extraction.

use std::ffi::OsStr;
use std::path::Path;

use scenesync_common::{SceneSyncError, SceneSyncResult};
use scenesync_timebase::{fraction, Seconds};

use crate::process::run_tool;

/// Pulls still frames out of a video.
#[async_trait::async_trait]
pub trait FrameExtractor: Send + Sync {
    /// PNG-encoded frame shown at `at`.
    async fn extract_frame(&self, path: &Path, at: Seconds) -> SceneSyncResult<Vec<u8>>;
}

/// [`FrameExtractor`] that pipes one PNG frame out of ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    binary: String,
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait::async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frame(&self, path: &Path, at: Seconds) -> SceneSyncResult<Vec<u8>> {
        let timestamp = ffmpeg_timestamp(at);

        // -ss after -i decodes up to the exact frame instead of the nearest keyframe.
        let mut args: Vec<&OsStr> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-i"]
            .into_iter()
            .map(OsStr::new)
            .collect();
        args.push(path.as_os_str());
        args.extend(
            [
                "-ss",
                timestamp.as_str(),
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ]
            .map(OsStr::new),
        );

        let output = run_tool(&self.binary, args).await?;
        if output.stdout.is_empty() {
            return Err(SceneSyncError::media(format!(
                "no frame at {timestamp}s in {}",
                path.display()
            )));
        }

        tracing::trace!(path = %path.display(), at = %timestamp, bytes = output.stdout.len(), "Extracted frame");
        Ok(output.stdout)
    }
}

/// Microsecond-precision decimal for ffmpeg's `-ss`. Negative times clamp
/// to zero.
pub fn ffmpeg_timestamp(at: Seconds) -> String {
    let micros = fraction::round_to_decimals(&at.as_fraction(), 6).max(0);
    format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
}
