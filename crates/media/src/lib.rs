//! SceneSync Media
//!
//! Everything that shells out to ffmpeg or ffprobe:
//! - **Probe:** exact frame rate and duration of a source video
//! - **Scene cuts:** shot boundary detection, cached per source in memory
//!   and on disk, with concurrent requests for one source sharing a single
//!   detection run
//! - **Frames:** single-frame extraction for similarity search
//!
//! External processes are spawned with `tokio::process`; no lock is held
//! while one runs.

pub mod cut_cache;
pub mod frames;
pub mod probe;
pub mod scene_cuts;

mod process;

pub use cut_cache::SceneCutService;
pub use frames::{FfmpegFrameExtractor, FrameExtractor};
pub use probe::{CachedProbe, FfprobeProbe, MediaProbe};
pub use scene_cuts::{normalize_cuts, FfmpegSceneCutDetector, SceneCutDetector, SceneCutParams};
