//! Detect scene cuts of a video through the on-disk cache.

use std::path::PathBuf;

use scenesync_common::AppConfig;
use scenesync_media::{FfmpegSceneCutDetector, SceneCutParams, SceneCutService};

pub async fn run(config: &AppConfig, video: PathBuf) -> anyhow::Result<()> {
    let cuts = SceneCutService::new(
        FfmpegSceneCutDetector::new(),
        SceneCutParams::from(&config.scene_cuts),
        config.scene_cuts.max_concurrent,
    )
    .with_cache_dir(config.cache_dir.join("scene_cuts"));

    let found = cuts.cuts(&video).await?;
    println!("{}: {} cut(s)", video.display(), found.len());
    for pair in found.windows(2) {
        println!("  {} - {} ({})", pair[0], pair[1], pair[1] - pair[0]);
    }
    Ok(())
}
