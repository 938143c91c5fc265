//! Show the frame rate and duration of a video.

use std::path::PathBuf;

use scenesync_media::{FfprobeProbe, MediaProbe};

pub async fn run(video: PathBuf) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new();
    let rate = probe.frame_rate(&video).await?;
    let duration = probe.duration(&video).await?;

    println!("{}", video.display());
    println!("  Frame rate: {rate} ({})", rate.frame_duration());
    println!("  Duration:   {duration} ({} frames)", rate.seconds_to_frames(&duration.as_fraction()));
    Ok(())
}
