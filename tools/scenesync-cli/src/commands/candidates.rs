//! Propose, and optionally apply, gap-filling excerpts.

use std::path::PathBuf;

use scenesync_common::AppConfig;
use scenesync_processing_core::GapState;
use scenesync_timebase::fraction;

use super::{parse_seconds, service};

pub async fn run(
    config: &AppConfig,
    library: PathBuf,
    project: &str,
    scene: usize,
    target: &str,
    apply: Option<usize>,
) -> anyhow::Result<()> {
    let target = parse_seconds(target, "target duration")?;
    let service = service(config, library);

    let mut resolution = service.gap_candidates(project, scene, target).await?;
    let info = resolution.info();
    println!(
        "Scene {scene}: {} {} - {} over {} at {:.3}x",
        info.episode,
        info.start_time,
        info.end_time,
        info.target_duration,
        fraction::to_f64(&info.current_speed)
    );

    if resolution.state() == GapState::NoGap {
        println!("  No gap; speed is within range");
        return Ok(());
    }

    for (position, candidate) in resolution.candidates().iter().enumerate() {
        println!("  [{position}] {}", candidate.rationale);
    }

    if let Some(position) = apply {
        let retimed = service.resolve_gap(project, &mut resolution, position)?;
        println!(
            "\nApplied [{position}]: {} - {} (speed ratio {})",
            retimed.start_time, retimed.end_time, retimed.speed_ratio
        );
    }
    Ok(())
}
