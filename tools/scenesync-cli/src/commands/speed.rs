//! Exact playback speed of a source excerpt.

use scenesync_common::AppConfig;
use scenesync_processing_core::{compute_raw_speed, compute_speed, GapConfig};
use scenesync_timebase::{fraction, FrameRate};

use super::parse_seconds;

pub fn run(
    config: &AppConfig,
    start: &str,
    end: &str,
    target: &str,
    sequence_fps: Option<&str>,
) -> anyhow::Result<()> {
    let start = parse_seconds(start, "start")?;
    let end = parse_seconds(end, "end")?;
    let target = parse_seconds(target, "target duration")?;

    let mut gap_config = GapConfig::from(&config.gaps);
    if let Some(fps) = sequence_fps {
        let rate = FrameRate::parse(fps).map_err(|e| anyhow::anyhow!("Invalid sequence fps '{fps}': {e}"))?;
        gap_config.sequence_rate = Some(rate);
    }
    let target = gap_config.snap_target(target);

    let raw = compute_raw_speed(start, end, target)
        .ok_or_else(|| anyhow::anyhow!("Target duration must be positive and end must not precede start"))?;
    let effective = compute_speed(start, end, target, &gap_config)
        .ok_or_else(|| anyhow::anyhow!("Target duration must be positive and end must not precede start"))?;

    println!("Excerpt: {start} - {end} ({})", end - start);
    println!("Target:  {target}");
    println!("Raw speed:       {raw} ({:.6}x)", fraction::to_f64(&raw));
    println!("Effective speed: {effective} ({:.6}x)", fraction::to_f64(&effective));
    if raw < gap_config.speed_floor {
        println!(
            "Gap: {} of footage missing at {:.2}x",
            target - (end - start) / effective,
            fraction::to_f64(&gap_config.speed_floor)
        );
    }

    Ok(())
}
