//! Report timing gaps of every matched scene.

use std::path::PathBuf;

use scenesync_common::AppConfig;
use scenesync_project_model::SceneTiming;
use scenesync_timebase::fraction;

use super::{read_json, service};

pub fn run(config: &AppConfig, library: PathBuf, project: &str, timings: Option<PathBuf>) -> anyhow::Result<()> {
    let timings: Vec<SceneTiming> = match timings {
        Some(path) => read_json(&path)?,
        None => vec![],
    };
    let gaps = service(config, library).calculate_gaps(project, &timings)?;

    if gaps.is_empty() {
        println!("No matched scenes in project '{project}'");
        return Ok(());
    }

    for gap in &gaps {
        println!(
            "Scene {:>3}  {:<10} source {:>9}  target {:>9}  speed {:.3}x -> {:.3}x  {}",
            gap.scene_index,
            gap.episode,
            gap.source_duration.to_string(),
            gap.target_duration.to_string(),
            fraction::to_f64(&gap.current_speed),
            fraction::to_f64(&gap.effective_speed),
            if gap.has_gap() {
                format!("gap {}", gap.gap_duration)
            } else {
                gap.state.to_string()
            }
        );
    }

    let with_gap = gaps.iter().filter(|g| g.has_gap()).count();
    println!("\n{with_gap} scene(s) with a gap");
    Ok(())
}
