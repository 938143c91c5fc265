//! Store the scene list of a project.

use std::path::PathBuf;

use scenesync_common::AppConfig;
use scenesync_project_model::Scene;

use super::{read_json, service};

pub fn run(config: &AppConfig, library: PathBuf, project: &str, scenes: PathBuf) -> anyhow::Result<()> {
    let scenes: Vec<Scene> = read_json(&scenes)?;
    let timeline = service(config, library).import_scenes(project, scenes)?;

    println!("Imported {} scene(s) into project '{project}'", timeline.len());
    if let Some(last) = timeline.entries().last() {
        println!("  Duration: {}", last.scene.end_time);
    }
    Ok(())
}
