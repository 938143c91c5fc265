//! Undo one merged scene.

use std::path::PathBuf;

use scenesync_common::AppConfig;

use super::service;

pub fn run(config: &AppConfig, library: PathBuf, project: &str, scene: usize) -> anyhow::Result<()> {
    let outcome = service(config, library).undo_merge(project, scene)?;

    println!(
        "Restored scene {scene}; timeline now has {} scene(s)",
        outcome.timeline.len()
    );
    if outcome.remaining_merged > 0 {
        println!("  {} merged scene(s) remain", outcome.remaining_merged);
    } else {
        println!("  No merged scenes remain; backup removed");
    }
    Ok(())
}
