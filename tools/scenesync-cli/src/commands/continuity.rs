//! List continuous scene pairs and the chains they form.

use std::path::PathBuf;

use scenesync_common::AppConfig;
use scenesync_processing_core::build_merge_chains;

use super::service;

pub fn run(config: &AppConfig, library: PathBuf, project: &str) -> anyhow::Result<()> {
    let service = service(config, library);
    let pairs = service.detect_continuity(project)?;

    if pairs.is_empty() {
        println!("No continuous scenes in project '{project}'");
        return Ok(());
    }

    println!("Continuous pairs:");
    for pair in &pairs {
        println!(
            "  {} -> {} in {} (jump {})",
            pair.left, pair.right, pair.episode, pair.gap
        );
    }

    println!("\nMerge chains:");
    for chain in build_merge_chains(&pairs) {
        println!("  {:?} in {}", chain.indices, chain.episode);
    }
    Ok(())
}
