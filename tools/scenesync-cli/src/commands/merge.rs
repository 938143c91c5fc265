//! Merge continuous scenes.

use std::path::PathBuf;

use scenesync_common::AppConfig;

use super::service;

pub fn run(config: &AppConfig, library: PathBuf, project: &str, dry_run: bool) -> anyhow::Result<()> {
    let service = service(config, library);
    let chains = service.merge_chains(project)?;

    if chains.is_empty() {
        println!("Nothing to merge in project '{project}'");
        return Ok(());
    }
    for chain in &chains {
        println!("  {:?} -> one scene in {}", chain.indices, chain.episode);
    }
    if dry_run {
        println!("\n{} chain(s) found (dry run)", chains.len());
        return Ok(());
    }

    let outcome = service.merge(project, &chains)?;
    println!(
        "\nMerged into {} scene(s); scenes {:?} need re-matching",
        outcome.timeline.len(),
        outcome.merged_indices
    );
    Ok(())
}
