//! Offline matching from recorded per-anchor search results.

use std::path::PathBuf;

use serde::Deserialize;

use scenesync_common::AppConfig;
use scenesync_processing_core::{AnchorCandidates, MatcherConfig, TemporalMatcher};
use scenesync_project_model::{Scene, SceneMatch};
use scenesync_timebase::fraction;

use super::read_json;

#[derive(Deserialize)]
struct SceneAnchors {
    scene: Scene,
    #[serde(default)]
    candidates: AnchorCandidates,
}

pub fn run(config: &AppConfig, anchors: PathBuf, json: bool) -> anyhow::Result<()> {
    let records: Vec<SceneAnchors> = read_json(&anchors)?;
    let matcher = TemporalMatcher::new(MatcherConfig::from(&config.matching));

    let matches: Vec<SceneMatch> = records
        .iter()
        .map(|r| matcher.reconcile(&r.scene, &r.candidates))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    for (record, m) in records.iter().zip(&matches) {
        let scene = &record.scene;
        if m.is_matched() {
            println!(
                "Scene {} ({} - {}): {} {} - {} confidence {:.2}, speed {:.3}x",
                scene.index,
                scene.start_time,
                scene.end_time,
                m.episode,
                m.start_time,
                m.end_time,
                m.confidence,
                fraction::to_f64(&m.speed_ratio)
            );
        } else {
            println!("Scene {} ({} - {}): no match", scene.index, scene.start_time, scene.end_time);
        }
        for alt in m.alternatives.iter().filter(|a| a.episode != m.episode) {
            println!(
                "    alt {} {} - {} confidence {:.2} ({} votes)",
                alt.episode, alt.start_time, alt.end_time, alt.confidence, alt.vote_count
            );
        }
    }

    let matched = matches.iter().filter(|m| m.is_matched()).count();
    println!("\n{matched}/{} scene(s) matched", matches.len());
    Ok(())
}
