use std::path::PathBuf;

use serde::Deserialize;

use scenesync_processing_core::{
    build_merge_chains, calculate_gaps, compute_raw_speed, compute_speed, detect_continuous_pairs,
    generate_candidates, merge, undo_merge, AnchorCandidates, ContinuityConfig, GapConfig,
    GapContext, GapInfo, GapState, TemporalMatcher,
};
use scenesync_project_model::{Scene, SceneMatch, SceneTiming, SceneTimeline};
use scenesync_timebase::{Fraction, FrameRate, Seconds};

#[derive(Deserialize)]
struct SceneAnchors {
    scene: Scene,
    candidates: AnchorCandidates,
}

fn load_fixture_anchors() -> Vec<SceneAnchors> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-project")
        .join("anchors.json");

    let content = std::fs::read_to_string(path).expect("fixture anchors should be readable");
    serde_json::from_str(&content).expect("fixture anchors should parse")
}

fn matched_timeline() -> SceneTimeline {
    let matcher = TemporalMatcher::with_defaults();
    let anchors = load_fixture_anchors();
    let scenes: Vec<Scene> = anchors.iter().map(|a| a.scene.clone()).collect();
    let matches: Vec<SceneMatch> = anchors
        .iter()
        .map(|a| matcher.reconcile(&a.scene, &a.candidates))
        .collect();
    SceneTimeline::from_parts(scenes, matches).expect("fixture timeline should be consistent")
}

fn secs(text: &str) -> Seconds {
    Seconds::parse(text).unwrap()
}

#[test]
fn fixture_scenes_match_expected_episodes() {
    let timeline = matched_timeline();
    assert!(timeline.validate().is_ok());

    let episodes: Vec<&str> = timeline
        .entries()
        .iter()
        .map(|e| e.scene_match.as_ref().unwrap().episode.as_str())
        .collect();
    assert_eq!(episodes, vec!["ep01", "ep01", "ep01", "ep02", ""]);

    let first = timeline.match_at(0).unwrap();
    assert_eq!(first.start_time, secs("100.0"));
    assert_eq!(first.end_time, secs("103.0"));
    assert_eq!(first.speed_ratio, Fraction::new(15, 14));
    assert_eq!(first.confidence, 1.0);

    let last = timeline.match_at(4).unwrap();
    assert_eq!(last.confidence, 0.0);
    assert!(!last.is_matched());
}

#[test]
fn fixture_merge_and_undo_round_trip() {
    let timeline = matched_timeline();

    let pairs = detect_continuous_pairs(&timeline, &ContinuityConfig::default());
    let chains = build_merge_chains(&pairs);
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].indices, vec![0, 1, 2]);
    assert_eq!(chains[0].episode, "ep01");

    let outcome = merge(&timeline, &chains).unwrap();
    assert_eq!(outcome.timeline.len(), 3);
    assert_eq!(outcome.merged_indices, vec![0]);
    assert!(outcome.timeline.validate().is_ok());
    let merged_scene = &outcome.timeline.entries()[0].scene;
    assert_eq!(merged_scene.start_time, Seconds::ZERO);
    assert_eq!(merged_scene.end_time, secs("6.5"));

    let backup = outcome.backup.expect("merge should produce a backup");
    let undone = undo_merge(&outcome.timeline, 0, &backup).unwrap();
    assert_eq!(undone.remaining_merged, 0);
    assert_eq!(undone.timeline, timeline);
}

#[test]
fn realtime_excerpt_on_ntsc_source_has_no_gap() {
    // 2.0s..3.0s of a 23.976 source placed on a 60fps sequence for 1.0s.
    let config = GapConfig {
        sequence_rate: Some(FrameRate::FPS_60),
        ..GapConfig::default()
    };
    let mut scene_match = SceneMatch::unmatched(0);
    scene_match.episode = "ep01".to_string();
    scene_match.start_time = secs("2.0");
    scene_match.end_time = secs("3.0");

    let info = GapInfo::compute(0, &scene_match, secs("1.0"), &config).unwrap();
    assert_eq!(info.effective_speed, Fraction::from_integer(1));
    assert_eq!(info.state, GapState::NoGap);

    let cuts = vec![Seconds::ZERO, secs("10")];
    let context = GapContext::from_info(&info, &cuts, FrameRate::FPS_23_976, secs("10"));
    let candidates = generate_candidates(&context, &config).unwrap();
    assert!(candidates.iter().all(|c| config.accepts(&c.speed)));
}

#[test]
fn short_excerpt_reports_exact_gap() {
    let raw = compute_raw_speed(secs("20.0"), secs("20.5"), secs("3.0")).unwrap();
    let effective = compute_speed(secs("20.0"), secs("20.5"), secs("3.0"), &GapConfig::default()).unwrap();
    assert_eq!(raw, Fraction::new(1, 6));
    assert_eq!(effective, Fraction::new(3, 4));

    let mut timeline = matched_timeline();
    let mut short = timeline.match_at(3).unwrap().clone();
    short.end_time = short.start_time + secs("0.5");
    timeline.set_match(3, short).unwrap();

    let gaps = calculate_gaps(
        &timeline,
        &[SceneTiming {
            scene_index: 3,
            target_duration: secs("3.0"),
        }],
        &GapConfig::default(),
    );
    let gap = gaps.iter().find(|g| g.scene_index == 3).unwrap();
    assert_eq!(gap.gap_duration, Seconds::from_ratio(7, 3).unwrap());
    assert!(gap.has_gap());
}

#[test]
fn independent_computations_agree_bit_for_bit() {
    let a = compute_raw_speed(secs("12.345678"), secs("14.000001"), secs("2.5")).unwrap();
    let b = compute_raw_speed(
        Seconds::from_f64(12.345678).unwrap(),
        Seconds::from_f64(14.000001).unwrap(),
        Seconds::from_f64(2.5).unwrap(),
    )
    .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.numer(), b.numer());
    assert_eq!(a.denom(), b.denom());
}
