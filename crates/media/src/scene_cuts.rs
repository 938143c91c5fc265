//! Shot boundary detection.
//!
//! Detection runs ffmpeg's scene score filter over the whole video and
//! reads the timestamps of the frames it selects from `showinfo` output.

use std::ffi::OsStr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use scenesync_common::{SceneCutDefaults, SceneSyncError, SceneSyncResult};
use scenesync_timebase::Seconds;

use crate::probe::{FfprobeProbe, MediaProbe};
use crate::process::run_tool;

/// Detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCutParams {
    /// Scene score above which a frame starts a new shot, in `[0.0, 1.0]`.
    pub threshold: f64,

    /// Shots shorter than this are folded into their neighbour.
    pub min_scene_len: Seconds,
}

impl Default for SceneCutParams {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_scene_len: Seconds::from_millis(500),
        }
    }
}

impl From<&SceneCutDefaults> for SceneCutParams {
    fn from(defaults: &SceneCutDefaults) -> Self {
        let fallback = Self::default();
        Self {
            threshold: defaults.threshold.clamp(0.0, 1.0),
            min_scene_len: Seconds::from_f64(defaults.min_scene_len_secs)
                .unwrap_or(fallback.min_scene_len),
        }
    }
}

/// Finds shot boundaries in a source video.
#[async_trait::async_trait]
pub trait SceneCutDetector: Send + Sync {
    /// Sorted, unique cut times, including `0` and the video duration.
    async fn detect(&self, path: &Path, params: &SceneCutParams) -> SceneSyncResult<Vec<Seconds>>;
}

#[async_trait::async_trait]
impl<T: SceneCutDetector + ?Sized> SceneCutDetector for Box<T> {
    async fn detect(&self, path: &Path, params: &SceneCutParams) -> SceneSyncResult<Vec<Seconds>> {
        (**self).detect(path, params).await
    }
}

/// [`SceneCutDetector`] backed by ffmpeg's `select='gt(scene,T)'` filter.
pub struct FfmpegSceneCutDetector<P = FfprobeProbe> {
    binary: String,
    probe: P,
}

impl FfmpegSceneCutDetector<FfprobeProbe> {
    pub fn new() -> Self {
        Self::with_probe(FfprobeProbe::new())
    }
}

impl Default for FfmpegSceneCutDetector<FfprobeProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: MediaProbe> FfmpegSceneCutDetector<P> {
    pub fn with_probe(probe: P) -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            probe,
        }
    }

    /// Use a specific ffmpeg binary.
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait::async_trait]
impl<P: MediaProbe> SceneCutDetector for FfmpegSceneCutDetector<P> {
    async fn detect(&self, path: &Path, params: &SceneCutParams) -> SceneSyncResult<Vec<Seconds>> {
        let duration = self.probe.duration(path).await?;

        let filter = format!("select='gt(scene,{})',showinfo", params.threshold);
        let mut args: Vec<&OsStr> = ["-hide_banner", "-nostdin", "-i"]
            .into_iter()
            .map(OsStr::new)
            .collect();
        args.push(path.as_os_str());
        args.extend(["-vf", filter.as_str(), "-an", "-f", "null", "-"].map(OsStr::new));
        let output = run_tool(&self.binary, args).await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let raw = parse_showinfo_times(&stderr);
        let cuts = normalize_cuts(raw, duration, params.min_scene_len);

        tracing::info!(
            path = %path.display(),
            cuts = cuts.len(),
            duration = duration.to_f64(),
            threshold = params.threshold,
            "Scene cut detection finished"
        );

        if cuts.len() < 2 {
            return Err(SceneSyncError::media(format!(
                "scene detection produced no usable cuts for {}",
                path.display()
            )));
        }
        Ok(cuts)
    }
}

/// `pts_time:` values of every `showinfo` line.
pub fn parse_showinfo_times(stderr: &str) -> Vec<Seconds> {
    stderr
        .lines()
        .filter(|line| line.contains("showinfo"))
        .filter_map(|line| {
            let rest = &line[line.find("pts_time:")? + "pts_time:".len()..];
            let token = rest.split_whitespace().next()?;
            Seconds::parse(token).ok()
        })
        .collect()
}

/// Sort, deduplicate and bound raw cut times to `[0, duration]`, dropping
/// cuts that would leave a shot shorter than `min_len`. The result always
/// starts at `0` and ends at `duration`.
pub fn normalize_cuts(mut raw: Vec<Seconds>, duration: Seconds, min_len: Seconds) -> Vec<Seconds> {
    if !duration.is_positive() {
        return vec![];
    }

    raw.retain(|&cut| cut > Seconds::ZERO && cut < duration);
    raw.sort();
    raw.dedup();

    let mut cuts = vec![Seconds::ZERO];
    for cut in raw {
        let last = cuts.last().copied().unwrap_or(Seconds::ZERO);
        if cut - last >= min_len {
            cuts.push(cut);
        }
    }
    while cuts.len() > 1 && cuts.last().is_some_and(|&last| duration - last < min_len) {
        cuts.pop();
    }
    cuts.push(duration);
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(text: &str) -> Seconds {
        Seconds::parse(text).unwrap()
    }

    const SHOWINFO: &str = "\
[Parsed_showinfo_1 @ 0x55d] config in time_base: 1/24000, frame_rate: 24000/1001
[Parsed_showinfo_1 @ 0x55d] n:   0 pts:  96096 pts_time:4.004   duration:   1001
[Parsed_showinfo_1 @ 0x55d] n:   1 pts: 300300 pts_time:12.5125 duration:   1001
frame=    2 fps=0.0 q=-0.0 Lsize=N/A time=00:00:20.00 bitrate=N/A speed= 180x
[Parsed_showinfo_1 @ 0x55d] n:   2 pts: 301301 pts_time:12.554208 duration:   1001
";

    #[test]
    fn test_parse_showinfo_times() {
        let times = parse_showinfo_times(SHOWINFO);
        assert_eq!(times, vec![secs("4.004"), secs("12.5125"), secs("12.554208")]);
    }

    #[test]
    fn test_normalize_cuts_bounds_and_min_length() {
        let raw = parse_showinfo_times(SHOWINFO);
        let cuts = normalize_cuts(raw, secs("20"), secs("0.5"));
        assert_eq!(cuts, vec![Seconds::ZERO, secs("4.004"), secs("12.5125"), secs("20")]);
    }

    #[test]
    fn test_normalize_cuts_drops_cut_near_end() {
        let cuts = normalize_cuts(vec![secs("5"), secs("9.8")], secs("10"), secs("0.5"));
        assert_eq!(cuts, vec![Seconds::ZERO, secs("5"), secs("10")]);
    }

    #[test]
    fn test_normalize_cuts_without_detections() {
        assert_eq!(
            normalize_cuts(vec![], secs("10"), secs("0.5")),
            vec![Seconds::ZERO, secs("10")]
        );
        assert!(normalize_cuts(vec![secs("1")], Seconds::ZERO, secs("0.5")).is_empty());
    }

    proptest! {
        #[test]
        fn prop_normalized_cuts_are_sorted_and_bounded(
            raw_ms in proptest::collection::vec(-1_000i64..70_000, 0..40),
            min_ms in 0i64..2_000,
        ) {
            let duration = Seconds::from_integer(60);
            let raw = raw_ms.into_iter().map(Seconds::from_millis).collect();
            let cuts = normalize_cuts(raw, duration, Seconds::from_millis(min_ms));

            prop_assert_eq!(cuts.first().copied(), Some(Seconds::ZERO));
            prop_assert_eq!(cuts.last().copied(), Some(duration));
            for pair in cuts.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
