//! Application configuration.
//!
//! Tuning values are stored as plain decimals here; the processing crates
//! convert them to exact fractions when they build their own configs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where project documents (scenes, matches, backups) live.
    pub projects_dir: PathBuf,

    /// Directory for persisted scene-cut detection results.
    pub cache_dir: PathBuf,

    /// Scene matcher tuning.
    pub matching: MatchingDefaults,

    /// Continuity merger tuning.
    pub continuity: ContinuityDefaults,

    /// Gap resolver tuning.
    pub gaps: GapDefaults,

    /// Scene-cut detector settings.
    pub scene_cuts: SceneCutDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Scene matcher parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingDefaults {
    /// Distance of the edge anchors from the scene boundaries (seconds).
    pub anchor_offset_secs: f64,

    /// Nearest neighbours requested per anchor frame.
    pub top_k: usize,

    /// Lowest accepted implied speed ratio.
    pub min_speed_ratio: f64,

    /// Highest accepted implied speed ratio.
    pub max_speed_ratio: f64,

    /// Weight of the start anchor similarity.
    pub start_weight: f64,

    /// Weight of the middle anchor similarity.
    pub mid_weight: f64,

    /// Weight of the end anchor similarity.
    pub end_weight: f64,

    /// Maximum bonus for a middle anchor sitting on the source midpoint.
    pub midpoint_bonus: f64,

    /// Alternatives kept per scene.
    pub max_alternatives: usize,

    /// Whether the index may match horizontally flipped frames.
    pub allow_flip: bool,
}

/// Continuity merger parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuityDefaults {
    /// Largest source-time jump still considered continuous (seconds).
    pub tolerance_secs: f64,

    /// Minimum confidence for a match to vote on continuity.
    pub min_confidence: f64,
}

/// Gap resolver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GapDefaults {
    /// Lowest playback speed before a gap is reported.
    pub speed_floor: f64,

    /// Highest playback speed a candidate may use.
    pub speed_ceiling: f64,

    /// Frames kept clear of a detected cut when extending an excerpt.
    pub safety_frames: u32,

    /// Frame rate of the output sequence target durations are snapped to.
    /// `None` keeps target durations unsnapped.
    pub sequence_fps: Option<f64>,
}

/// External scene-cut detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneCutDefaults {
    /// Detector sensitivity in `[0.0, 1.0]`.
    pub threshold: f64,

    /// Minimum shot length (seconds); cuts closer than this are dropped.
    pub min_scene_len_secs: f64,

    /// Number of different sources analysed at the same time.
    pub max_concurrent: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "scenesync=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: data_dir().join("projects"),
            cache_dir: cache_dir(),
            matching: MatchingDefaults::default(),
            continuity: ContinuityDefaults::default(),
            gaps: GapDefaults::default(),
            scene_cuts: SceneCutDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MatchingDefaults {
    fn default() -> Self {
        Self {
            anchor_offset_secs: 0.1,
            top_k: 5,
            min_speed_ratio: 0.70,
            max_speed_ratio: 1.60,
            start_weight: 1.0,
            mid_weight: 0.8,
            end_weight: 1.0,
            midpoint_bonus: 0.10,
            max_alternatives: 5,
            allow_flip: true,
        }
    }
}

impl Default for ContinuityDefaults {
    fn default() -> Self {
        Self {
            tolerance_secs: 2.0,
            min_confidence: 0.5,
        }
    }
}

impl Default for GapDefaults {
    fn default() -> Self {
        Self {
            speed_floor: 0.75,
            speed_ceiling: 1.60,
            safety_frames: 3,
            sequence_fps: None,
        }
    }
}

impl Default for SceneCutDefaults {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_scene_len_secs: 0.5,
            max_concurrent: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"])
        .join("scenesync")
        .join("config.json")
}

fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"]).join("scenesync")
}

fn cache_dir() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", &[".cache"]).join("scenesync")
}

fn xdg_dir(var: &str, home_fallback: &[&str]) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        home_fallback
            .iter()
            .fold(PathBuf::from(home), |path, part| path.join(part))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tuning_constants() {
        let config = AppConfig::default();
        assert_eq!(config.matching.top_k, 5);
        assert!((config.matching.midpoint_bonus - 0.10).abs() < 1e-12);
        assert!((config.gaps.speed_floor - 0.75).abs() < 1e-12);
        assert_eq!(config.gaps.safety_frames, 3);
        assert_eq!(config.scene_cuts.max_concurrent, 2);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "gaps": { "speed_floor": 0.8 } }"#).unwrap();
        assert!((parsed.gaps.speed_floor - 0.8).abs() < 1e-12);
        assert!((parsed.gaps.speed_ceiling - 1.60).abs() < 1e-12);
        assert_eq!(parsed.matching.max_alternatives, 5);
    }

    #[test]
    fn test_load_from_invalid_file_falls_back() {
        let path = std::env::temp_dir().join("scenesync_test_bad_config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.continuity.tolerance_secs, 2.0);

        std::fs::remove_file(&path).ok();
    }
}
