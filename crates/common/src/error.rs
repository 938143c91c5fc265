//! Error types shared across SceneSync crates.

use std::path::PathBuf;

/// Top-level error type for SceneSync operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneSyncError {
    #[error("Matching error: {message}")]
    Matching { message: String },

    #[error("Continuity error: {message}")]
    Continuity { message: String },

    #[error("Gap resolution error: {message}")]
    Gap { message: String },

    #[error("Media tool error: {message}")]
    Media { message: String },

    #[error("Similarity index error: {message}")]
    Index { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SceneSyncError.
pub type SceneSyncResult<T> = Result<T, SceneSyncError>;

impl SceneSyncError {
    pub fn matching(msg: impl Into<String>) -> Self {
        Self::Matching {
            message: msg.into(),
        }
    }

    pub fn continuity(msg: impl Into<String>) -> Self {
        Self::Continuity {
            message: msg.into(),
        }
    }

    pub fn gap(msg: impl Into<String>) -> Self {
        Self::Gap {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Whether this error came from an external collaborator (tool or index)
    /// and should degrade into an empty per-unit result instead of aborting.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Media { .. } | Self::Index { .. } | Self::Io(_) | Self::FileNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_classification() {
        assert!(SceneSyncError::media("ffmpeg exited with 1").is_external());
        assert!(SceneSyncError::index("index not loaded").is_external());
        assert!(!SceneSyncError::continuity("not adjacent").is_external());
        assert!(!SceneSyncError::invalid_input("empty scene list").is_external());
    }

    #[test]
    fn test_display_includes_message() {
        let err = SceneSyncError::gap("target duration must be positive");
        assert_eq!(
            err.to_string(),
            "Gap resolution error: target duration must be positive"
        );
    }
}
