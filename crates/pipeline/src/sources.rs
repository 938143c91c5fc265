//! Mapping episode identifiers to source video files.

use std::path::{Path, PathBuf};

/// Locates the video file of a source episode.
pub trait SourceLibrary: Send + Sync {
    fn resolve(&self, episode: &str) -> Option<PathBuf>;
}

const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "mov", "webm", "avi"];

/// Episodes stored as `<root>/<episode>.<ext>`, optionally one directory
/// level down (`<root>/<series>/<episode>.<ext>`).
#[derive(Debug, Clone)]
pub struct DirectorySourceLibrary {
    root: PathBuf,
}

impl DirectorySourceLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find_in(dir: &Path, episode: &str) -> Option<PathBuf> {
        VIDEO_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{episode}.{ext}")))
            .find(|candidate| candidate.is_file())
    }
}

impl SourceLibrary for DirectorySourceLibrary {
    fn resolve(&self, episode: &str) -> Option<PathBuf> {
        if episode.is_empty() || episode.contains(['/', '\\']) || episode == ".." {
            return None;
        }

        if let Some(found) = Self::find_in(&self.root, episode) {
            return Some(found);
        }

        let mut subdirs: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();
        subdirs.iter().find_map(|dir| Self::find_in(dir, episode))
    }
}
