//! Whole-document project storage.
//!
//! Each project is a directory under the store root:
//!
//! ```text
//! <root>/<project-id>/
//!   scenes.json        scene list
//!   matches.json       match list
//!   merge_backup.json  pre-merge snapshot (only while merges are undoable)
//! ```
//!
//! Documents are always rewritten whole, through a temp file and a rename,
//! so a crash never leaves a half-written document behind.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backup::MergeBackup;
use crate::scene::Scene;
use crate::scene_match::SceneMatch;
use crate::timeline::SceneTimeline;

const DOCUMENT_VERSION: &str = "1.0";
const SCENES_FILE: &str = "scenes.json";
const MATCHES_FILE: &str = "matches.json";
const BACKUP_FILE: &str = "merge_backup.json";

/// `scenes.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenesDocument {
    pub version: String,
    pub scenes: Vec<Scene>,
}

/// `matches.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesDocument {
    pub version: String,
    pub matches: Vec<SceneMatch>,
}

/// Reads and writes project documents under a root directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one project. Rejects ids that would escape the root.
    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf, ProjectError> {
        let valid = !project_id.is_empty()
            && project_id != "."
            && project_id != ".."
            && !project_id.contains(['/', '\\']);
        if !valid {
            return Err(ProjectError::ValidationError {
                message: format!("invalid project id '{project_id}'"),
            });
        }
        Ok(self.root.join(project_id))
    }

    pub fn exists(&self, project_id: &str) -> bool {
        self.project_dir(project_id)
            .map(|dir| dir.is_dir())
            .unwrap_or(false)
    }

    pub fn load_scenes(&self, project_id: &str) -> Result<Option<Vec<Scene>>, ProjectError> {
        let path = self.project_dir(project_id)?.join(SCENES_FILE);
        Ok(read_document::<ScenesDocument>(&path)?.map(|doc| doc.scenes))
    }

    pub fn save_scenes(&self, project_id: &str, scenes: &[Scene]) -> Result<(), ProjectError> {
        let path = self.project_dir(project_id)?.join(SCENES_FILE);
        write_document(
            &path,
            &ScenesDocument {
                version: DOCUMENT_VERSION.to_string(),
                scenes: scenes.to_vec(),
            },
        )
    }

    pub fn load_matches(&self, project_id: &str) -> Result<Option<Vec<SceneMatch>>, ProjectError> {
        let path = self.project_dir(project_id)?.join(MATCHES_FILE);
        Ok(read_document::<MatchesDocument>(&path)?.map(|doc| doc.matches))
    }

    pub fn save_matches(
        &self,
        project_id: &str,
        matches: &[SceneMatch],
    ) -> Result<(), ProjectError> {
        let path = self.project_dir(project_id)?.join(MATCHES_FILE);
        write_document(
            &path,
            &MatchesDocument {
                version: DOCUMENT_VERSION.to_string(),
                matches: matches.to_vec(),
            },
        )
    }

    /// Scenes paired with matches. `None` when the project has no scenes yet.
    pub fn load_timeline(&self, project_id: &str) -> Result<Option<SceneTimeline>, ProjectError> {
        let Some(scenes) = self.load_scenes(project_id)? else {
            return Ok(None);
        };
        let matches = self.load_matches(project_id)?.unwrap_or_default();
        SceneTimeline::from_parts(scenes, matches).map(Some)
    }

    /// Write both the scene and match documents of `timeline`.
    pub fn save_timeline(
        &self,
        project_id: &str,
        timeline: &SceneTimeline,
    ) -> Result<(), ProjectError> {
        self.save_scenes(project_id, &timeline.scenes())?;
        self.save_matches(project_id, &timeline.matches())
    }

    /// The merge backup, or `None` when absent or unreadable.
    ///
    /// A corrupt backup is treated as absent: undo becomes unavailable
    /// instead of failing the request.
    pub fn load_merge_backup(&self, project_id: &str) -> Result<Option<MergeBackup>, ProjectError> {
        let path = self.project_dir(project_id)?.join(BACKUP_FILE);
        match read_document::<MergeBackup>(&path) {
            Ok(backup) => Ok(backup),
            Err(ProjectError::ParseError { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "Ignoring corrupt merge backup");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_merge_backup(
        &self,
        project_id: &str,
        backup: &MergeBackup,
    ) -> Result<(), ProjectError> {
        let path = self.project_dir(project_id)?.join(BACKUP_FILE);
        write_document(&path, backup)
    }

    pub fn clear_merge_backup(&self, project_id: &str) -> Result<(), ProjectError> {
        let path = self.project_dir(project_id)?.join(BACKUP_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProjectError::IoError { path, source: e }),
        }
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ProjectError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ProjectError::IoError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
}

fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_string_pretty(document).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_atomic(path, json.as_bytes())
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ProjectError> {
    let io_err = |path: &Path, source: std::io::Error| ProjectError::IoError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes).map_err(|e| io_err(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::MergeChain;
    use scenesync_timebase::Seconds;

    fn temp_store(name: &str) -> (ProjectStore, PathBuf) {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        (ProjectStore::new(&dir), dir)
    }

    fn sample_scenes() -> Vec<Scene> {
        vec![
            Scene::new(0, Seconds::parse("0").unwrap(), Seconds::parse("1.5").unwrap()),
            Scene::new(1, Seconds::parse("1.5").unwrap(), Seconds::parse("4.0").unwrap()),
        ]
    }

    #[test]
    fn test_missing_documents_load_as_none() {
        let (store, dir) = temp_store("scenesync_test_store_missing");
        assert!(store.load_scenes("p1").unwrap().is_none());
        assert!(store.load_matches("p1").unwrap().is_none());
        assert!(store.load_timeline("p1").unwrap().is_none());
        assert!(store.load_merge_backup("p1").unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_load_timeline() {
        let (store, dir) = temp_store("scenesync_test_store_timeline");
        let mut m = SceneMatch::unmatched(1);
        m.episode = "ep05".to_string();
        m.start_time = Seconds::parse("100.25").unwrap();
        m.end_time = Seconds::parse("102.75").unwrap();
        m.confidence = 0.8;
        let timeline = SceneTimeline::from_parts(sample_scenes(), vec![m]).unwrap();

        store.save_timeline("p1", &timeline).unwrap();
        let loaded = store.load_timeline("p1").unwrap().unwrap();

        assert_eq!(loaded, timeline);
        assert!(!dir.join("p1").join("scenes.json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_backup_is_treated_as_absent() {
        let (store, dir) = temp_store("scenesync_test_store_corrupt");
        let project_dir = store.project_dir("p1").unwrap();
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("merge_backup.json"), "{\"scenes\": [").unwrap();

        assert!(store.load_merge_backup("p1").unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_backup_save_and_clear() {
        let (store, dir) = temp_store("scenesync_test_store_backup");
        let timeline = SceneTimeline::new(sample_scenes());
        let backup = MergeBackup::capture(
            &timeline,
            &[MergeChain {
                indices: vec![0, 1],
                episode: "ep01".to_string(),
            }],
        );

        store.save_merge_backup("p1", &backup).unwrap();
        assert_eq!(store.load_merge_backup("p1").unwrap(), Some(backup));

        store.clear_merge_backup("p1").unwrap();
        assert!(store.load_merge_backup("p1").unwrap().is_none());
        store.clear_merge_backup("p1").unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_project_id_cannot_escape_root() {
        let store = ProjectStore::new("/tmp/scenesync");
        assert!(store.project_dir("../etc").is_err());
        assert!(store.project_dir("a/b").is_err());
        assert!(store.project_dir("").is_err());
        assert!(store.project_dir("episode-42").is_ok());
    }
}
