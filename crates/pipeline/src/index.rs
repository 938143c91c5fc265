//! Similarity index access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use scenesync_common::{SceneSyncError, SceneSyncResult};
use scenesync_project_model::MatchCandidate;

/// A frame-embedding search index over a library of source episodes.
#[async_trait::async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Up to `top_n` nearest source frames for `frame` (PNG bytes), best
    /// first. `series` restricts the search to one series.
    async fn search(
        &self,
        frame: &[u8],
        top_n: usize,
        allow_flip: bool,
        series: Option<&str>,
    ) -> SceneSyncResult<Vec<MatchCandidate>>;
}

/// Opens the index of a library directory.
#[async_trait::async_trait]
pub trait IndexLoader: Send + Sync {
    async fn load(&self, library: &Path) -> SceneSyncResult<Arc<dyn SimilarityIndex>>;
}

#[async_trait::async_trait]
impl<T: IndexLoader + ?Sized> IndexLoader for Box<T> {
    async fn load(&self, library: &Path) -> SceneSyncResult<Arc<dyn SimilarityIndex>> {
        (**self).load(library).await
    }
}

struct LoadedIndex {
    library: PathBuf,
    index: Arc<dyn SimilarityIndex>,
}

/// The process-wide index, loaded on first use.
///
/// Asking for the library that is already loaded returns the existing
/// index; a different library replaces it.
pub struct IndexHandle {
    loader: Box<dyn IndexLoader>,
    loaded: Mutex<Option<LoadedIndex>>,
}

impl IndexHandle {
    pub fn new(loader: impl IndexLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            loaded: Mutex::new(None),
        }
    }

    /// Index for `library`, loading it if needed.
    pub async fn get(&self, library: &Path) -> SceneSyncResult<Arc<dyn SimilarityIndex>> {
        let mut loaded = self.loaded.lock().await;

        if let Some(current) = loaded.as_ref() {
            if current.library == library {
                return Ok(current.index.clone());
            }
            tracing::info!(
                from = %current.library.display(),
                to = %library.display(),
                "Switching similarity index library"
            );
        }

        let index = self.loader.load(library).await.map_err(|e| match e {
            SceneSyncError::Index { .. } => e,
            other => SceneSyncError::index(format!(
                "failed to load index for {}: {other}",
                library.display()
            )),
        })?;
        tracing::info!(library = %library.display(), "Similarity index loaded");

        *loaded = Some(LoadedIndex {
            library: library.to_path_buf(),
            index: index.clone(),
        });
        Ok(index)
    }

    /// Library of the currently loaded index.
    pub async fn loaded_library(&self) -> Option<PathBuf> {
        self.loaded.lock().await.as_ref().map(|l| l.library.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptyIndex;

    #[async_trait::async_trait]
    impl SimilarityIndex for EmptyIndex {
        async fn search(
            &self,
            _frame: &[u8],
            _top_n: usize,
            _allow_flip: bool,
            _series: Option<&str>,
        ) -> SceneSyncResult<Vec<MatchCandidate>> {
            Ok(vec![])
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl IndexLoader for CountingLoader {
        async fn load(&self, library: &Path) -> SceneSyncResult<Arc<dyn SimilarityIndex>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if library.ends_with("missing") {
                return Err(SceneSyncError::FileNotFound {
                    path: library.to_path_buf(),
                });
            }
            Ok(Arc::new(EmptyIndex))
        }
    }

    #[tokio::test]
    async fn test_same_library_is_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let handle = IndexHandle::new(CountingLoader {
            loads: loads.clone(),
        });

        handle.get(Path::new("/library/a")).await.unwrap();
        handle.get(Path::new("/library/a")).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        handle.get(Path::new("/library/b")).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(handle.loaded_library().await, Some(PathBuf::from("/library/b")));
    }

    #[tokio::test]
    async fn test_load_failure_is_an_index_error() {
        let handle = IndexHandle::new(CountingLoader {
            loads: Arc::new(AtomicUsize::new(0)),
        });

        let err = handle.get(Path::new("/library/missing")).await.err().unwrap();
        assert!(matches!(err, SceneSyncError::Index { .. }));
        assert!(handle.loaded_library().await.is_none());
    }
}
