//! SceneSync Pipeline
//!
//! Async orchestration over the pure computations in
//! `scenesync-processing-core`:
//! - **Index:** the similarity index, loaded once per library
//! - **Matching:** anchor-frame extraction and search for each scene,
//!   streamed batch matching and re-matching of merged scenes
//! - **Gaps:** candidate generation against the source video's real cuts
//! - **Service:** [`SceneSyncService`], the single owner of shared state

pub mod gaps;
pub mod index;
pub mod matching;
pub mod service;
pub mod sources;

pub use gaps::GapResolver;
pub use index::{IndexHandle, IndexLoader, SimilarityIndex};
pub use matching::{MatchEvent, SceneMatcher, SourceScope};
pub use service::{SceneSyncService, ServiceParts};
pub use sources::{DirectorySourceLibrary, SourceLibrary};
