//! SceneSync Project Model
//!
//! Defines the core data contracts for SceneSync projects:
//! - **Scenes:** contiguous spans of the target clip
//! - **Matches:** where each scene was found in the source episodes
//! - **Timeline:** the ordered `(Scene, SceneMatch)` collection edited by
//!   merges, splits, and undo
//! - **Project store:** whole-document JSON snapshots keyed by project id
//!
//! All times are exact [`Seconds`](scenesync_timebase::Seconds); they are
//! written to JSON as numbers and re-read through the bounded-denominator
//! ingestion path.

pub mod backup;
pub mod project;
pub mod scene;
pub mod scene_match;
pub mod timeline;

pub use backup::*;
pub use project::*;
pub use scene::*;
pub use scene_match::*;
pub use timeline::*;
