//! Target-timeline scenes.

use serde::{Deserialize, Serialize};

use scenesync_timebase::Seconds;

/// A contiguous span on the target timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Position in the scene list. Rewritten by `SceneTimeline::reindex`.
    pub index: usize,

    pub start_time: Seconds,

    pub end_time: Seconds,
}

impl Scene {
    pub fn new(index: usize, start_time: Seconds, end_time: Seconds) -> Self {
        Self {
            index,
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> Seconds {
        self.end_time - self.start_time
    }

    pub fn midpoint(&self) -> Seconds {
        Seconds::midpoint(self.start_time, self.end_time)
    }

    pub fn contains(&self, at: Seconds) -> bool {
        at > self.start_time && at < self.end_time
    }
}

/// How long a scene must last on the output timeline, e.g. the length of
/// the narration line it illustrates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTiming {
    pub scene_index: usize,

    pub target_duration: Seconds,
}
