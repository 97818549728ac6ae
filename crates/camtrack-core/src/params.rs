use serde::{Deserialize, Serialize};

/// How detections are associated with existing tracks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Each detection takes the first gated track in creation order. Several
    /// detections of one frame may land on the same track.
    #[default]
    Greedy,
    /// Minimum-cost one-to-one assignment per frame; a track absorbs at most
    /// one detection and vice versa.
    Exclusive,
}

/// Correspondence thresholds and track bookkeeping limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Maximum distance in pixels between a track and a matching detection.
    pub max_distance: f64,
    /// Maximum difference of summed extents (`height + width`) in pixels.
    pub max_size_diff: f64,
    /// A track is dropped once its miss count exceeds this value.
    pub eviction_limit: u32,
    /// Number of observations kept per track.
    pub history_len: usize,
    pub policy: MatchPolicy,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            max_distance: 15.0,
            max_size_diff: 10.0,
            eviction_limit: 10,
            history_len: 10,
            policy: MatchPolicy::Greedy,
        }
    }
}

impl TrackerParams {
    #[inline]
    pub fn max_distance_sq(&self) -> f64 {
        self.max_distance * self.max_distance
    }

    #[inline]
    pub fn max_size_diff_sq(&self) -> f64 {
        self.max_size_diff * self.max_size_diff
    }
}
