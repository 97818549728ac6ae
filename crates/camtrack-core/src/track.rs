use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::Detection;

/// Identity of a track, unique within one `PointTracker`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single past observation of a track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub width: f64,
}

impl From<&Detection> for Observation {
    fn from(d: &Detection) -> Self {
        Self {
            x: d.x,
            y: d.y,
            height: d.height,
            width: d.width,
        }
    }
}

/// A 3D point produced by the reconstruction stage and linked back to tracks.
///
/// Reconstruction owns these behind `Arc`; tracks only keep a `Weak` link, so
/// dropping the point makes the track a reconstruction candidate again.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedPoint {
    pub id: u64,
    pub position: Point3<f64>,
}

/// A 2D point followed across consecutive detections.
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    position: Point2<f64>,
    height: f64,
    width: f64,
    history: VecDeque<Observation>,
    history_len: usize,
    miss_count: u32,
    assigned_3d: Option<Weak<ReconstructedPoint>>,
}

impl Track {
    pub(crate) fn new(id: TrackId, det: &Detection, history_len: usize) -> Self {
        let history_len = history_len.max(1);
        let mut track = Self {
            id,
            position: Point2::new(det.x, det.y),
            height: det.height,
            width: det.width,
            history: VecDeque::with_capacity(history_len),
            history_len,
            miss_count: 0,
            assigned_3d: None,
        };
        track.push_history(det);
        track
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Position of the most recent matched detection.
    #[inline]
    pub fn position(&self) -> Point2<f64> {
        self.position
    }

    /// `(height, width)` of the most recent matched detection.
    #[inline]
    pub fn size(&self) -> (f64, f64) {
        (self.height, self.width)
    }

    /// Bounded observation history, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &Observation> + '_ {
        self.history.iter()
    }

    /// Most recent entry of the history.
    pub fn last_observation(&self) -> Option<&Observation> {
        self.history.back()
    }

    /// Consecutive detections (or frames) without a match.
    #[inline]
    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }

    /// Whether a live 3D point is linked to this track.
    pub fn is_assigned(&self) -> bool {
        self.assigned_3d().is_some()
    }

    /// The linked 3D point, if it is still alive.
    pub fn assigned_3d(&self) -> Option<Arc<ReconstructedPoint>> {
        self.assigned_3d.as_ref().and_then(Weak::upgrade)
    }

    /// Squared distance between the track position and a detection.
    #[inline]
    pub fn distance_sq(&self, det: &Detection) -> f64 {
        let dx = self.position.x - det.x;
        let dy = self.position.y - det.y;
        dx * dx + dy * dy
    }

    /// Squared difference of summed extents (`height + width`).
    #[inline]
    pub fn size_diff_sq(&self, det: &Detection) -> f64 {
        let d = (self.height + self.width) - det.size_sum();
        d * d
    }

    pub(crate) fn update(&mut self, det: &Detection) {
        self.position = Point2::new(det.x, det.y);
        self.height = det.height;
        self.width = det.width;
        self.miss_count = 0;
        self.push_history(det);
    }

    /// Record a miss; returns the new miss count.
    pub(crate) fn miss(&mut self) -> u32 {
        self.miss_count = self.miss_count.saturating_add(1);
        self.miss_count
    }

    pub(crate) fn link(&mut self, point: &Arc<ReconstructedPoint>) {
        self.assigned_3d = Some(Arc::downgrade(point));
    }

    pub(crate) fn unlink(&mut self) {
        self.assigned_3d = None;
    }

    fn push_history(&mut self, det: &Detection) {
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(Observation::from(det));
    }
}
