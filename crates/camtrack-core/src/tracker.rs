//! Frame-to-frame correspondence of 2D blob detections.
//!
//! Each detection is compared against the live tracks by squared position
//! distance and squared difference of summed extent. Both must be strictly
//! below the squared thresholds in `TrackerParams` for a pair to be gated.
//! What happens among gated pairs depends on `MatchPolicy`.

use std::sync::Arc;

use log::{debug, info};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::assignment::{solve_assignment, CostMatrix};
use crate::{
    Detection, EventSink, MatchPolicy, ReconstructedPoint, Track, TrackEvent, TrackId,
    TrackerParams,
};

/// What a detection did to the track set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Association {
    Updated(TrackId),
    Created(TrackId),
}

impl Association {
    pub fn track_id(&self) -> TrackId {
        match *self {
            Association::Updated(id) | Association::Created(id) => id,
        }
    }
}

/// Owns the live tracks of one camera.
#[derive(Debug, Clone, Default)]
pub struct PointTracker {
    params: TrackerParams,
    tracks: Vec<Track>,
    next_id: u64,
}

impl PointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: TrackerParams) -> Self {
        Self {
            params,
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    #[inline]
    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Live tracks in creation order.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    /// The most recently created track still alive.
    pub fn latest_created(&self) -> Option<&Track> {
        self.tracks.last()
    }

    /// Drop every track without publishing `PointLost`. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.tracks.len();
        self.tracks.clear();
        n
    }

    /// Link a track to a reconstructed 3D point. Returns `false` for unknown ids.
    pub fn assign_3d(&mut self, id: TrackId, point: &Arc<ReconstructedPoint>) -> bool {
        match self.tracks.iter_mut().find(|t| t.id() == id) {
            Some(track) => {
                track.link(point);
                true
            }
            None => false,
        }
    }

    /// Remove the 3D link of a track. Returns `false` for unknown ids.
    pub fn unassign_3d(&mut self, id: TrackId) -> bool {
        match self.tracks.iter_mut().find(|t| t.id() == id) {
            Some(track) => {
                track.unlink();
                true
            }
            None => false,
        }
    }

    /// Integrate a single detection.
    pub fn add_point<S>(&mut self, det: Detection, sink: &mut S) -> Association
    where
        S: EventSink + ?Sized,
    {
        match self.params.policy {
            MatchPolicy::Greedy => self.add_point_greedy(det, sink),
            MatchPolicy::Exclusive => self.add_frame_exclusive(&[det], sink)[0],
        }
    }

    /// Integrate all detections of one frame.
    ///
    /// Under `Greedy` this is exactly one `add_point` per detection, so misses
    /// are counted per detection. Under `Exclusive` misses are counted once
    /// per frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, detections, sink), fields(n = detections.len()))
    )]
    pub fn add_frame<S>(&mut self, detections: &[Detection], sink: &mut S) -> Vec<Association>
    where
        S: EventSink + ?Sized,
    {
        match self.params.policy {
            MatchPolicy::Greedy => detections
                .iter()
                .map(|det| self.add_point_greedy(*det, sink))
                .collect(),
            MatchPolicy::Exclusive => self.add_frame_exclusive(detections, sink),
        }
    }

    fn gated(&self, track: &Track, det: &Detection) -> bool {
        track.distance_sq(det) < self.params.max_distance_sq()
            && track.size_diff_sq(det) < self.params.max_size_diff_sq()
    }

    fn add_point_greedy<S>(&mut self, det: Detection, sink: &mut S) -> Association
    where
        S: EventSink + ?Sized,
    {
        let mut matched = self.tracks.iter().position(|t| self.gated(t, &det));

        let mut i = 0;
        while i < self.tracks.len() {
            if Some(i) == matched {
                let track = &mut self.tracks[i];
                track.update(&det);
                if !track.is_assigned() {
                    sink.publish(TrackEvent::PointUpdatedCandidate(track.id()));
                }
                i += 1;
            } else if self.miss_and_evict(i, sink) {
                // Removal shifts a later match one slot down.
                if let Some(m) = matched.as_mut() {
                    if *m > i {
                        *m -= 1;
                    }
                }
            } else {
                i += 1;
            }
        }

        match matched {
            Some(m) => Association::Updated(self.tracks[m].id()),
            None => Association::Created(self.spawn(&det, sink)),
        }
    }

    fn add_frame_exclusive<S>(
        &mut self,
        detections: &[Detection],
        sink: &mut S,
    ) -> Vec<Association>
    where
        S: EventSink + ?Sized,
    {
        let mut cost = CostMatrix::forbidden(self.tracks.len(), detections.len());
        let dist_sq = self.params.max_distance_sq();
        let size_sq = self.params.max_size_diff_sq();
        for (r, track) in self.tracks.iter().enumerate() {
            for (c, det) in detections.iter().enumerate() {
                if self.gated(track, det) {
                    let c_ij = track.distance_sq(det) / dist_sq + track.size_diff_sq(det) / size_sq;
                    cost.set(r, c, c_ij);
                }
            }
        }
        let row_to_col = solve_assignment(&cost);

        let mut outcome: Vec<Option<Association>> = vec![None; detections.len()];
        let mut i = 0;
        for col in row_to_col {
            match col {
                Some(c) => {
                    let track = &mut self.tracks[i];
                    track.update(&detections[c]);
                    if !track.is_assigned() {
                        sink.publish(TrackEvent::PointUpdatedCandidate(track.id()));
                    }
                    outcome[c] = Some(Association::Updated(track.id()));
                    i += 1;
                }
                None => {
                    if !self.miss_and_evict(i, sink) {
                        i += 1;
                    }
                }
            }
        }

        outcome
            .into_iter()
            .zip(detections)
            .map(|(o, det)| match o {
                Some(a) => a,
                None => Association::Created(self.spawn(det, sink)),
            })
            .collect()
    }

    /// Count a miss on track `i`; evict it past the limit. Returns `true` if removed.
    fn miss_and_evict<S>(&mut self, i: usize, sink: &mut S) -> bool
    where
        S: EventSink + ?Sized,
    {
        let misses = self.tracks[i].miss();
        if misses <= self.params.eviction_limit {
            return false;
        }
        let lost = self.tracks.remove(i);
        info!("track {} lost after {} misses", lost.id(), misses);
        sink.publish(TrackEvent::PointLost(lost.id()));
        true
    }

    fn spawn<S>(&mut self, det: &Detection, sink: &mut S) -> TrackId
    where
        S: EventSink + ?Sized,
    {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.tracks.push(Track::new(id, det, self.params.history_len));
        debug!("new track {} at ({:.1}, {:.1})", id, det.x, det.y);
        sink.publish(TrackEvent::PointCreated(id));
        id
    }
}
