//! Pairing captured 2D positions with operator-supplied 3D world points.
//!
//! The operator places a marker at a known world position, waits for the
//! camera to form a track, and captures. Samples are positional: the i-th
//! capture belongs to the i-th world point handed to `exit`.

use camtrack_core::PointTracker;
use log::{debug, info};
use nalgebra::{Point2, Point3};

use crate::{CalibrationError, CalibrationSample, ProjectionEstimate, ProjectionSolver};

/// Calibration-mode state of one camera.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSession {
    samples: Vec<CalibrationSample>,
    active: bool,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Samples captured so far, in capture order.
    #[inline]
    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    /// Start a fresh session. Live tracks are discarded.
    pub fn enter(&mut self, tracker: &mut PointTracker) {
        let dropped = tracker.clear();
        self.samples.clear();
        self.active = true;
        info!("calibration started ({dropped} live tracks dropped)");
    }

    /// Leave calibration mode without solving.
    pub fn abort(&mut self) {
        self.samples.clear();
        self.active = false;
    }

    /// Capture the current marker position.
    ///
    /// Takes the latest observation of the most recently created track and
    /// clears all tracks, so the next capture needs a freshly formed track.
    /// With no track, records `NotSeen`.
    pub fn capture_sample(
        &mut self,
        tracker: &mut PointTracker,
    ) -> Result<CalibrationSample, CalibrationError> {
        if !self.active {
            return Err(CalibrationError::NotCalibrating);
        }
        let sample = match tracker.latest_created().and_then(|t| t.last_observation()) {
            Some(obs) => CalibrationSample::seen(obs.x, obs.y),
            None => CalibrationSample::NotSeen,
        };
        if sample.is_seen() {
            tracker.clear();
        }
        self.samples.push(sample);
        debug!("sample {} captured: {:?}", self.samples.len() - 1, sample.to_pair());
        Ok(sample)
    }

    /// Drop every `NotSeen` sample together with the world point at the same
    /// index. Order of the remaining pairs is preserved.
    pub fn cleaned_pairs(
        &self,
        world: &[Point3<f64>],
    ) -> Result<(Vec<Point2<f64>>, Vec<Point3<f64>>), CalibrationError> {
        if world.len() != self.samples.len() {
            return Err(CalibrationError::LengthMismatch {
                samples: self.samples.len(),
                world: world.len(),
            });
        }
        Ok(self
            .samples
            .iter()
            .zip(world)
            .filter_map(|(s, w)| s.point().map(|p| (p, *w)))
            .unzip())
    }

    /// Solve for the projection and close the session.
    ///
    /// On any error the session stays active with its samples untouched.
    pub fn exit(
        &mut self,
        world: &[Point3<f64>],
        solver: &dyn ProjectionSolver,
    ) -> Result<ProjectionEstimate, CalibrationError> {
        if !self.active {
            return Err(CalibrationError::NotCalibrating);
        }
        let (image, world) = self.cleaned_pairs(world)?;
        debug!(
            "solving projection from {} of {} samples",
            image.len(),
            self.samples.len()
        );
        let estimate = solver.compute(&image, &world)?;
        self.samples.clear();
        self.active = false;
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SolveError;
    use camtrack_core::{Detection, NullSink};
    use nalgebra::Matrix3x4;
    use std::sync::Mutex;

    /// Records what it was asked to solve and returns a fixed estimate.
    #[derive(Default)]
    struct RecordingSolver {
        calls: Mutex<Vec<(Vec<Point2<f64>>, Vec<Point3<f64>>)>>,
    }

    impl ProjectionSolver for RecordingSolver {
        fn min_pairs(&self) -> usize {
            1
        }

        fn compute(
            &self,
            image: &[Point2<f64>],
            world: &[Point3<f64>],
        ) -> Result<ProjectionEstimate, SolveError> {
            self.calls
                .lock()
                .expect("lock")
                .push((image.to_vec(), world.to_vec()));
            if image.is_empty() {
                return Err(SolveError::NotEnoughPairs { needed: 1, got: 0 });
            }
            Ok(ProjectionEstimate {
                projection: Matrix3x4::identity(),
                camera_position: Point3::origin(),
            })
        }
    }

    fn active_session(samples: &[CalibrationSample]) -> CalibrationSession {
        CalibrationSession {
            samples: samples.to_vec(),
            active: true,
        }
    }

    #[test]
    fn capture_without_tracks_records_sentinel() {
        let mut tracker = PointTracker::new();
        let mut session = CalibrationSession::new();
        session.enter(&mut tracker);
        let s = session.capture_sample(&mut tracker).expect("capture");
        assert_eq!(s.to_pair(), (-1.0, -1.0));
        assert_eq!(session.samples(), &[CalibrationSample::NotSeen]);
    }

    #[test]
    fn capture_takes_newest_track_and_clears() {
        let mut tracker = PointTracker::new();
        let mut session = CalibrationSession::new();
        session.enter(&mut tracker);

        let mut sink = NullSink;
        tracker.add_point(Detection::new(10.0, 10.0, 5.0, 5.0), &mut sink);
        tracker.add_point(Detection::new(100.0, 50.0, 5.0, 5.0), &mut sink);
        tracker.add_point(Detection::new(102.0, 51.0, 5.0, 5.0), &mut sink);

        let s = session.capture_sample(&mut tracker).expect("capture");
        assert_eq!(s, CalibrationSample::seen(102.0, 51.0));
        assert!(tracker.is_empty());
    }

    #[test]
    fn capture_outside_session_fails() {
        let mut tracker = PointTracker::new();
        let mut session = CalibrationSession::new();
        assert!(matches!(
            session.capture_sample(&mut tracker),
            Err(CalibrationError::NotCalibrating)
        ));
    }

    #[test]
    fn enter_discards_tracks_and_samples() {
        let mut tracker = PointTracker::new();
        tracker.add_point(Detection::new(1.0, 1.0, 1.0, 1.0), &mut NullSink);
        let mut session = active_session(&[CalibrationSample::NotSeen]);
        session.enter(&mut tracker);
        assert!(tracker.is_empty());
        assert!(session.samples().is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn exit_filters_sentinels_by_index() {
        let mut session = active_session(&[
            CalibrationSample::seen(5.0, 5.0),
            CalibrationSample::NotSeen,
            CalibrationSample::seen(7.0, 9.0),
        ]);
        let world = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        let solver = RecordingSolver::default();
        session.exit(&world, &solver).expect("exit");

        let calls = solver.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![Point2::new(5.0, 5.0), Point2::new(7.0, 9.0)]);
        assert_eq!(calls[0].1, vec![world[0], world[2]]);
        assert!(!session.is_active());
        assert!(session.samples().is_empty());
    }

    #[test]
    fn length_mismatch_is_reported_and_keeps_state() {
        let samples = [CalibrationSample::seen(5.0, 5.0), CalibrationSample::NotSeen];
        let mut session = active_session(&samples);
        let solver = RecordingSolver::default();
        let err = session
            .exit(&[Point3::origin()], &solver)
            .unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::LengthMismatch {
                samples: 2,
                world: 1
            }
        ));
        assert!(solver.calls.lock().expect("lock").is_empty());
        assert!(session.is_active());
        assert_eq!(session.samples(), &samples);
    }

    #[test]
    fn solver_failure_keeps_session_open() {
        let mut session = active_session(&[CalibrationSample::NotSeen]);
        let solver = RecordingSolver::default();
        let err = session.exit(&[Point3::origin()], &solver).unwrap_err();
        assert!(matches!(err, CalibrationError::Solve(_)));
        assert!(session.is_active());
        assert_eq!(session.samples().len(), 1);
    }
}
