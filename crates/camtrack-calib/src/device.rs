//! One physical camera: live tracking, calibration mode and persistence.

use camtrack_core::{
    Association, BlobMessageParser, Detection, EventSink, MessageParser, PointTracker,
    TrackerParams,
};
use log::{debug, info, warn};
use nalgebra::{DVector, Point3};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::record::matrix3_from_rows;
use crate::{
    CalibrationError, CalibrationSample, CalibrationSession, CameraParams, DeviceConfig,
    PreferenceStore, ProjectionSolver, StoreError,
};

/// What `push` did with a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Tracked(Association),
    /// The device has no projection yet and is not calibrating.
    NotCalibrated,
    /// The message did not parse; nothing changed.
    Malformed,
}

/// A camera identified by a stable device id (e.g. its MAC address).
///
/// Every operation takes `&mut self`, which serialises detections against
/// calibration mode switches. Use `DeviceHandle` to share a device between
/// threads.
pub struct CameraDevice {
    device_id: String,
    params: CameraParams,
    calibrated: bool,
    tracker: PointTracker,
    session: CalibrationSession,
    parser: Box<dyn MessageParser>,
}

impl std::fmt::Debug for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraDevice")
            .field("device_id", &self.device_id)
            .field("calibrated", &self.calibrated)
            .field("calibrating", &self.session.is_active())
            .field("tracks", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl CameraDevice {
    pub fn new(device_id: impl Into<String>, tracker: TrackerParams) -> Self {
        Self {
            device_id: device_id.into(),
            params: CameraParams::default(),
            calibrated: false,
            tracker: PointTracker::with_params(tracker),
            session: CalibrationSession::new(),
            parser: Box::new(BlobMessageParser),
        }
    }

    pub fn from_config(device_id: impl Into<String>, config: &DeviceConfig) -> Self {
        let mut device = Self::new(device_id, config.tracker.clone());
        device.params.intrinsics = config.intrinsics.map(matrix3_from_rows);
        device.params.distortion = config
            .distortion
            .as_ref()
            .map(|d| DVector::from_column_slice(d));
        device
    }

    /// Replace the message grammar.
    pub fn with_parser(mut self, parser: Box<dyn MessageParser>) -> Self {
        self.parser = parser;
        self
    }

    #[inline]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[inline]
    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    #[inline]
    pub fn is_calibrating(&self) -> bool {
        self.session.is_active()
    }

    #[inline]
    pub fn tracker(&self) -> &PointTracker {
        &self.tracker
    }

    /// Mutable tracker access, e.g. for linking tracks to 3D points.
    #[inline]
    pub fn tracker_mut(&mut self) -> &mut PointTracker {
        &mut self.tracker
    }

    #[inline]
    pub fn calibration_samples(&self) -> &[CalibrationSample] {
        self.session.samples()
    }

    /// Parse a raw camera message and feed it to the tracker.
    ///
    /// Messages are accepted while calibrated or while a calibration session
    /// is running. Unparseable messages are dropped.
    pub fn push<S>(&mut self, raw: &str, sink: &mut S) -> PushOutcome
    where
        S: EventSink + ?Sized,
    {
        if !self.accepts_detections() {
            warn!("{}: calibrate camera first, message dropped", self.device_id);
            return PushOutcome::NotCalibrated;
        }
        match self.parser.parse(raw) {
            Ok(msg) => PushOutcome::Tracked(self.tracker.add_point(msg.detection, sink)),
            Err(e) => {
                debug!("{}: dropping malformed message {raw:?}: {e}", self.device_id);
                PushOutcome::Malformed
            }
        }
    }

    /// Feed an already parsed detection, with the same gating as `push`.
    /// Detections with a NaN or infinite field count as malformed.
    pub fn push_detection<S>(&mut self, det: Detection, sink: &mut S) -> PushOutcome
    where
        S: EventSink + ?Sized,
    {
        if !self.accepts_detections() {
            warn!("{}: calibrate camera first, detection dropped", self.device_id);
            return PushOutcome::NotCalibrated;
        }
        if !det.is_finite() {
            debug!("{}: dropping non-finite detection {det:?}", self.device_id);
            return PushOutcome::Malformed;
        }
        PushOutcome::Tracked(self.tracker.add_point(det, sink))
    }

    fn accepts_detections(&self) -> bool {
        self.calibrated || self.session.is_active()
    }

    /// Enter calibration mode: the previous projection is discarded and the
    /// device counts as uncalibrated until `exit_calibration` succeeds.
    pub fn enter_calibration(&mut self) {
        self.params.projection = None;
        self.calibrated = false;
        self.session.enter(&mut self.tracker);
        info!("{}: entered calibration mode", self.device_id);
    }

    /// Capture the current marker position for the next world point.
    pub fn capture_sample(&mut self) -> Result<CalibrationSample, CalibrationError> {
        self.session.capture_sample(&mut self.tracker)
    }

    /// Leave calibration mode with the world points matching the captured
    /// samples, solve for the projection, apply it and persist it.
    ///
    /// Returns the camera position. On `Persist` errors the new projection is
    /// already applied; every other error leaves the device untouched and
    /// still in calibration mode.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, world, solver, store),
            fields(device = %self.device_id, n = world.len())
        )
    )]
    pub fn exit_calibration(
        &mut self,
        world: &[Point3<f64>],
        solver: &dyn ProjectionSolver,
        store: &dyn PreferenceStore,
    ) -> Result<Point3<f64>, CalibrationError> {
        let estimate = match self.session.exit(world, solver) {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!("{}: calibration failed: {e}", self.device_id);
                return Err(e);
            }
        };

        self.params.projection = Some(estimate.projection);
        self.calibrated = true;
        let position = estimate.camera_position;
        info!(
            "{}: calibrated, camera at ({:.3}, {:.3}, {:.3})",
            self.device_id, position.x, position.y, position.z
        );

        if let Err(source) = self.save_preferences(store) {
            warn!("{}: could not save calibration: {source}", self.device_id);
            return Err(CalibrationError::Persist { position, source });
        }
        Ok(position)
    }

    /// Leave calibration mode without solving. The device stays uncalibrated.
    pub fn abort_calibration(&mut self) {
        self.session.abort();
        info!("{}: calibration aborted", self.device_id);
    }

    /// Load the persisted record for this device.
    ///
    /// Returns whether the device is calibrated afterwards. A missing record
    /// leaves the current parameters alone; an unreadable one drops the
    /// projection so the device counts as uncalibrated.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, store), fields(device = %self.device_id))
    )]
    pub fn load_preferences(&mut self, store: &dyn PreferenceStore) -> bool {
        match store.get(&self.device_id) {
            Ok(Some(record)) => {
                self.params = CameraParams::from_record(&record);
                self.calibrated = self.params.projection.is_some();
                info!(
                    "{}: camera preferences loaded (calibrated: {})",
                    self.device_id, self.calibrated
                );
            }
            Ok(None) => debug!("{}: no stored preferences", self.device_id),
            Err(e) => {
                warn!("{}: could not load preferences: {e}", self.device_id);
                self.params.projection = None;
                self.calibrated = false;
            }
        }
        self.calibrated
    }

    /// Persist the current camera parameters, replacing any previous record.
    pub fn save_preferences(&self, store: &dyn PreferenceStore) -> Result<(), StoreError> {
        store.put(&self.device_id, &self.params.to_record())?;
        info!("{}: camera preferences saved", self.device_id);
        Ok(())
    }
}
