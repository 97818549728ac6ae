use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camtrack_core::EventSink;
use nalgebra::Point3;

use crate::{
    CalibrationError, CalibrationSample, CameraDevice, PreferenceStore, ProjectionSolver,
    PushOutcome, StoreError,
};

/// Shareable, lock-guarded camera device.
///
/// All operations on one device run one at a time; handles to different
/// devices never contend.
#[derive(Clone, Debug)]
pub struct DeviceHandle {
    device_id: Arc<str>,
    inner: Arc<Mutex<CameraDevice>>,
}

impl DeviceHandle {
    pub fn new(device: CameraDevice) -> Self {
        Self {
            device_id: Arc::from(device.device_id()),
            inner: Arc::new(Mutex::new(device)),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Lock the device, recovering from a poisoned mutex.
    pub fn lock(&self) -> MutexGuard<'_, CameraDevice> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push<S>(&self, raw: &str, sink: &mut S) -> PushOutcome
    where
        S: EventSink + ?Sized,
    {
        self.lock().push(raw, sink)
    }

    pub fn enter_calibration(&self) {
        self.lock().enter_calibration();
    }

    pub fn capture_sample(&self) -> Result<CalibrationSample, CalibrationError> {
        self.lock().capture_sample()
    }

    pub fn exit_calibration(
        &self,
        world: &[Point3<f64>],
        solver: &dyn ProjectionSolver,
        store: &dyn PreferenceStore,
    ) -> Result<Point3<f64>, CalibrationError> {
        self.lock().exit_calibration(world, solver, store)
    }

    pub fn load_preferences(&self, store: &dyn PreferenceStore) -> bool {
        self.lock().load_preferences(store)
    }

    pub fn save_preferences(&self, store: &dyn PreferenceStore) -> Result<(), StoreError> {
        self.lock().save_preferences(store)
    }

    pub fn is_calibrated(&self) -> bool {
        self.lock().is_calibrated()
    }
}
