//! Scripted calibration: recorded captures replayed against known world points.

use std::{fs, path::Path};

use camtrack_calib::{CalibrationSample, ProjectionSolver};
use camtrack_core::EventSink;
use log::info;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::{CalibrationError, CameraDevice, PreferenceStore};

#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("script has {captures} captures for {world} world points")]
    LengthMismatch { captures: usize, world: usize },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// A calibration run recorded as JSON.
///
/// ```json
/// { "world_points": [[0, 0, 0], [1, 0, 0]],
///   "captures": [["1x10y10h5w5a0"], []] }
/// ```
///
/// Capture `i` holds the raw messages seen while the marker stood at world
/// point `i`. An empty capture yields a not-seen sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationScript {
    pub world_points: Vec<[f64; 3]>,
    pub captures: Vec<Vec<String>>,
}

/// Result of a successful `CalibrationScript::run`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    pub position: Point3<f64>,
    pub samples: Vec<CalibrationSample>,
}

impl CalibrationOutcome {
    pub fn seen(&self) -> usize {
        self.samples.iter().filter(|s| s.is_seen()).count()
    }
}

impl CalibrationScript {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn world(&self) -> Vec<Point3<f64>> {
        self.world_points
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect()
    }

    /// Calibrate `device`: one sample per capture, then solve and persist.
    ///
    /// A mismatched script is rejected before the device is touched. If
    /// solving fails the session is aborted, which leaves the device
    /// uncalibrated.
    pub fn run<S>(
        &self,
        device: &mut CameraDevice,
        solver: &dyn ProjectionSolver,
        store: &dyn PreferenceStore,
        sink: &mut S,
    ) -> Result<CalibrationOutcome, ScriptError>
    where
        S: EventSink + ?Sized,
    {
        if self.captures.len() != self.world_points.len() {
            return Err(ScriptError::LengthMismatch {
                captures: self.captures.len(),
                world: self.world_points.len(),
            });
        }

        device.enter_calibration();
        for messages in &self.captures {
            for raw in messages {
                device.push(raw, sink);
            }
            device.capture_sample()?;
        }
        let samples = device.calibration_samples().to_vec();
        info!(
            "{}: captured {} samples, {} seen",
            device.device_id(),
            samples.len(),
            samples.iter().filter(|s| s.is_seen()).count()
        );

        match device.exit_calibration(&self.world(), solver, store) {
            Ok(position) => Ok(CalibrationOutcome { position, samples }),
            Err(e) => {
                if device.is_calibrating() {
                    device.abort_calibration();
                }
                Err(e.into())
            }
        }
    }
}
