use nalgebra::Point3;

use crate::{SolveError, StoreError};

/// Errors returned by calibration operations.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("device is not in calibration mode")]
    NotCalibrating,
    #[error("captured {samples} calibration samples but got {world} world points")]
    LengthMismatch { samples: usize, world: usize },
    #[error(transparent)]
    Solve(#[from] SolveError),
    /// The projection was computed and applied, but saving it failed.
    #[error("calibration computed but not saved: {source}")]
    Persist {
        position: Point3<f64>,
        #[source]
        source: StoreError,
    },
}
