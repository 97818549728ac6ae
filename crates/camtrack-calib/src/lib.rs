//! Camera calibration workflow and device orchestration for camtrack.
//!
//! - `CalibrationSession` pairs captured 2D track positions with world points.
//! - `ProjectionSolver` turns the pairs into a 3×4 projection matrix;
//!   `DltProjectionSolver` is the built-in implementation.
//! - `PreferenceStore` persists `CameraRecord`s keyed by device id.
//! - `CameraDevice` ties a `PointTracker` and a session together; `DeviceHandle`
//!   shares one between threads.

mod device;
mod error;
mod handle;
mod io;
mod record;
mod sample;
mod session;
mod solver;
mod store;

pub use device::{CameraDevice, PushOutcome};
pub use error::CalibrationError;
pub use handle::DeviceHandle;
pub use io::{ConfigError, DeviceConfig};
pub use record::{
    matrix34_from_rows, matrix34_to_rows, matrix3_from_rows, matrix3_to_rows, CameraParams,
    CameraRecord,
};
pub use sample::CalibrationSample;
pub use session::CalibrationSession;
pub use solver::{
    camera_center, project, DltProjectionSolver, ProjectionEstimate, ProjectionSolver, SolveError,
};
pub use store::{JsonFileStore, MemoryStore, PreferenceStore, StoreError};
