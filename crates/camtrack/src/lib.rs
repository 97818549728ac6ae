//! Facade crate for the `camtrack-*` workspace.
//!
//! This crate provides:
//! - re-exports of the tracking (`camtrack-core`) and calibration
//!   (`camtrack-calib`) crates
//! - helpers for driving a device from recorded input: `replay` feeds a log of
//!   raw camera messages, `CalibrationScript` runs a scripted calibration
//! - (feature `cli`) the `camtrack` command-line tool built on those helpers
//!
//! ## Quickstart
//!
//! ```no_run
//! use camtrack::{CameraDevice, JsonFileStore, TrackEvent, TrackerParams};
//!
//! let store = JsonFileStore::new("prefs");
//! let mut device = CameraDevice::new("b8:27:eb:4f:10:2a", TrackerParams::default());
//! device.load_preferences(&store);
//!
//! let mut events: Vec<TrackEvent> = Vec::new();
//! device.push("1x10y10h5w5a0", &mut events);
//! device.push("1x12y11h6w4a0", &mut events);
//! println!("{} tracks, events: {events:?}", device.tracker().len());
//! ```
//!
//! ## API map
//! - `camtrack::core`: detections, tracks, events and the `PointTracker`.
//! - `camtrack::calib`: calibration sessions, projection solvers, preference
//!   stores and `CameraDevice`.

pub use camtrack_calib as calib;
pub use camtrack_core as core;

pub use camtrack_calib::{
    CalibrationError, CameraDevice, CameraParams, CameraRecord, DeviceConfig, DeviceHandle,
    DltProjectionSolver, JsonFileStore, MemoryStore, PreferenceStore, PushOutcome,
};
pub use camtrack_core::{Detection, PointTracker, TrackEvent, TrackId, TrackerParams};

mod replay;
mod script;

pub use replay::{replay, JsonLinesSink, ReplaySummary};
pub use script::{CalibrationOutcome, CalibrationScript, ScriptError};
