//! Persistent 2D point tracks for networked blob-tracking cameras.
//!
//! A camera reports one blob per message. `PointTracker` turns that stream
//! into tracks with stable identities and publishes lifecycle events that the
//! 3D reconstruction subscribes to. Nothing here knows about calibration; see
//! `camtrack-calib` for that.

pub mod assignment;
mod detection;
mod events;
mod logger;
mod params;
mod track;
mod tracker;

pub use detection::{
    parse_detection_message, BlobMessageParser, Detection, DetectionMessage, MessageParseError,
    MessageParser,
};
pub use events::{EventSink, NullSink, TrackEvent};
pub use params::{MatchPolicy, TrackerParams};
pub use track::{Observation, ReconstructedPoint, Track, TrackId};
pub use tracker::{Association, PointTracker};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
