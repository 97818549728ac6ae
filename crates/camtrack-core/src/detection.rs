//! Blob detections and the camera's textual detection grammar.
//!
//! Cameras report one blob per message as `{id}x{x}y{y}h{h}w{w}a{a}`, e.g.
//! `3x120.5y88h6w5a0`. Each field runs up to the next marker letter, so the
//! id itself can't contain an `x`.

use serde::{Deserialize, Serialize};

/// One blob observation reported by a camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub width: f64,
    /// Blob orientation as reported by the camera. Not used for matching.
    #[serde(default)]
    pub angle: f64,
}

impl Detection {
    pub fn new(x: f64, y: f64, height: f64, width: f64) -> Self {
        Self {
            x,
            y,
            height,
            width,
            angle: 0.0,
        }
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// All fields are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.height, self.width, self.angle]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Summed blob extent, the quantity compared between frames.
    #[inline]
    pub fn size_sum(&self) -> f64 {
        self.height + self.width
    }
}

/// A fully parsed detection message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionMessage {
    /// Blob identifier assigned by the camera firmware.
    pub id: String,
    pub detection: Detection,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageParseError {
    #[error("missing `{marker}` marker before field `{field}`")]
    MissingMarker { field: &'static str, marker: char },
    #[error("field `{field}` is empty")]
    EmptyField { field: &'static str },
    #[error("field `{field}` is not a finite number: {raw:?}")]
    InvalidNumber { field: &'static str, raw: String },
}

/// Turns a raw camera message into a detection.
///
/// `CameraDevice` holds one of these so gateways speaking a different grammar
/// can plug their own in.
pub trait MessageParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<DetectionMessage, MessageParseError>;
}

/// Parser for the `{id}x{x}y{y}h{h}w{w}a{a}` grammar.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlobMessageParser;

impl MessageParser for BlobMessageParser {
    fn parse(&self, raw: &str) -> Result<DetectionMessage, MessageParseError> {
        parse_detection_message(raw)
    }
}

/// Numeric fields in message order, each with the marker that terminates it.
const FIELDS: [(&str, Option<char>); 5] = [
    ("x", Some('y')),
    ("y", Some('h')),
    ("height", Some('w')),
    ("width", Some('a')),
    ("angle", None),
];

/// Parse a message of the form `{id}x{x}y{y}h{h}w{w}a{a}`.
///
/// Surrounding whitespace is ignored. All five numeric fields must be finite.
pub fn parse_detection_message(raw: &str) -> Result<DetectionMessage, MessageParseError> {
    let raw = raw.trim();
    let (id, mut rest) = raw.split_once('x').ok_or(MessageParseError::MissingMarker {
        field: "id",
        marker: 'x',
    })?;
    if id.is_empty() {
        return Err(MessageParseError::EmptyField { field: "id" });
    }

    let mut values = [0.0_f64; 5];
    for (slot, (field, next)) in values.iter_mut().zip(FIELDS) {
        let text = match next {
            Some(marker) => {
                let (head, tail) = rest
                    .split_once(marker)
                    .ok_or(MessageParseError::MissingMarker { field, marker })?;
                rest = tail;
                head
            }
            None => std::mem::take(&mut rest),
        };
        *slot = parse_number(field, text)?;
    }

    let [x, y, height, width, angle] = values;
    Ok(DetectionMessage {
        id: id.to_string(),
        detection: Detection {
            x,
            y,
            height,
            width,
            angle,
        },
    })
}

fn parse_number(field: &'static str, text: &str) -> Result<f64, MessageParseError> {
    if text.is_empty() {
        return Err(MessageParseError::EmptyField { field });
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(MessageParseError::InvalidNumber {
            field,
            raw: text.to_string(),
        }),
    }
}
