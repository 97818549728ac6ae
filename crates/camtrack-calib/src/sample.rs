use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Image position captured for one calibration world point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSample {
    Seen(Point2<f64>),
    /// The marker was not visible to this camera when the sample was taken.
    NotSeen,
}

impl CalibrationSample {
    /// Wire value of `NotSeen` in the `(x, y)` pair form.
    pub const NOT_SEEN_PAIR: (f64, f64) = (-1.0, -1.0);

    pub fn seen(x: f64, y: f64) -> Self {
        CalibrationSample::Seen(Point2::new(x, y))
    }

    pub fn not_seen() -> Self {
        CalibrationSample::NotSeen
    }

    /// Read a pair where either coordinate equal to `-1` means not seen.
    pub fn from_pair(x: f64, y: f64) -> Self {
        if x == -1.0 || y == -1.0 {
            CalibrationSample::NotSeen
        } else {
            CalibrationSample::seen(x, y)
        }
    }

    /// `(x, y)` pair, with `(-1, -1)` for `NotSeen`.
    pub fn to_pair(&self) -> (f64, f64) {
        match self {
            CalibrationSample::Seen(p) => (p.x, p.y),
            CalibrationSample::NotSeen => Self::NOT_SEEN_PAIR,
        }
    }

    #[inline]
    pub fn is_seen(&self) -> bool {
        matches!(self, CalibrationSample::Seen(_))
    }

    pub fn point(&self) -> Option<Point2<f64>> {
        match self {
            CalibrationSample::Seen(p) => Some(*p),
            CalibrationSample::NotSeen => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_pair_round_trips() {
        assert_eq!(CalibrationSample::not_seen().to_pair(), (-1.0, -1.0));
        assert_eq!(CalibrationSample::from_pair(-1.0, -1.0), CalibrationSample::NotSeen);
        assert_eq!(CalibrationSample::from_pair(-1.0, 12.0), CalibrationSample::NotSeen);
        assert_eq!(
            CalibrationSample::from_pair(5.0, 7.0),
            CalibrationSample::seen(5.0, 7.0)
        );
        assert!(CalibrationSample::seen(0.0, 0.0).is_seen());
        assert_eq!(CalibrationSample::NotSeen.point(), None);
    }
}
