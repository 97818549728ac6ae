use nalgebra::{DVector, Matrix3, Matrix3x4, Point3};
use serde::{Deserialize, Serialize};

use crate::solver::camera_center;

/// Persisted form of a camera's parameters, stored under its device id.
///
/// Matrices are row-major nested arrays so the files stay readable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    /// 3×3 intrinsic matrix.
    #[serde(default)]
    pub cam: Option<[[f64; 3]; 3]>,
    /// Distortion coefficients.
    #[serde(default)]
    pub dist: Option<Vec<f64>>,
    /// 3×4 projection matrix.
    #[serde(default)]
    pub proj: Option<[[f64; 4]; 3]>,
}

impl CameraRecord {
    /// Check that every stored value is finite.
    pub fn is_finite(&self) -> bool {
        let cam = self.cam.iter().flatten().flatten().all(|v| v.is_finite());
        let dist = self.dist.iter().flatten().all(|v| v.is_finite());
        let proj = self.proj.iter().flatten().flatten().all(|v| v.is_finite());
        cam && dist && proj
    }
}

/// In-memory camera parameters of one device.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraParams {
    pub intrinsics: Option<Matrix3<f64>>,
    pub distortion: Option<DVector<f64>>,
    pub projection: Option<Matrix3x4<f64>>,
}

impl CameraParams {
    pub fn from_record(record: &CameraRecord) -> Self {
        Self {
            intrinsics: record.cam.map(matrix3_from_rows),
            distortion: record.dist.as_ref().map(|d| DVector::from_column_slice(d)),
            projection: record.proj.map(matrix34_from_rows),
        }
    }

    pub fn to_record(&self) -> CameraRecord {
        CameraRecord {
            cam: self.intrinsics.as_ref().map(matrix3_to_rows),
            dist: self.distortion.as_ref().map(|d| d.iter().copied().collect()),
            proj: self.projection.as_ref().map(matrix34_to_rows),
        }
    }

    /// Camera centre implied by the projection matrix.
    pub fn camera_position(&self) -> Option<Point3<f64>> {
        self.projection.as_ref().and_then(camera_center)
    }
}

pub fn matrix3_from_rows(rows: [[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| rows[r][c])
}

pub fn matrix3_to_rows(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
}

pub fn matrix34_from_rows(rows: [[f64; 4]; 3]) -> Matrix3x4<f64> {
    Matrix3x4::from_fn(|r, c| rows[r][c])
}

pub fn matrix34_to_rows(m: &Matrix3x4<f64>) -> [[f64; 4]; 3] {
    std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
}
