//! Projection matrix estimation from 2D/3D correspondences.

use nalgebra::{DMatrix, Matrix3, Matrix3x4, Matrix4, Point2, Point3, Vector4};
use serde::{Deserialize, Serialize};

/// Result of a successful projection solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEstimate {
    /// `P` such that `x_img ~ P * [X; 1]`, defined up to scale.
    pub projection: Matrix3x4<f64>,
    /// Camera centre in world coordinates.
    pub camera_position: Point3<f64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("need at least {needed} point correspondences, got {got}")]
    NotEnoughPairs { needed: usize, got: usize },
    #[error("mismatched correspondences ({image} image points, {world} world points)")]
    LengthMismatch { image: usize, world: usize },
    #[error("non-finite coordinate in correspondences")]
    NonFinite,
    #[error("degenerate point configuration")]
    Degenerate,
}

/// Computes a camera projection matrix from matched image/world points.
pub trait ProjectionSolver: Send + Sync {
    /// Smallest number of pairs `compute` can work with.
    fn min_pairs(&self) -> usize;

    fn compute(
        &self,
        image: &[Point2<f64>],
        world: &[Point3<f64>],
    ) -> Result<ProjectionEstimate, SolveError>;
}

/// Normalised direct linear transform for the 3×4 projection matrix.
#[derive(Clone, Copy, Debug)]
pub struct DltProjectionSolver {
    /// Ratio of the two smallest singular values below which the system is
    /// treated as having more than one solution.
    pub degeneracy_ratio: f64,
}

impl Default for DltProjectionSolver {
    fn default() -> Self {
        Self {
            degeneracy_ratio: 1e-9,
        }
    }
}

const DLT_MIN_PAIRS: usize = 6;

impl ProjectionSolver for DltProjectionSolver {
    fn min_pairs(&self) -> usize {
        DLT_MIN_PAIRS
    }

    fn compute(
        &self,
        image: &[Point2<f64>],
        world: &[Point3<f64>],
    ) -> Result<ProjectionEstimate, SolveError> {
        if image.len() != world.len() {
            return Err(SolveError::LengthMismatch {
                image: image.len(),
                world: world.len(),
            });
        }
        let n = image.len();
        if n < DLT_MIN_PAIRS {
            return Err(SolveError::NotEnoughPairs {
                needed: DLT_MIN_PAIRS,
                got: n,
            });
        }
        let finite = image.iter().all(|p| p.x.is_finite() && p.y.is_finite())
            && world
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        if !finite {
            return Err(SolveError::NonFinite);
        }

        let (img_n, t_img) = normalize_2d(image).ok_or(SolveError::Degenerate)?;
        let (world_n, t_world) = normalize_3d(world).ok_or(SolveError::Degenerate)?;

        let mut a = DMatrix::<f64>::zeros(2 * n, 12);
        for (k, (pw, pi)) in world_n.iter().zip(img_n.iter()).enumerate() {
            let (x, y, z) = (pw.x, pw.y, pw.z);
            let (u, v) = (pi.x, pi.y);

            // [ X 1  0 0  -u X -u ]
            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = z;
            a[(r0, 3)] = 1.0;
            a[(r0, 8)] = -u * x;
            a[(r0, 9)] = -u * y;
            a[(r0, 10)] = -u * z;
            a[(r0, 11)] = -u;

            // [ 0 0  X 1  -v X -v ]
            let r1 = r0 + 1;
            a[(r1, 4)] = x;
            a[(r1, 5)] = y;
            a[(r1, 6)] = z;
            a[(r1, 7)] = 1.0;
            a[(r1, 8)] = -v * x;
            a[(r1, 9)] = -v * y;
            a[(r1, 10)] = -v * z;
            a[(r1, 11)] = -v;
        }

        let svd = a.svd(false, true);
        let v_t = svd.v_t.ok_or(SolveError::Degenerate)?;
        let sv = &svd.singular_values;

        let mut order: Vec<usize> = (0..sv.len()).collect();
        order.sort_by(|&i, &j| sv[i].total_cmp(&sv[j]));
        let (smallest, second) = (order[0], order[1]);
        if sv[second] <= self.degeneracy_ratio * sv.max() {
            return Err(SolveError::Degenerate);
        }

        let h = v_t.row(smallest);
        let p_norm = Matrix3x4::from_row_slice(&[
            h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8], h[9], h[10], h[11],
        ]);

        // Denormalise: P = T_img⁻¹ · Pn · T_world
        let t_img_inv = t_img.try_inverse().ok_or(SolveError::Degenerate)?;
        let projection = t_img_inv * p_norm * t_world;
        let projection = normalize_scale(projection).ok_or(SolveError::Degenerate)?;

        let camera_position = camera_center(&projection).ok_or(SolveError::Degenerate)?;
        Ok(ProjectionEstimate {
            projection,
            camera_position,
        })
    }
}

/// Camera centre `C` with `P · [C; 1] = 0`, i.e. `C = -M⁻¹ p₄`.
pub fn camera_center(p: &Matrix3x4<f64>) -> Option<Point3<f64>> {
    let m: Matrix3<f64> = p.fixed_view::<3, 3>(0, 0).into_owned();
    let m_inv = m.try_inverse()?;
    let c = -(m_inv * p.column(3));
    c.iter()
        .all(|v| v.is_finite())
        .then(|| Point3::from(c))
}

/// Project a world point with `P`. `None` for points on the camera plane.
pub fn project(p: &Matrix3x4<f64>, world: &Point3<f64>) -> Option<Point2<f64>> {
    let x = p * Vector4::new(world.x, world.y, world.z, 1.0);
    if x.z.abs() < 1e-12 {
        return None;
    }
    Some(Point2::new(x.x / x.z, x.y / x.z))
}

/// Scale `P` so that the third row of `M` has unit norm and points the camera
/// forward (positive depth for points in front).
fn normalize_scale(p: Matrix3x4<f64>) -> Option<Matrix3x4<f64>> {
    let m3 = p.fixed_view::<1, 3>(2, 0).norm();
    if m3 < 1e-12 {
        return None;
    }
    let m: Matrix3<f64> = p.fixed_view::<3, 3>(0, 0).into_owned();
    let sign = if m.determinant() < 0.0 { -1.0 } else { 1.0 };
    Some(p * (sign / m3))
}

fn normalize_2d(pts: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    // Hartley: centroid to origin, mean distance sqrt(2).
    let n = pts.len() as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }

    let s = 2.0_f64.sqrt() / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((out, t))
}

fn normalize_3d(pts: &[Point3<f64>]) -> Option<(Vec<Point3<f64>>, Matrix4<f64>)> {
    let n = pts.len() as f64;
    let c = pts.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords) / n;

    let mean_dist = pts.iter().map(|p| (p.coords - c).norm()).sum::<f64>() / n;
    if mean_dist <= 1e-12 {
        return None;
    }

    let s = 3.0_f64.sqrt() / mean_dist;
    #[rustfmt::skip]
    let t = Matrix4::new(
        s, 0.0, 0.0, -s * c.x,
        0.0, s, 0.0, -s * c.y,
        0.0, 0.0, s, -s * c.z,
        0.0, 0.0, 0.0, 1.0,
    );
    let out = pts.iter().map(|p| Point3::from((p.coords - c) * s)).collect();
    Some((out, t))
}
