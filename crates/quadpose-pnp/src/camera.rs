//! Camera models and distortion handling for PnP solvers.
use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for camera operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    /// Invalid camera intrinsics matrix
    #[error("Invalid camera intrinsics: {0}")]
    InvalidIntrinsics(String),

    /// Failed to undistort point
    #[error("Failed to undistort point ({0}, {1})")]
    UndistortFailed(f64, f64),
}

/// Result type for camera operations.
pub type CameraResult<T> = Result<T, CameraError>;

/// Represents the intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in x direction
    pub fx: f64,
    /// Focal length in y direction
    pub fy: f64,
    /// Principal point x coordinate
    pub cx: f64,
    /// Principal point y coordinate
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create camera intrinsics from focal lengths and principal point.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Create camera intrinsics from a 3x3 intrinsics matrix.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> CameraResult<Self> {
        if k[0][1] != 0.0 || k[1][0] != 0.0 || k[2][0] != 0.0 || k[2][1] != 0.0 || k[2][2] != 1.0
        {
            return Err(CameraError::InvalidIntrinsics(
                "matrix must have form [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]".to_string(),
            ));
        }

        let intrinsics = Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    /// Check that the focal lengths are positive and every value is finite.
    pub fn validate(&self) -> CameraResult<()> {
        if ![self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(CameraError::InvalidIntrinsics(
                "values must be finite".to_string(),
            ));
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CameraError::InvalidIntrinsics(format!(
                "focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            )));
        }
        Ok(())
    }
}

/// Brown-Conrady lens distortion with three radial and two tangential terms.
///
/// Serialized as the five coefficients `[k1, k2, p1, p2, k3]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct Distortion {
    /// First radial coefficient.
    pub k1: f64,
    /// Second radial coefficient.
    pub k2: f64,
    /// First tangential coefficient.
    pub p1: f64,
    /// Second tangential coefficient.
    pub p2: f64,
    /// Third radial coefficient.
    pub k3: f64,
}

impl From<[f64; 5]> for Distortion {
    fn from(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }
}

impl From<Distortion> for [f64; 5] {
    fn from(d: Distortion) -> Self {
        [d.k1, d.k2, d.p1, d.p2, d.k3]
    }
}

impl Distortion {
    /// Check if there is any distortion.
    pub fn has_distortion(&self) -> bool {
        self.k1 != 0.0 || self.k2 != 0.0 || self.p1 != 0.0 || self.p2 != 0.0 || self.k3 != 0.0
    }

    /// Distort a point in normalized image coordinates.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let kr = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let xy2 = 2.0 * x * y;
        (
            x * kr + self.p1 * xy2 + self.p2 * (r2 + 2.0 * x * x),
            y * kr + self.p1 * (r2 + 2.0 * y * y) + self.p2 * xy2,
        )
    }

    /// Invert [`Distortion::distort`] by fixed point iteration.
    pub fn undistort(&self, xd: f64, yd: f64) -> CameraResult<(f64, f64)> {
        const MAX_ITERATIONS: usize = 10;
        const EPSILON: f64 = 1e-9;

        let (mut x, mut y) = (xd, yd);
        for _ in 0..MAX_ITERATIONS {
            let r2 = x * x + y * y;
            let kr = 1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2;
            let xy2 = 2.0 * x * y;
            let dx = self.p1 * xy2 + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + self.p2 * xy2;

            let nx = (xd - dx) / kr;
            let ny = (yd - dy) / kr;
            let step = (nx - x).abs().max((ny - y).abs());
            x = nx;
            y = ny;
            if step < EPSILON {
                break;
            }
        }

        if x.is_finite() && y.is_finite() {
            Ok((x, y))
        } else {
            Err(CameraError::UndistortFailed(xd, yd))
        }
    }
}

/// A complete camera model with intrinsics and lens distortion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Camera intrinsics
    #[serde(flatten)]
    pub intrinsics: CameraIntrinsics,
    /// Distortion coefficients, all zero for an ideal pinhole
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraModel {
    /// Create a camera model without distortion.
    pub fn pinhole(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            distortion: Distortion::default(),
        }
    }

    /// Create a camera model with distortion.
    pub fn with_distortion(intrinsics: CameraIntrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Check if the camera has distortion.
    pub fn has_distortion(&self) -> bool {
        self.distortion.has_distortion()
    }

    /// Map a pixel to undistorted normalized image coordinates.
    pub fn normalize_point(&self, u: f64, v: f64) -> CameraResult<(f64, f64)> {
        let k = &self.intrinsics;
        let xd = (u - k.cx) / k.fx;
        let yd = (v - k.cy) / k.fy;
        if self.has_distortion() {
            self.distortion.undistort(xd, yd)
        } else {
            Ok((xd, yd))
        }
    }

    /// Project a point in camera coordinates to pixels, including distortion.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, pc: DVec3) -> Option<[f64; 2]> {
        if pc.z <= 0.0 {
            return None;
        }
        let (x, y) = (pc.x / pc.z, pc.y / pc.z);
        let (xd, yd) = if self.has_distortion() {
            self.distortion.distort(x, y)
        } else {
            (x, y)
        };
        let k = &self.intrinsics;
        Some([k.fx * xd + k.cx, k.fy * yd + k.cy])
    }

    /// Check the intrinsics are usable.
    pub fn validate(&self) -> CameraResult<()> {
        self.intrinsics.validate()
    }
}
