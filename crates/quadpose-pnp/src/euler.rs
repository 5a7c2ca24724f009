//! Rotation matrix to Euler angle conversion.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum Frobenius norm of `I - R^T R` for `R` to count as a rotation.
pub const ORTHONORMALITY_TOLERANCE: f64 = 1e-6;

/// Below this value of `sqrt(r00^2 + r10^2)` the decomposition is treated as gimbal locked.
pub const SINGULARITY_THRESHOLD: f64 = 1e-6;

/// Errors produced while converting rotations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EulerError {
    /// The matrix is not orthonormal within tolerance
    #[error("matrix is not a rotation, |I - R^T R| = {deviation:e}")]
    NotARotation {
        /// Frobenius norm of `I - R^T R`
        deviation: f64,
    },
}

/// Rotation about the x, y and z axes in degrees.
///
/// Composes as `R = Rz(z) * Ry(y) * Rx(x)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngles {
    /// Rotation about x in degrees.
    pub x: f64,
    /// Rotation about y in degrees.
    pub y: f64,
    /// Rotation about z in degrees.
    pub z: f64,
}

/// Frobenius norm of `I - R^T R`.
pub fn orthonormality_deviation(r: &[[f64; 3]; 3]) -> f64 {
    let mut sum = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            let rtr: f64 = (0..3).map(|k| r[k][i] * r[k][j]).sum();
            let id = if i == j { 1.0 } else { 0.0 };
            sum += (id - rtr).powi(2);
        }
    }
    sum.sqrt()
}

/// Check whether `r` is orthonormal within [`ORTHONORMALITY_TOLERANCE`].
pub fn is_rotation_matrix(r: &[[f64; 3]; 3]) -> bool {
    orthonormality_deviation(r) < ORTHONORMALITY_TOLERANCE
}

/// Decompose a row-major rotation matrix into x-y-z Euler angles in degrees.
///
/// Near gimbal lock the z angle is fixed to zero and the remaining rotation is
/// attributed to x.
pub fn rotation_matrix_to_euler_angles(r: &[[f64; 3]; 3]) -> Result<EulerAngles, EulerError> {
    let deviation = orthonormality_deviation(r);
    if deviation.is_nan() || deviation >= ORTHONORMALITY_TOLERANCE {
        return Err(EulerError::NotARotation { deviation });
    }

    let sy = (r[0][0] * r[0][0] + r[1][0] * r[1][0]).sqrt();

    let (x, y, z) = if sy >= SINGULARITY_THRESHOLD {
        (
            r[2][1].atan2(r[2][2]),
            (-r[2][0]).atan2(sy),
            r[1][0].atan2(r[0][0]),
        )
    } else {
        ((-r[1][2]).atan2(r[1][1]), (-r[2][0]).atan2(sy), 0.0)
    };

    Ok(EulerAngles {
        x: x.to_degrees(),
        y: y.to_degrees(),
        z: z.to_degrees(),
    })
}
