//! Common data types shared across Perspective-n-Point (PnP) solvers.

use crate::camera::{CameraError, CameraModel};
use thiserror::Error;

/// Why a solver gave up on an otherwise well-formed input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DegenerateReason {
    /// The plane-to-image mapping could not be estimated
    #[error("the plane-to-image homography is singular")]
    SingularHomography,

    /// The optimizer produced NaN or infinite values
    #[error("the estimated pose is not finite")]
    NonFiniteSolution,

    /// The object ended up on or behind the image plane
    #[error("the object lies behind the camera (depth {depth})")]
    BehindCamera {
        /// Smallest depth found along the optical axis
        depth: f64,
    },

    /// The final pose does not explain the observations
    #[error("reprojection RMSE {rmse:.3} px exceeds the limit of {max:.3} px")]
    ReprojectionErrorTooLarge {
        /// Reprojection RMSE of the final pose in pixels
        rmse: f64,
        /// Configured upper bound in pixels
        max: f64,
    },
}

/// Error types for PnP solvers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PnPError {
    /// Invalid input data - insufficient correspondences for the specific solver
    #[error("PnP solver requires at least {required} 2D-3D correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required by the solver
        required: usize,
        /// Actual number of correspondences provided
        actual: usize,
    },

    /// Invalid input data - mismatched array lengths with descriptive labels.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedArrayLengths {
        /// Label for the left-hand slice
        left_name: &'static str,
        /// Length of the left-hand slice
        left_len: usize,
        /// Label for the right-hand slice
        right_name: &'static str,
        /// Length of the right-hand slice
        right_len: usize,
    },

    /// The world points do not lie on the z = 0 plane
    #[error("World points must lie on the z = 0 plane, found |z| = {0}")]
    NonPlanarObject(f64),

    /// An input coordinate is NaN or infinite
    #[error("Input contains non-finite coordinates")]
    NonFiniteInput,

    /// The input admits no usable pose
    #[error("Degenerate pose: {0}")]
    Degenerate(DegenerateReason),

    /// Camera model error
    #[error("Camera model error: {0}")]
    Camera(#[from] CameraError),
}

/// Result returned by any PnP solver.
///
/// The rotation matrix maps coordinates from the **world** frame to the
/// **camera** frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PnPResult {
    /// Estimated rotation matrix, row-major.
    pub rotation: [[f64; 3]; 3],
    /// Estimated translation vector.
    pub translation: [f64; 3],
    /// Rodrigues axis-angle representation of the rotation.
    pub rvec: [f64; 3],
    /// Root-mean-square reprojection error in pixels (if computed).
    pub reproj_rmse: Option<f64>,
    /// Number of iterations taken (if applicable).
    pub num_iterations: Option<usize>,
    /// Whether the solver converged (if applicable).
    pub converged: Option<bool>,
}

/// Trait for PnP solvers.
pub trait PnPSolver {
    /// Solver-specific parameters.
    type Param;

    /// Solve for camera pose given 2D-3D correspondences.
    ///
    /// # Arguments
    /// * `world` – 3-D coordinates in the world frame.
    /// * `image` – Corresponding pixel coordinates, possibly distorted.
    /// * `camera` – Camera model with intrinsics and optional distortion.
    /// * `params` – Solver-specific parameters.
    fn solve(
        world: &[[f64; 3]],
        image: &[[f64; 2]],
        camera: &CameraModel,
        params: &Self::Param,
    ) -> Result<PnPResult, PnPError>;
}

/// Check the shape of a correspondence set shared by every solver.
pub(crate) fn validate_correspondences(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    required: usize,
) -> Result<(), PnPError> {
    if world.len() != image.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: world.len(),
            right_name: "image points",
            right_len: image.len(),
        });
    }

    if world.len() < required {
        return Err(PnPError::InsufficientCorrespondences {
            required,
            actual: world.len(),
        });
    }

    let finite = world.iter().flatten().all(|v| v.is_finite())
        && image.iter().flatten().all(|v| v.is_finite());
    if !finite {
        return Err(PnPError::NonFiniteInput);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_correspondences() {
        let world = [[0.0, 0.0, 0.0]; 4];
        let image = [[0.0, 0.0]; 4];
        assert!(validate_correspondences(&world, &image, 4).is_ok());

        assert_eq!(
            validate_correspondences(&world, &image[..3], 4),
            Err(PnPError::MismatchedArrayLengths {
                left_name: "world points",
                left_len: 4,
                right_name: "image points",
                right_len: 3,
            })
        );
        assert_eq!(
            validate_correspondences(&world[..3], &image[..3], 4),
            Err(PnPError::InsufficientCorrespondences {
                required: 4,
                actual: 3
            })
        );

        let mut bad = image;
        bad[2][1] = f64::NAN;
        assert_eq!(
            validate_correspondences(&world, &bad, 4),
            Err(PnPError::NonFiniteInput)
        );
    }

    #[test]
    fn test_error_messages() {
        let err = PnPError::Degenerate(DegenerateReason::ReprojectionErrorTooLarge {
            rmse: 12.5,
            max: 8.0,
        });
        assert_eq!(
            err.to_string(),
            "Degenerate pose: reprojection RMSE 12.500 px exceeds the limit of 8.000 px"
        );
    }
}
