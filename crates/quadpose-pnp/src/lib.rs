#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Planar PnP
//!
//! Pose of a planar object from four or more 2D-3D correspondences.
//!
//! ## Key Features
//!
//! - **Homography initialization**: closed form pose from the plane-to-image mapping
//! - **LM refinement**: Levenberg–Marquardt on the pixel reprojection error
//! - **Distortion Handling**: Brown–Conrady model with iterative undistortion
//! - **Explicit failures**: degenerate inputs are reported, never returned as a pose
//!
//! ## Example
//!
//! ```rust
//! use quadpose_pnp::{
//!     project_points, rotation_matrix_to_euler_angles, solve_pnp_planar, CameraIntrinsics,
//!     CameraModel, PlanarParams,
//! };
//!
//! let world = [
//!     [0.0, 0.0, 0.0],
//!     [50.0, 0.0, 0.0],
//!     [50.0, 50.0, 0.0],
//!     [0.0, 50.0, 0.0],
//! ];
//! let camera = CameraModel::pinhole(CameraIntrinsics::new(616.6, 616.6, 325.2, 228.0));
//!
//! // synthesize an observation
//! let image = project_points(&world, &[0.1, -0.2, 0.05], &[10.0, -5.0, 400.0], &camera)?;
//!
//! let pose = solve_pnp_planar(&world, &image, &camera, &PlanarParams::default())?;
//! let euler = rotation_matrix_to_euler_angles(&pose.rotation)?;
//! println!("translation: {:?}, angles: {:?}", pose.translation, euler);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Camera models and lens distortion.
pub mod camera;

/// Rotation matrix to Euler angles.
pub mod euler;

/// Plane-to-plane homography estimation.
pub mod homography;

/// Projection helpers.
pub mod ops;

/// Planar iterative PnP solver.
pub mod planar;

/// PnP error and result types.
pub mod pnp;

/// Levenberg–Marquardt pose refinement.
pub mod refine;

/// 3D rotations as unit quaternions.
pub mod so3;

pub use camera::{CameraError, CameraIntrinsics, CameraModel, Distortion};
pub use euler::{is_rotation_matrix, rotation_matrix_to_euler_angles, EulerAngles, EulerError};
pub use ops::{project_points, reprojection_rmse, rotation_vector_to_matrix};
pub use planar::{solve_pnp_planar, PlanarIterative, PlanarParams};
pub use pnp::{DegenerateReason, PnPError, PnPResult, PnPSolver};
pub use refine::{refine_pose_lm, LMParams, LMSummary};
