use crate::camera::CameraModel;
use crate::pnp::{DegenerateReason, PnPError};
use crate::so3::SO3;
use glam::{DMat3, DVec3};

/// Convert a glam matrix to row-major form.
pub(crate) fn mat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Rotation matrix (row-major) for an axis-angle vector.
pub fn rotation_vector_to_matrix(rvec: &[f64; 3]) -> [[f64; 3]; 3] {
    mat3_to_rows(&SO3::exp(DVec3::from_array(*rvec)).matrix())
}

/// Project world points into the image of `camera` placed at pose `(rvec, t)`.
///
/// Lens distortion is applied. Fails if any point is on or behind the image plane.
pub fn project_points(
    world: &[[f64; 3]],
    rvec: &[f64; 3],
    t: &[f64; 3],
    camera: &CameraModel,
) -> Result<Vec<[f64; 2]>, PnPError> {
    let r = SO3::exp(DVec3::from_array(*rvec));
    let t = DVec3::from_array(*t);

    world
        .iter()
        .map(|pw| {
            let pc = r.transform_point(DVec3::from_array(*pw)) + t;
            camera
                .project(pc)
                .ok_or(PnPError::Degenerate(DegenerateReason::BehindCamera {
                    depth: pc.z,
                }))
        })
        .collect()
}

/// Root-mean-square pixel distance between observed and reprojected points.
///
/// Uses the same normalization as the refinement, `sqrt(sum / 2n)`.
pub fn reprojection_rmse(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    rvec: &[f64; 3],
    t: &[f64; 3],
    camera: &CameraModel,
) -> Result<f64, PnPError> {
    crate::pnp::validate_correspondences(world, image, 1)?;
    let projected = project_points(world, rvec, t, camera)?;
    let sum_sq: f64 = projected
        .iter()
        .zip(image.iter())
        .map(|(p, o)| (p[0] - o[0]).powi(2) + (p[1] - o[1]).powi(2))
        .sum();
    Ok((sum_sq / (2.0 * image.len() as f64)).sqrt())
}
