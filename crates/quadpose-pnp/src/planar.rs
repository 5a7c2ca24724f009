//! Iterative PnP for planar targets: homography initialization plus LM refinement.

use crate::camera::CameraModel;
use crate::homography::find_homography;
use crate::ops::mat3_to_rows;
use crate::pnp::{validate_correspondences, DegenerateReason, PnPError, PnPResult, PnPSolver};
use crate::refine::{refine_pose_lm, LMParams};
use crate::so3::SO3;
use glam::{DMat3, DVec3};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Marker type for the planar iterative solver.
pub struct PlanarIterative;

/// Parameters of [`PlanarIterative`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarParams {
    /// Levenberg–Marquardt settings for the refinement stage.
    pub lm: LMParams,
    /// Largest accepted reprojection RMSE in pixels.
    pub max_reprojection_error: f64,
    /// Largest accepted `|z|` of a world point, relative to the object extent.
    pub planarity_tolerance: f64,
}

impl Default for PlanarParams {
    fn default() -> Self {
        Self {
            lm: LMParams::default(),
            max_reprojection_error: 8.0,
            planarity_tolerance: 1e-9,
        }
    }
}

impl PnPSolver for PlanarIterative {
    type Param = PlanarParams;

    fn solve(
        world: &[[f64; 3]],
        image: &[[f64; 2]],
        camera: &CameraModel,
        params: &Self::Param,
    ) -> Result<PnPResult, PnPError> {
        solve_pnp_planar(world, image, camera, params)
    }
}

/// Fail unless every world point lies on the z = 0 plane.
fn check_planarity(world: &[[f64; 3]], tolerance: f64) -> Result<(), PnPError> {
    let extent = world
        .iter()
        .flat_map(|p| [p[0].abs(), p[1].abs()])
        .fold(1.0f64, f64::max);
    let max_z = world.iter().map(|p| p[2].abs()).fold(0.0f64, f64::max);
    if max_z > tolerance * extent {
        return Err(PnPError::NonPlanarObject(max_z));
    }
    Ok(())
}

/// Closest rotation to `m` in the Frobenius sense.
fn project_to_so3(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fixed = u;
        u_fixed.column_mut(2).neg_mut();
        r = u_fixed * v_t;
    }
    Some(r)
}

/// Recover `(R, t)` from a homography mapping the z = 0 plane to normalized image coordinates.
fn decompose_homography(h: &Matrix3<f64>) -> Option<(DMat3, DVec3)> {
    let h1 = h.column(0);
    let h2 = h.column(1);
    let h3 = h.column(2);

    let norm_prod = h1.norm() * h2.norm();
    if !(norm_prod.is_finite() && norm_prod > f64::EPSILON) {
        return None;
    }
    let mut s = 1.0 / norm_prod.sqrt();
    // the plane must sit in front of the camera
    if s * h3[2] < 0.0 {
        s = -s;
    }

    let r1 = h1 * s;
    let r2 = h2 * s;
    let r3 = r1.cross(&r2);
    let t = h3 * s;

    let approx = Matrix3::from_columns(&[r1, r2, r3]);
    let r = project_to_so3(&approx)?;

    let r = DMat3::from_cols(
        DVec3::new(r[(0, 0)], r[(1, 0)], r[(2, 0)]),
        DVec3::new(r[(0, 1)], r[(1, 1)], r[(2, 1)]),
        DVec3::new(r[(0, 2)], r[(1, 2)], r[(2, 2)]),
    );
    Some((r, DVec3::new(t[0], t[1], t[2])))
}

/// Estimate the pose of a planar object from at least four correspondences.
///
/// World points must lie on `z = 0`. Observed pixels may be distorted; they are
/// undistorted through `camera` for the homography initialization, while the
/// refinement compares against the raw observations through the full camera model.
///
/// # Errors
///
/// Malformed input is reported with the matching [`PnPError`] variant. Inputs
/// that admit no usable pose yield [`PnPError::Degenerate`].
pub fn solve_pnp_planar(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    camera: &CameraModel,
    params: &PlanarParams,
) -> Result<PnPResult, PnPError> {
    validate_correspondences(world, image, 4)?;
    camera.validate()?;
    check_planarity(world, params.planarity_tolerance)?;

    let normalized = image
        .iter()
        .map(|&[u, v]| camera.normalize_point(u, v).map(|(x, y)| [x, y]))
        .collect::<Result<Vec<_>, _>>()?;
    let plane: Vec<[f64; 2]> = world.iter().map(|p| [p[0], p[1]]).collect();

    let h = find_homography(&plane, &normalized)
        .ok_or(PnPError::Degenerate(DegenerateReason::SingularHomography))?;
    let (r0, t0) =
        decompose_homography(&h).ok_or(PnPError::Degenerate(DegenerateReason::SingularHomography))?;

    let mut rvec = SO3::from_matrix(&r0).log().to_array();
    let mut t = t0.to_array();
    log::trace!("planar pnp init: rvec {rvec:?} t {t:?}");

    let summary = refine_pose_lm(world, image, camera, &mut rvec, &mut t, &params.lm)?;

    if !(rvec.iter().chain(t.iter()).all(|v| v.is_finite()) && summary.rmse.is_finite()) {
        return Err(PnPError::Degenerate(DegenerateReason::NonFiniteSolution));
    }

    let rot = SO3::exp(DVec3::from_array(rvec));
    let tv = DVec3::from_array(t);
    let min_depth = world
        .iter()
        .map(|pw| (rot.transform_point(DVec3::from_array(*pw)) + tv).z)
        .fold(f64::INFINITY, f64::min);
    if t[2] <= 0.0 || min_depth <= 0.0 {
        return Err(PnPError::Degenerate(DegenerateReason::BehindCamera {
            depth: min_depth.min(t[2]),
        }));
    }

    if summary.rmse > params.max_reprojection_error {
        return Err(PnPError::Degenerate(
            DegenerateReason::ReprojectionErrorTooLarge {
                rmse: summary.rmse,
                max: params.max_reprojection_error,
            },
        ));
    }

    Ok(PnPResult {
        rotation: mat3_to_rows(&rot.matrix()),
        translation: t,
        rvec,
        reproj_rmse: Some(summary.rmse),
        num_iterations: Some(summary.num_iterations),
        converged: Some(summary.converged),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraIntrinsics;
    use crate::ops::project_points;
    use approx::assert_relative_eq;

    const SQUARE: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [50.0, 0.0, 0.0],
        [50.0, 50.0, 0.0],
        [0.0, 50.0, 0.0],
    ];

    fn camera() -> CameraModel {
        CameraModel::pinhole(CameraIntrinsics::new(
            616.633_616_108_542_6,
            616.633_616_108_542_6,
            325.188_189_957_994_1,
            228.010_103_346_511_78,
        ))
    }

    #[test]
    fn test_check_planarity() {
        assert!(check_planarity(&SQUARE, 1e-9).is_ok());
        let mut lifted = SQUARE;
        lifted[2][2] = 1.0;
        assert_eq!(
            check_planarity(&lifted, 1e-9),
            Err(PnPError::NonPlanarObject(1.0))
        );
    }

    #[test]
    fn test_decompose_homography_fronto_parallel() {
        // R = I, t = (1, 2, 100) mapped to normalized coordinates
        #[rustfmt::skip]
        let h = Matrix3::new(
            1.0, 0.0, 1.0,
            0.0, 1.0, 2.0,
            0.0, 0.0, 100.0,
        ) * -0.01;
        let (r, t) = decompose_homography(&h).expect("valid homography");
        assert!(r.abs_diff_eq(DMat3::IDENTITY, 1e-12));
        assert_relative_eq!(t.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(t.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(t.z, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_exact() -> Result<(), PnPError> {
        let cam = camera();
        let rvec_gt = [0.3, -0.2, 0.1];
        let t_gt = [-12.0, 8.0, 380.0];
        let image = project_points(&SQUARE, &rvec_gt, &t_gt, &cam)?;

        let res = PlanarIterative::solve(&SQUARE, &image, &cam, &PlanarParams::default())?;
        for i in 0..3 {
            assert_relative_eq!(res.rvec[i], rvec_gt[i], epsilon = 1e-6);
            assert_relative_eq!(res.translation[i], t_gt[i], epsilon = 1e-4);
        }
        assert!(res.reproj_rmse.is_some_and(|e| e < 1e-6));
        Ok(())
    }

    #[test]
    fn test_solve_rejects_coincident_points() {
        let image = [[300.0, 200.0]; 4];
        let res = solve_pnp_planar(&SQUARE, &image, &camera(), &PlanarParams::default());
        assert!(matches!(res, Err(PnPError::Degenerate(_))), "{res:?}");
    }

    #[test]
    fn test_solve_rejects_unreachable_quad() {
        // four points always admit a homography, but not every quadrilateral
        // is a perspective view of a square
        let image = [[100.0, 100.0], [300.0, 100.0], [900.0, 120.0], [100.0, 300.0]];
        let params = PlanarParams {
            max_reprojection_error: 0.5,
            ..Default::default()
        };
        let res = solve_pnp_planar(&SQUARE, &image, &camera(), &params);
        assert!(matches!(res, Err(PnPError::Degenerate(_))), "{res:?}");
    }

    #[test]
    fn test_solve_rejects_bad_input() {
        let cam = camera();
        let params = PlanarParams::default();
        let image = [[1.0, 2.0]; 3];
        assert!(matches!(
            solve_pnp_planar(&SQUARE[..3], &image, &cam, &params),
            Err(PnPError::InsufficientCorrespondences { required: 4, actual: 3 })
        ));

        let mut nan = [[1.0, 2.0]; 4];
        nan[0][0] = f64::NAN;
        assert_eq!(
            solve_pnp_planar(&SQUARE, &nan, &cam, &params),
            Err(PnPError::NonFiniteInput)
        );
    }
}
