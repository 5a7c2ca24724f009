//! Levenberg–Marquardt pose refinement for PnP solutions.

use crate::camera::CameraModel;
use crate::pnp::{validate_correspondences, PnPError};
use crate::so3::SO3;
use glam::DVec3;
use nalgebra::{Matrix6, Vector6};
use serde::{Deserialize, Serialize};

/// Parameters controlling the LM pose refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LMParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Convergence threshold on squared reprojection error decrease.
    pub eps: f64,
    /// Initial damping factor (lambda).
    pub lambda_init: f64,
    /// Multiplicative factor to increase/decrease lambda.
    pub lambda_mul: f64,
}

impl Default for LMParams {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-6,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// Outcome of [`refine_pose_lm`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LMSummary {
    /// Root-mean-square reprojection error of the returned pose, in pixels.
    pub rmse: f64,
    /// Number of iterations run.
    pub num_iterations: usize,
    /// Whether the error decrease fell below `eps`.
    pub converged: bool,
}

/// Write the residuals of pose `x = [rx, ry, rz, tx, ty, tz]` into `out`.
///
/// Returns the squared error and whether every point lies in front of the camera.
fn project_all_in_place(
    x: &[f64; 6],
    points_world: &[[f64; 3]],
    points_image: &[[f64; 2]],
    camera: &CameraModel,
    out: &mut [f64],
) -> (f64, bool) {
    let r = SO3::exp(DVec3::new(x[0], x[1], x[2]));
    let t = DVec3::new(x[3], x[4], x[5]);
    let k = &camera.intrinsics;
    let distorted = camera.has_distortion();

    let mut sum_sq = 0.0;
    let mut in_front = true;
    for (i, (pw, uv)) in points_world.iter().zip(points_image.iter()).enumerate() {
        let pc = r.transform_point(DVec3::from_array(*pw)) + t;
        in_front &= pc.z > 0.0;

        let (xn, yn) = (pc.x / pc.z, pc.y / pc.z);
        let (xd, yd) = if distorted {
            camera.distortion.distort(xn, yn)
        } else {
            (xn, yn)
        };
        let du = k.fx * xd + k.cx - uv[0];
        let dv = k.fy * yd + k.cy - uv[1];
        out[2 * i] = du;
        out[2 * i + 1] = dv;
        sum_sq += du.mul_add(du, dv * dv);
    }
    (sum_sq, in_front)
}

/// Refine a pose (rvec, t) with Levenberg–Marquardt to minimize pixel reprojection error.
///
/// - `points_world`: World points (N,3)
/// - `points_image`: Observed pixel points (N,2), distorted as the camera sees them
/// - `camera`: Camera model used to project the world points
/// - `rvec`: Initial axis-angle rotation (input/output)
/// - `t`: Initial translation (input/output)
///
/// Steps that would move any point behind the camera are rejected.
pub fn refine_pose_lm(
    points_world: &[[f64; 3]],
    points_image: &[[f64; 2]],
    camera: &CameraModel,
    rvec: &mut [f64; 3],
    t: &mut [f64; 3],
    params: &LMParams,
) -> Result<LMSummary, PnPError> {
    validate_correspondences(points_world, points_image, 3)?;

    let n = points_world.len();
    let mut x = [rvec[0], rvec[1], rvec[2], t[0], t[1], t[2]];

    let mut residuals = vec![0.0f64; 2 * n];
    let mut residuals_p = vec![0.0f64; 2 * n];
    let mut residuals_m = vec![0.0f64; 2 * n];
    let mut j = vec![0.0f64; 2 * n * 6];

    let project = |x: &[f64; 6], out: &mut [f64]| {
        project_all_in_place(x, points_world, points_image, camera, out)
    };

    let mut lambda = params.lambda_init;
    let (mut err_sq_base, _) = project(&x, &mut residuals);

    let mut iters = 0usize;
    let mut converged = false;

    while iters < params.max_iters {
        if err_sq_base < params.eps {
            converged = true;
            break;
        }
        iters += 1;

        const H_ROT: f64 = 1e-4;
        let t_scale = x[3].abs().max(x[4].abs()).max(x[5].abs()).max(1.0);
        let h_trans = 1e-4 * t_scale;

        for k_idx in 0..6 {
            let h = if k_idx < 3 { H_ROT } else { h_trans };
            let mut x_plus = x;
            let mut x_minus = x;
            x_plus[k_idx] += h;
            x_minus[k_idx] -= h;
            project(&x_plus, &mut residuals_p);
            project(&x_minus, &mut residuals_m);
            for i in 0..(2 * n) {
                j[i * 6 + k_idx] = (residuals_p[i] - residuals_m[i]) / (2.0 * h);
            }
        }

        // (J^T J + lambda I) delta = -J^T r
        let mut a = Matrix6::<f64>::zeros();
        let mut b = Vector6::<f64>::zeros();
        for (row, &r_val) in j.chunks_exact(6).zip(residuals.iter()) {
            for c in 0..6 {
                b[c] += row[c] * r_val;
                for d in 0..6 {
                    a[(c, d)] += row[c] * row[d];
                }
            }
        }
        for d in 0..6 {
            a[(d, d)] += lambda;
        }

        let Some(delta) = a.lu().solve(&(-b)) else {
            lambda *= params.lambda_mul;
            continue;
        };

        let mut x_new = x;
        for (xi, di) in x_new.iter_mut().zip(delta.iter()) {
            *xi += di;
        }

        let (err_sq_new, in_front) = project(&x_new, &mut residuals_p);
        if in_front && err_sq_new < err_sq_base {
            x = x_new;
            residuals.copy_from_slice(&residuals_p);
            let decrease = err_sq_base - err_sq_new;
            err_sq_base = err_sq_new;
            if decrease < params.eps {
                converged = true;
                break;
            }
            lambda = (lambda / params.lambda_mul).max(1e-12);
        } else {
            lambda *= params.lambda_mul;
        }
    }

    rvec.copy_from_slice(&x[0..3]);
    t.copy_from_slice(&x[3..6]);

    let rmse = (err_sq_base / (2.0 * n as f64)).sqrt();
    log::trace!("lm refinement: rmse {rmse:.4} after {iters} iterations, converged {converged}");

    Ok(LMSummary {
        rmse,
        num_iterations: iters,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraIntrinsics;
    use crate::ops::project_points;

    fn setup() -> (Vec<[f64; 3]>, CameraModel, [f64; 3], [f64; 3]) {
        let world = vec![
            [0.0, 0.0, 0.0],
            [50.0, 0.0, 0.0],
            [50.0, 50.0, 0.0],
            [0.0, 50.0, 0.0],
        ];
        let camera = CameraModel::pinhole(CameraIntrinsics::new(616.6, 616.6, 325.2, 228.0));
        (world, camera, [0.2, -0.1, 0.05], [-20.0, 10.0, 450.0])
    }

    #[test]
    fn test_refine_lm_recovers_perturbed_pose() -> Result<(), PnPError> {
        let (world, camera, rvec_gt, t_gt) = setup();
        let image = project_points(&world, &rvec_gt, &t_gt, &camera)?;

        let mut rvec = [rvec_gt[0] + 0.03, rvec_gt[1] - 0.02, rvec_gt[2] + 0.01];
        let mut t = [t_gt[0] + 3.0, t_gt[1] - 2.0, t_gt[2] + 15.0];
        let summary = refine_pose_lm(
            &world,
            &image,
            &camera,
            &mut rvec,
            &mut t,
            &LMParams {
                max_iters: 100,
                ..Default::default()
            },
        )?;

        assert!(summary.rmse < 1e-3, "rmse {}", summary.rmse);
        assert!(summary.converged);
        for (a, b) in t.iter().zip(t_gt.iter()) {
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
        Ok(())
    }

    #[test]
    fn test_refine_lm_does_not_increase_error() -> Result<(), PnPError> {
        let (world, camera, rvec_gt, t_gt) = setup();
        let mut image = project_points(&world, &rvec_gt, &t_gt, &camera)?;
        image[1][0] += 2.0;
        image[3][1] -= 1.5;

        let mut rvec = rvec_gt;
        let mut t = t_gt;
        let mut scratch = vec![0.0; 8];
        let x0 = [rvec[0], rvec[1], rvec[2], t[0], t[1], t[2]];
        let (err0, _) = project_all_in_place(&x0, &world, &image, &camera, &mut scratch);
        let rmse0 = (err0 / 8.0).sqrt();

        let summary =
            refine_pose_lm(&world, &image, &camera, &mut rvec, &mut t, &LMParams::default())?;
        assert!(summary.rmse <= rmse0 + 1e-9);
        Ok(())
    }

    #[test]
    fn test_refine_lm_exact_start() -> Result<(), PnPError> {
        let (world, camera, rvec_gt, t_gt) = setup();
        let image = project_points(&world, &rvec_gt, &t_gt, &camera)?;
        let (mut rvec, mut t) = (rvec_gt, t_gt);
        let summary =
            refine_pose_lm(&world, &image, &camera, &mut rvec, &mut t, &LMParams::default())?;
        assert!(summary.converged);
        assert_eq!(summary.num_iterations, 0);
        assert_eq!(t, t_gt);
        Ok(())
    }

    #[test]
    fn test_refine_lm_mismatched() {
        let (world, camera, mut rvec, mut t) = setup();
        let image = [[0.0, 0.0]; 3];
        let res = refine_pose_lm(&world, &image, &camera, &mut rvec, &mut t, &LMParams::default());
        assert!(matches!(res, Err(PnPError::MismatchedArrayLengths { .. })));
    }
}
