use quadpose_pnp::{
    rotation_matrix_to_euler_angles, solve_pnp_planar, CameraModel, EulerAngles, PlanarParams,
    PnPResult,
};

use crate::corners::OrderedCorners;
use crate::error::PoseFailure;

/// A solved marker pose.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPose {
    /// Rotation, translation and solver diagnostics. Translation is in world units.
    pub pnp: PnPResult,
    /// Rotation as x-y-z Euler angles in degrees.
    pub euler: EulerAngles,
}

impl MarkerPose {
    /// Marker origin in camera coordinates.
    pub fn translation(&self) -> [f64; 3] {
        self.pnp.translation
    }
}

/// Solves the marker pose from its ordered image corners.
#[derive(Debug, Clone)]
pub struct PoseSolver {
    camera: CameraModel,
    world_points: [[f64; 3]; 4],
    params: PlanarParams,
}

impl PoseSolver {
    /// Create a solver for a camera and a marker whose corners are `world_points`,
    /// listed in corner slot order.
    pub fn new(camera: CameraModel, world_points: [[f64; 3]; 4], params: PlanarParams) -> Self {
        Self {
            camera,
            world_points,
            params,
        }
    }

    /// The camera model.
    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    /// The marker corners in the marker frame.
    pub fn world_points(&self) -> &[[f64; 3]; 4] {
        &self.world_points
    }

    /// Estimate the pose and convert its rotation to Euler angles.
    pub fn solve(&self, corners: &OrderedCorners) -> Result<MarkerPose, PoseFailure> {
        let image = corners.to_array();
        let pnp = solve_pnp_planar(&self.world_points, &image, &self.camera, &self.params)?;
        let euler = rotation_matrix_to_euler_angles(&pnp.rotation)?;
        Ok(MarkerPose { pnp, euler })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_camera, DEFAULT_WORLD_POINTS};
    use crate::corners::order_corners;
    use approx::assert_relative_eq;
    use quadpose_pnp::{project_points, DegenerateReason, PnPError};

    fn solver() -> PoseSolver {
        PoseSolver::new(
            default_camera(),
            DEFAULT_WORLD_POINTS,
            PlanarParams::default(),
        )
    }

    #[test]
    fn test_solve_from_ordered_corners() -> Result<(), Box<dyn std::error::Error>> {
        let solver = solver();
        let t_gt = [-25.0, -20.0, 500.0];
        let image = project_points(
            solver.world_points(),
            &[0.0, 0.0, 0.0],
            &t_gt,
            solver.camera(),
        )?;
        let corners = OrderedCorners {
            top: image[0],
            right: image[1],
            bottom: image[2],
            left: image[3],
        };

        let pose = solver.solve(&corners)?;
        for (a, b) in pose.translation().iter().zip(t_gt.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
        assert_relative_eq!(pose.euler.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(pose.euler.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(pose.euler.z, 0.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_slot_order_of_a_fronto_parallel_square() -> Result<(), Box<dyn std::error::Error>> {
        // a square seen head on, listed in arbitrary contour order
        let quad = [[300.0, 200.0], [300.0, 260.0], [360.0, 260.0], [360.0, 200.0]];
        let corners = order_corners(&quad)?;
        let pose = solver().solve(&corners)?;

        // slot 0 sits at the lower-left image corner, so the marker x axis runs
        // along the image x axis and its y axis points up the image
        assert!(pose.translation()[2] > 0.0);
        assert_relative_eq!(pose.euler.x.abs(), 180.0, epsilon = 1e-3);
        assert_relative_eq!(pose.euler.y, 0.0, epsilon = 1e-3);
        assert_relative_eq!(pose.euler.z, 0.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn test_degenerate_corners() {
        let p = [300.0, 200.0];
        let corners = OrderedCorners {
            top: p,
            right: p,
            bottom: p,
            left: p,
        };
        assert_eq!(
            solver().solve(&corners),
            Err(PoseFailure::Solver(PnPError::Degenerate(
                DegenerateReason::SingularHomography
            )))
        );
    }
}
