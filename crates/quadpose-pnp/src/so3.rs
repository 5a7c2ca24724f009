use glam::{DMat3, DQuat, DVec3};

/// A 3D rotation stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    /// Unit quaternion.
    pub q: DQuat,
}

impl SO3 {
    /// Create a rotation from a rotation matrix.
    pub fn from_matrix(mat: &DMat3) -> Self {
        Self {
            q: DQuat::from_mat3(mat).normalize(),
        }
    }

    /// The rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_quat(self.q)
    }

    /// Lie algebra -> Lie group.
    ///
    /// Maps an axis-angle vector to the rotation of `|v|` radians about `v / |v|`.
    pub fn exp(v: DVec3) -> Self {
        let theta = v.length();
        let theta_half = theta / 2.0;

        let (w, b) = if theta > f64::EPSILON {
            (theta_half.cos(), theta_half.sin() / theta)
        } else {
            // first order expansion of sin(theta / 2) / theta
            (1.0, 0.5)
        };
        let xyz = b * v;

        Self {
            q: DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize(),
        }
    }

    /// Lie group -> Lie algebra.
    ///
    /// Returns the axis-angle vector with angle in `[0, pi]`.
    pub fn log(&self) -> DVec3 {
        // q and -q are the same rotation, keep the short way round
        let q = if self.q.w < 0.0 { -self.q } else { self.q };
        let vec = DVec3::new(q.x, q.y, q.z);
        let sin_half = vec.length();

        if sin_half > f64::EPSILON {
            let theta = 2.0 * sin_half.atan2(q.w);
            vec * (theta / sin_half)
        } else {
            vec * (2.0 / q.w)
        }
    }

    /// Rotate a point.
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.q * p
    }
}
