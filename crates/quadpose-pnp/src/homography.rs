//! Plane-to-plane homography estimation (normalized DLT).
use nalgebra::{DMatrix, Matrix3, SMatrix, SVector, Vector3};

/// Relative determinant below which a homography is treated as rank deficient.
const SINGULAR_TOL: f64 = 1e-12;

/// Translate points to their centroid and scale so the mean distance is sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Vec<[f64; 2]>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(ax, ay), p| (ax + p[0], ay + p[1]));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    #[rustfmt::skip]
    let t = Matrix3::new(
        s, 0.0, -s * cx,
        0.0, s, -s * cy,
        0.0, 0.0, 1.0,
    );

    let out = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    (out, t)
}

/// Undo the normalization and fix the scale so that `h[(2, 2)] == 1`.
fn denormalize(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    let h = t_dst_inv * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    let h = h / s;

    let scale = h.norm();
    if !scale.is_finite() || h.determinant().abs() <= SINGULAR_TOL * scale.powi(3) {
        return None;
    }
    Some(h)
}

/// Solve the 8x8 system for four correspondences with `h33 = 1`.
fn homography_from_4pt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (k, (&[x, y], &[u, v])) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let h = a.lu().solve(&b)?;

    #[rustfmt::skip]
    let hn = Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], 1.0,
    );
    denormalize(hn, t_src, t_dst)
}

/// Least squares solution of `A h = 0` for more than four correspondences.
fn homography_from_npt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for (k, (&[x, y], &[u, v])) in src_n.iter().zip(dst_n.iter()).enumerate() {
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(true, true);
    let vt = svd.v_t?;
    let last = vt.nrows().checked_sub(1)?;
    let h = vt.row(last);

    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);
    denormalize(hn, t_src, t_dst)
}

/// Estimate `H` such that `dst ~ H * src` from at least four correspondences.
///
/// Returns `None` when the slices differ in length, hold fewer than four points,
/// or describe a configuration without a full-rank homography (repeated or
/// collinear points).
pub fn find_homography(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if src.len() == 4 {
        homography_from_4pt(src, dst)
    } else {
        homography_from_npt(src, dst)
    }
}

/// Map a point through a homography.
pub fn apply_homography(h: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    let v = h * Vector3::new(p[0], p[1], 1.0);
    [v[0] / v[2], v[1] / v[2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[rustfmt::skip]
    fn reference() -> Matrix3<f64> {
        Matrix3::new(
            1.2, 0.1, 30.0,
            -0.05, 0.9, 12.0,
            1e-4, -2e-4, 1.0,
        )
    }

    #[test]
    fn test_find_homography_4pt() {
        let h = reference();
        let src = [[0.0, 0.0], [50.0, 0.0], [50.0, 50.0], [0.0, 50.0]];
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| apply_homography(&h, p)).collect();

        let est = find_homography(&src, &dst).expect("well conditioned");
        for (a, b) in est.iter().zip(h.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_find_homography_npt() {
        let h = reference();
        let src = [
            [0.0, 0.0],
            [50.0, 0.0],
            [50.0, 50.0],
            [0.0, 50.0],
            [25.0, 10.0],
            [12.0, 40.0],
        ];
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| apply_homography(&h, p)).collect();

        let est = find_homography(&src, &dst).expect("well conditioned");
        for &p in &src {
            let a = apply_homography(&est, p);
            let b = apply_homography(&h, p);
            assert_relative_eq!(a[0], b[0], epsilon = 1e-8);
            assert_relative_eq!(a[1], b[1], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_find_homography_degenerate() {
        let src = [[0.0, 0.0], [50.0, 0.0], [50.0, 50.0], [0.0, 50.0]];
        let same = [[10.0, 10.0]; 4];
        assert!(find_homography(&src, &same).is_none());

        let collinear = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(find_homography(&src, &collinear).is_none());

        assert!(find_homography(&src[..3], &same[..3]).is_none());
    }
}
