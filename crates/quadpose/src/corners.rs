//! Canonical ordering of the four marker corners.
//!
//! The slot names follow the camera rig the marker is mounted on; they are a
//! labelling convention, not a statement about image geometry. In raw image
//! coordinates (y grows downward) the slots land on:
//!
//! | slot | name     | image position |
//! |------|----------|----------------|
//! | 0    | `top`    | lower-left     |
//! | 1    | `right`  | lower-right    |
//! | 2    | `bottom` | upper-right    |
//! | 3    | `left`   | upper-left     |
//!
//! The world points of the marker are listed in the same slot order.

use quadpose_imgproc::contours::Point2i;

/// Errors raised while ordering corners.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CornerOrderError {
    /// A coordinate is NaN or infinite.
    #[error("corner coordinates must be finite")]
    NonFinite,

    /// The ordered quadrilateral self-intersects or has a straight or reflex angle.
    #[error("ordered corners do not form a convex quadrilateral")]
    NotConvex,
}

/// The four marker corners in slot order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedCorners {
    /// Slot 0.
    pub top: [f64; 2],
    /// Slot 1.
    pub right: [f64; 2],
    /// Slot 2.
    pub bottom: [f64; 2],
    /// Slot 3.
    pub left: [f64; 2],
}

impl OrderedCorners {
    /// Corners as an array indexed by slot.
    pub fn to_array(&self) -> [[f64; 2]; 4] {
        [self.top, self.right, self.bottom, self.left]
    }
}

/// Convert integer vertices to floating point image points.
pub fn vertices_to_points(vertices: &[Point2i; 4]) -> [[f64; 2]; 4] {
    vertices.map(|p| [p.x as f64, p.y as f64])
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

// Every turn must have the same non-zero sign.
fn is_strictly_convex(pts: &[[f64; 2]; 4]) -> bool {
    let turns: [f64; 4] =
        std::array::from_fn(|i| cross(pts[i], pts[(i + 1) % 4], pts[(i + 2) % 4]));
    turns.iter().all(|&t| t > 0.0) || turns.iter().all(|&t| t < 0.0)
}

/// Assign the four vertices of a quad to their slots.
///
/// 1. The two vertices with the smallest x form the left pair; ties keep input
///    order. The one with the larger y goes to slot 0, the other to slot 3. If
///    their y values are equal, the second of the pair takes slot 0.
/// 2. The other two, in input order, fill slots 1 and 2, swapped when slot 1 has
///    the smaller y.
///
/// The result must be a strictly convex quadrilateral.
///
/// # Examples
///
/// ```
/// use quadpose::corners::order_corners;
///
/// let quad = [[100.0, 100.0], [200.0, 100.0], [200.0, 200.0], [100.0, 200.0]];
/// let corners = order_corners(&quad).unwrap();
/// assert_eq!(corners.top, [100.0, 200.0]);
/// assert_eq!(corners.right, [200.0, 200.0]);
/// assert_eq!(corners.bottom, [200.0, 100.0]);
/// assert_eq!(corners.left, [100.0, 100.0]);
/// ```
pub fn order_corners(vertices: &[[f64; 2]; 4]) -> Result<OrderedCorners, CornerOrderError> {
    if vertices.iter().flatten().any(|v| !v.is_finite()) {
        return Err(CornerOrderError::NonFinite);
    }

    let mut by_x = [0usize, 1, 2, 3];
    // stable, so equal x keeps input order
    by_x.sort_by(|&a, &b| vertices[a][0].total_cmp(&vertices[b][0]));
    let (first, second) = (by_x[0], by_x[1]);

    let (slot0, slot3) = if vertices[first][1] > vertices[second][1] {
        (first, second)
    } else {
        (second, first)
    };

    let mut rest = [0usize; 2];
    for (dst, i) in rest
        .iter_mut()
        .zip((0..4).filter(|&i| i != slot0 && i != slot3))
    {
        *dst = i;
    }
    let [mut slot1, mut slot2] = rest;
    if vertices[slot1][1] < vertices[slot2][1] {
        std::mem::swap(&mut slot1, &mut slot2);
    }

    let ordered = [
        vertices[slot0],
        vertices[slot1],
        vertices[slot2],
        vertices[slot3],
    ];
    if !is_strictly_convex(&ordered) {
        return Err(CornerOrderError::NotConvex);
    }

    Ok(OrderedCorners {
        top: ordered[0],
        right: ordered[1],
        bottom: ordered[2],
        left: ordered[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2};

    const LOWER_LEFT: [f64; 2] = [100.0, 220.0];
    const LOWER_RIGHT: [f64; 2] = [230.0, 210.0];
    const UPPER_RIGHT: [f64; 2] = [220.0, 90.0];
    const UPPER_LEFT: [f64; 2] = [110.0, 100.0];

    fn expected() -> OrderedCorners {
        OrderedCorners {
            top: LOWER_LEFT,
            right: LOWER_RIGHT,
            bottom: UPPER_RIGHT,
            left: UPPER_LEFT,
        }
    }

    #[test]
    fn test_order_independent_of_start_and_direction() -> Result<(), CornerOrderError> {
        let ccw = [LOWER_LEFT, LOWER_RIGHT, UPPER_RIGHT, UPPER_LEFT];
        for shift in 0..4 {
            let mut quad = ccw;
            quad.rotate_left(shift);
            assert_eq!(order_corners(&quad)?, expected(), "shift {shift}");

            quad.reverse();
            assert_eq!(order_corners(&quad)?, expected(), "reversed shift {shift}");
        }
        Ok(())
    }

    // Rotating the marker by a quarter turn moves its physical corners, but the
    // slots stay tied to image positions.
    #[test]
    fn test_marker_rotation_states() -> Result<(), CornerOrderError> {
        let (cx, cy, h) = (320.0f64, 240.0f64, 60.0f64);
        for quarter in 0..4 {
            // slightly tilted so no two vertices share an x coordinate
            let base = 0.1 + quarter as f64 * FRAC_PI_2;
            let quad: [[f64; 2]; 4] = std::array::from_fn(|k| {
                let a = base + k as f64 * FRAC_PI_2 + FRAC_PI_4;
                let r = h * SQRT_2;
                [cx + r * a.cos(), cy + r * a.sin()]
            });
            let c = order_corners(&quad)?;

            assert!(c.top[0] < cx && c.top[1] > cy, "quarter {quarter}: {c:?}");
            assert!(c.right[0] > cx && c.right[1] > cy, "quarter {quarter}: {c:?}");
            assert!(c.bottom[0] > cx && c.bottom[1] < cy, "quarter {quarter}: {c:?}");
            assert!(c.left[0] < cx && c.left[1] < cy, "quarter {quarter}: {c:?}");
        }
        Ok(())
    }

    #[test]
    fn test_axis_aligned_ties() -> Result<(), CornerOrderError> {
        let quad = [[100.0, 100.0], [100.0, 200.0], [200.0, 200.0], [200.0, 100.0]];
        let c = order_corners(&quad)?;
        #[rustfmt::skip]
        let expected = [[100.0, 200.0], [200.0, 200.0], [200.0, 100.0], [100.0, 100.0]];
        assert_eq!(c.to_array(), expected);
        Ok(())
    }

    #[test]
    fn test_diamond_stays_cyclic() -> Result<(), CornerOrderError> {
        let (left, top, right, bottom) = ([0.0, 50.0], [50.0, 0.0], [100.0, 50.0], [50.0, 100.0]);

        let c = order_corners(&[left, top, right, bottom])?;
        assert_eq!(c.to_array(), [left, bottom, right, top]);

        let c = order_corners(&[left, bottom, right, top])?;
        assert_eq!(c.to_array(), [bottom, right, top, left]);
        Ok(())
    }

    #[test]
    fn test_rejects_non_convex_and_non_finite() {
        // dart: one vertex pushed inside the triangle of the others
        let dart = [[0.0, 0.0], [100.0, 50.0], [0.0, 100.0], [30.0, 50.0]];
        assert_eq!(order_corners(&dart), Err(CornerOrderError::NotConvex));

        let collinear = [[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [10.0, 10.0]];
        assert_eq!(order_corners(&collinear), Err(CornerOrderError::NotConvex));

        let nan = [[f64::NAN, 0.0], [10.0, 0.0], [20.0, 0.0], [10.0, 10.0]];
        assert_eq!(order_corners(&nan), Err(CornerOrderError::NonFinite));
    }
}
