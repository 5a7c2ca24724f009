use crate::contours::Point2i;

/// Signed area of a closed polygon with the shoelace formula.
///
/// The sign is positive when the vertices run counter-clockwise in a y-up frame,
/// which is clockwise on screen.
pub fn signed_area(points: &[Point2i]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let twice = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum::<f64>();

    twice * 0.5
}

/// Area enclosed by a closed polygon, regardless of its orientation.
///
/// # Examples
///
/// ```
/// use quadpose_imgproc::contours::Point2i;
/// use quadpose_imgproc::polygon::contour_area;
///
/// let square = [
///     Point2i::new(0, 0),
///     Point2i::new(0, 10),
///     Point2i::new(10, 10),
///     Point2i::new(10, 0),
/// ];
/// assert_eq!(contour_area(&square), 100.0);
/// ```
pub fn contour_area(points: &[Point2i]) -> f64 {
    signed_area(points).abs()
}

/// Length of a polyline, including the closing segment when `closed` is set.
pub fn arc_length(points: &[Point2i], closed: bool) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }

    let open_length = points
        .windows(2)
        .map(|w| segment_length(w[0], w[1]))
        .sum::<f64>();

    if closed {
        open_length + segment_length(points[n - 1], points[0])
    } else {
        open_length
    }
}

#[inline]
fn segment_length(a: Point2i, b: Point2i) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

#[derive(Clone, Copy, Debug)]
struct Slice {
    start: usize,
    end: usize,
}

/// Simplify a closed curve with the Douglas-Peucker algorithm.
///
/// The curve is split at the vertex farthest from a seed vertex (refined over three
/// rounds), then each half is subdivided at its farthest vertex until every point
/// lies within `epsilon` of the chord. A final pass removes vertices that lie on an
/// almost straight, non axis-aligned line between their neighbours.
///
/// # Arguments
///
/// * `contour` - The closed input curve.
/// * `epsilon` - The maximum distance between the curve and its approximation.
///
/// # Returns
///
/// The vertices of the approximated polygon, in the traversal order of the input.
pub fn approx_poly_dp(contour: &[Point2i], epsilon: f64) -> Vec<Point2i> {
    let len = contour.len();
    if len == 0 {
        return Vec::new();
    }

    let eps_sq = epsilon * epsilon;
    let mut poly = Vec::new();
    let mut stack: Vec<Slice> = Vec::new();

    // seed the split with the farthest pair, refined from the previous far point
    let mut start = 0usize;
    let mut far_offset = 0usize;
    let mut max_dist = 0.0;
    for _ in 0..3 {
        start = (start + far_offset) % len;
        let start_pt = contour[start];
        max_dist = 0.0;
        for j in 1..len {
            let pt = contour[(start + j) % len];
            let dx = (pt.x - start_pt.x) as f64;
            let dy = (pt.y - start_pt.y) as f64;
            let dist = dx * dx + dy * dy;
            if dist > max_dist {
                max_dist = dist;
                far_offset = j;
            }
        }
    }

    if max_dist <= eps_sq {
        poly.push(contour[start]);
    } else {
        let far = start + far_offset;
        stack.push(Slice {
            start: far % len,
            end: if start < far % len { start + len } else { start },
        });
        stack.push(Slice { start, end: far });
    }

    while let Some(slice) = stack.pop() {
        let start_pt = contour[slice.start % len];
        let end_pt = contour[slice.end % len];

        let mut split = None;
        if slice.end > slice.start + 1 {
            let dx = (end_pt.x - start_pt.x) as f64;
            let dy = (end_pt.y - start_pt.y) as f64;
            let mut max_dist = 0.0;
            let mut max_index = slice.start;

            for i in (slice.start + 1)..slice.end {
                let pt = contour[i % len];
                let dist = ((pt.y - start_pt.y) as f64 * dx - (pt.x - start_pt.x) as f64 * dy).abs();
                if dist > max_dist {
                    max_dist = dist;
                    max_index = i;
                }
            }

            if max_dist * max_dist > eps_sq * (dx * dx + dy * dy) {
                split = Some(max_index);
            }
        }

        match split {
            None => poly.push(start_pt),
            Some(mid) => {
                stack.push(Slice {
                    start: mid,
                    end: slice.end,
                });
                stack.push(Slice {
                    start: slice.start,
                    end: mid,
                });
            }
        }
    }

    remove_collinear(poly, eps_sq)
}

// Drop vertices lying on an almost straight line between their neighbours.
// Vertices on horizontal or vertical chords are kept.
fn remove_collinear(mut dst: Vec<Point2i>, eps_sq: f64) -> Vec<Point2i> {
    let count = dst.len();
    if count < 3 {
        return dst;
    }

    let mut new_count = count;
    let mut pos = count - 1;
    let read = |dst: &[Point2i], pos: &mut usize| {
        let pt = dst[*pos];
        *pos = (*pos + 1) % count;
        pt
    };

    let mut start_pt = read(&dst, &mut pos);
    let mut wpos = pos;
    let mut pt = read(&dst, &mut pos);

    let mut i = 0;
    while i < count && new_count > 2 {
        let end_pt = read(&dst, &mut pos);

        let dx = (end_pt.x - start_pt.x) as f64;
        let dy = (end_pt.y - start_pt.y) as f64;
        let dist = ((pt.x - start_pt.x) as f64 * dy - (pt.y - start_pt.y) as f64 * dx).abs();
        let successive_inner_product = (pt.x - start_pt.x) as f64 * (end_pt.x - pt.x) as f64
            + (pt.y - start_pt.y) as f64 * (end_pt.y - pt.y) as f64;

        if dist * dist <= 0.5 * eps_sq * (dx * dx + dy * dy)
            && dx != 0.0
            && dy != 0.0
            && successive_inner_product >= 0.0
        {
            new_count -= 1;
            dst[wpos] = end_pt;
            start_pt = end_pt;
            wpos = (wpos + 1) % count;
            pt = read(&dst, &mut pos);
            i += 2;
            continue;
        }

        dst[wpos] = pt;
        start_pt = pt;
        wpos = (wpos + 1) % count;
        pt = end_pt;
        i += 1;
    }

    dst.truncate(new_count);
    dst
}
