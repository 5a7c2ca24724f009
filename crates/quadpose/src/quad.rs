use quadpose_imgproc::contours::Point2i;
use quadpose_imgproc::polygon::{approx_poly_dp, arc_length, contour_area};

/// The best quadrilateral found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCandidate {
    /// Vertices in the order the polygon approximation produced them.
    pub vertices: [Point2i; 4],
    /// Area of the quadrilateral in square pixels.
    pub area: f64,
}

/// Picks the largest four-sided contour above an area floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadSelector {
    /// Areas must be strictly greater than this.
    pub min_area: f64,
    /// Approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_fraction: f64,
}

impl Default for QuadSelector {
    fn default() -> Self {
        Self {
            min_area: 2000.0,
            epsilon_fraction: 0.1,
        }
    }
}

impl QuadSelector {
    /// Create a selector.
    pub fn new(min_area: f64, epsilon_fraction: f64) -> Self {
        Self {
            min_area,
            epsilon_fraction,
        }
    }

    /// Approximate a single contour, returning it if it is a large enough quad.
    pub fn quad_from_contour(&self, contour: &[Point2i]) -> Option<MarkerCandidate> {
        if contour_area(contour) <= self.min_area {
            return None;
        }

        let epsilon = self.epsilon_fraction * arc_length(contour, true);
        let approx = approx_poly_dp(contour, epsilon);
        let vertices: [Point2i; 4] = approx.as_slice().try_into().ok()?;

        let area = contour_area(&vertices);
        (area > self.min_area).then_some(MarkerCandidate { vertices, area })
    }

    /// Select the quad with the largest area; the first one wins ties.
    pub fn select(&self, contours: &[Vec<Point2i>]) -> Option<MarkerCandidate> {
        let mut best: Option<MarkerCandidate> = None;
        for contour in contours {
            let Some(candidate) = self.quad_from_contour(contour) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| candidate.area > b.area) {
                best = Some(candidate);
            }
        }
        log::debug!(
            "quad selection over {} contours: {:?}",
            contours.len(),
            best.as_ref().map(|c| c.area)
        );
        best
    }
}
