use quadpose_image::{Image, ImageError};

/// Integer pixel coordinate, `x` is the column and `y` the row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Point2i {
    /// x-coordinate.
    pub x: i32,
    /// y-coordinate.
    pub y: i32,
}

impl Point2i {
    /// Construct a point at (x, y).
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point2i {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Kind of border a contour traces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BorderType {
    /// Perimeter of foreground regions.
    Outer,
    /// Perimeter of background regions enclosed by foreground.
    Hole,
}

/// Which borders are returned by [`find_contours`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Only outer borders that are not nested inside any other region.
    External,
    /// Every border, outer and hole, with its parent link.
    List,
}

/// How border points are stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContourApproximation {
    /// Every border pixel.
    None,
    /// Only the pixels where the chain direction changes.
    Simple,
}

/// A border found in a binary image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// The points on the border.
    pub points: Vec<Point2i>,
    /// The type of the border.
    pub border_type: BorderType,
    /// Index of the enclosing border in the returned list, `None` for the image frame.
    pub parent: Option<usize>,
}

// Chain codes, counter-clockwise on screen starting from east (y grows downward).
const DIRECTIONS: [(isize, isize); 8] = [
    (1, 0),   // E
    (1, -1),  // NE
    (0, -1),  // N
    (-1, -1), // NW
    (-1, 0),  // W
    (-1, 1),  // SW
    (0, 1),   // S
    (1, 1),   // SE
];
const DIR_EAST: usize = 0;
const DIR_WEST: usize = 4;

// Label grid with a one pixel zero border so neighbour lookups never leave the buffer.
struct LabelGrid {
    data: Vec<i32>,
    stride: usize,
    deltas: [isize; 8],
}

impl LabelGrid {
    fn from_mask(src: &Image<u8, 1>) -> Self {
        let (width, height) = (src.cols(), src.rows());
        let stride = width + 2;
        let mut data = vec![0i32; stride * (height + 2)];
        for (y, row) in src.as_slice().chunks_exact(width).enumerate() {
            let base = (y + 1) * stride + 1;
            for (x, &v) in row.iter().enumerate() {
                if v != 0 {
                    data[base + x] = 1;
                }
            }
        }

        let deltas = DIRECTIONS.map(|(dx, dy)| dx + dy * stride as isize);

        Self {
            data,
            stride,
            deltas,
        }
    }

    #[inline]
    fn neighbour(&self, idx: usize, dir: usize) -> usize {
        (idx as isize + self.deltas[dir]) as usize
    }

    #[inline]
    fn point(&self, idx: usize) -> Point2i {
        Point2i::new(
            (idx % self.stride) as i32 - 1,
            (idx / self.stride) as i32 - 1,
        )
    }

    // Follow one border starting at `start`, entered from direction `from`.
    // Returns every visited pixel paired with the chain code of the step leaving it.
    fn follow(&mut self, start: usize, from: usize, nbd: i32) -> Vec<(usize, Option<usize>)> {
        // clockwise search for the first non-zero neighbour
        let mut s = from;
        let mut found = false;
        for _ in 0..8 {
            s = (s + 7) % 8;
            if s == from {
                break;
            }
            if self.data[self.neighbour(start, s)] != 0 {
                found = true;
                break;
            }
        }

        if !found {
            self.data[start] = -nbd;
            return vec![(start, None)];
        }

        let last = self.neighbour(start, s);
        let mut chain = Vec::new();
        let mut current = start;

        loop {
            // counter-clockwise search starting after the previous pixel
            let mut east_is_zero = false;
            let mut next = current;
            for _ in 0..8 {
                s = (s + 1) % 8;
                next = self.neighbour(current, s);
                if self.data[next] != 0 {
                    break;
                }
                if s == DIR_EAST {
                    east_is_zero = true;
                }
            }

            if east_is_zero {
                self.data[current] = -nbd;
            } else if self.data[current] == 1 {
                self.data[current] = nbd;
            }

            chain.push((current, Some(s)));

            if next == start && current == last {
                break;
            }
            current = next;
            s = (s + 4) % 8;
        }

        chain
    }
}

fn compress(
    grid: &LabelGrid,
    chain: &[(usize, Option<usize>)],
    approx: ContourApproximation,
) -> Vec<Point2i> {
    match approx {
        ContourApproximation::None => chain.iter().map(|&(idx, _)| grid.point(idx)).collect(),
        ContourApproximation::Simple => {
            let n = chain.len();
            chain
                .iter()
                .enumerate()
                .filter(|&(i, &(_, dir))| {
                    let prev_dir = chain[(i + n - 1) % n].1;
                    n == 1 || dir != prev_dir
                })
                .map(|(_, &(idx, _))| grid.point(idx))
                .collect()
        }
    }
}

/// Finds the borders of the foreground regions of a binary mask.
///
/// Every non-zero pixel is foreground and foreground is 8-connected. The borders
/// are found with the border following algorithm of Suzuki and Abe and are returned
/// in the raster-scan order of their first pixel. Outer borders run counter-clockwise
/// on screen starting from their top-left pixel. An isolated pixel yields a border
/// with a single point.
///
/// # Arguments
///
/// * `src` - The binary mask.
/// * `mode` - Which borders to return.
/// * `approx` - How border points are stored.
///
/// # Examples
///
/// ```
/// use quadpose_image::{Image, ImageSize};
/// use quadpose_imgproc::contours::{find_contours, ContourApproximation, Point2i, RetrievalMode};
///
/// let mut mask = Image::<u8, 1>::from_size_val(ImageSize { width: 6, height: 6 }, 0).unwrap();
/// for y in 1..5 {
///     for x in 1..5 {
///         mask.set_pixel(x, y, 0, 255).unwrap();
///     }
/// }
///
/// let contours = find_contours(&mask, RetrievalMode::External, ContourApproximation::Simple).unwrap();
/// assert_eq!(contours.len(), 1);
/// assert_eq!(
///     contours[0].points,
///     vec![Point2i::new(1, 1), Point2i::new(1, 4), Point2i::new(4, 4), Point2i::new(4, 1)]
/// );
/// ```
pub fn find_contours(
    src: &Image<u8, 1>,
    mode: RetrievalMode,
    approx: ContourApproximation,
) -> Result<Vec<Contour>, ImageError> {
    let (width, height) = (src.cols(), src.rows());
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let mut grid = LabelGrid::from_mask(src);
    let mut contours: Vec<Contour> = Vec::new();
    // label 1 is the image frame, border `k` carries label `k + 2`
    let mut nbd = 1i32;

    for y in 1..=height {
        let mut lnbd = 1i32;

        for x in 1..=width {
            let idx = y * grid.stride + x;
            let fij = grid.data[idx];
            if fij == 0 {
                continue;
            }

            let start = if fij == 1 && grid.data[idx - 1] == 0 {
                Some((BorderType::Outer, DIR_WEST))
            } else if fij >= 1 && grid.data[idx + 1] == 0 {
                if fij > 1 {
                    lnbd = fij;
                }
                Some((BorderType::Hole, DIR_EAST))
            } else {
                None
            };

            if let Some((border_type, from)) = start {
                nbd += 1;

                // the frame behaves as a hole border with no parent
                let (neighbour_type, neighbour_index, neighbour_parent) = if lnbd >= 2 {
                    let k = (lnbd - 2) as usize;
                    (contours[k].border_type, Some(k), contours[k].parent)
                } else {
                    (BorderType::Hole, None, None)
                };
                let parent = if border_type == neighbour_type {
                    neighbour_parent
                } else {
                    neighbour_index
                };

                let chain = grid.follow(idx, from, nbd);
                let points = compress(&grid, &chain, approx);

                contours.push(Contour {
                    points,
                    border_type,
                    parent,
                });
            }

            let f = grid.data[idx];
            if f != 1 {
                lnbd = f.abs();
            }
        }
    }

    log::trace!("found {} borders", contours.len());

    Ok(match mode {
        RetrievalMode::List => contours,
        RetrievalMode::External => contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .collect(),
    })
}

/// Finds the outermost borders of a binary mask, compressed to their direction changes.
///
/// This is [`find_contours`] with [`RetrievalMode::External`] and
/// [`ContourApproximation::Simple`], returning only the point lists.
pub fn find_external_contours(src: &Image<u8, 1>) -> Result<Vec<Vec<Point2i>>, ImageError> {
    Ok(
        find_contours(src, RetrievalMode::External, ContourApproximation::Simple)?
            .into_iter()
            .map(|c| c.points)
            .collect(),
    )
}
