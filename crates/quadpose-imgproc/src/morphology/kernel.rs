use super::MorphologyError;

/// Shape of a structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    /// Every element active.
    Box,
    /// Only the centre row and centre column active.
    Cross,
    /// Filled ellipse inscribed in the kernel rectangle.
    Ellipse,
}

/// A binary structuring element with its anchor at the centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    data: Vec<bool>,
    width: usize,
    height: usize,
}

impl Kernel {
    /// Create a kernel from row-major data.
    ///
    /// # Errors
    ///
    /// The kernel must be non-empty, odd-sized, match its data length and have at
    /// least one active element.
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self, MorphologyError> {
        if width == 0 || height == 0 {
            return Err(MorphologyError::EmptyKernel(width, height));
        }
        if width % 2 == 0 || height % 2 == 0 {
            return Err(MorphologyError::EvenSizedKernel(width, height));
        }
        if data.len() != width * height {
            return Err(MorphologyError::KernelShapeMismatch(
                data.len(),
                width * height,
            ));
        }
        if !data.iter().any(|&v| v) {
            return Err(MorphologyError::AllKernelElementsInactive);
        }

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a kernel of the given shape and size.
    ///
    /// The ellipse follows the usual structuring-element rule: the row at vertical
    /// offset `dy` from the centre spans `round(c * sqrt(1 - dy² / r²))` columns on
    /// each side, where `r` and `c` are the half height and half width.
    ///
    /// # Examples
    ///
    /// ```
    /// use quadpose_imgproc::morphology::{Kernel, KernelShape};
    ///
    /// let kernel = Kernel::from_shape(KernelShape::Ellipse, 5, 5).unwrap();
    /// assert_eq!(kernel.num_active(), 17);
    /// ```
    pub fn from_shape(
        shape: KernelShape,
        width: usize,
        height: usize,
    ) -> Result<Self, MorphologyError> {
        if width == 0 || height == 0 {
            return Err(MorphologyError::EmptyKernel(width, height));
        }

        let r = (height / 2) as i64;
        let c = (width / 2) as i64;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut data = vec![false; width * height];
        for (i, row) in data.chunks_exact_mut(width).enumerate() {
            let dy = i as i64 - r;
            let (j1, j2) = match shape {
                KernelShape::Box => (0, width),
                KernelShape::Cross => {
                    if dy == 0 {
                        (0, width)
                    } else {
                        (c as usize, c as usize + 1)
                    }
                }
                KernelShape::Ellipse => {
                    if dy.abs() <= r {
                        let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round()
                            as i64;
                        let j1 = (c - dx).max(0) as usize;
                        let j2 = ((c + dx + 1) as usize).min(width);
                        (j1, j2)
                    } else {
                        (0, 0)
                    }
                }
            };
            row[j1..j2].iter_mut().for_each(|v| *v = true);
        }

        Self::new(width, height, data)
    }

    /// Width of the kernel.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the kernel.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the element at `(col, row)` is active.
    pub fn is_active(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.data[row * self.width + col]
    }

    /// Number of active elements.
    pub fn num_active(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Offsets `(dx, dy)` of the active elements relative to the anchor.
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let cx = (self.width / 2) as isize;
        let cy = (self.height / 2) as isize;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &active)| active)
            .map(|(idx, _)| {
                let col = (idx % self.width) as isize;
                let row = (idx / self.width) as isize;
                (col - cx, row - cy)
            })
            .collect()
    }
}
