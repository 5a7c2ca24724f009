use quadpose_image::Image;
use quadpose_imgproc::morphology::{close, open, Kernel, MorphologyError};

use crate::config::KernelConfig;

/// Removes specks and fills pinholes in a segmentation mask.
///
/// A closing followed by an opening with the same structuring element, i.e. the
/// passes dilate, erode, erode, dilate, each reading the output of the previous one.
#[derive(Debug, Clone)]
pub struct MaskCleaner {
    kernel: Kernel,
}

impl MaskCleaner {
    /// Create a cleaner with the given structuring element.
    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }

    /// Create a cleaner from its configuration.
    pub fn from_config(config: &KernelConfig) -> Result<Self, MorphologyError> {
        Ok(Self::new(Kernel::from_shape(
            config.shape.into(),
            config.width,
            config.height,
        )?))
    }

    /// The structuring element.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Clean `mask` and return the result.
    pub fn clean(&self, mask: &Image<u8, 1>) -> Result<Image<u8, 1>, MorphologyError> {
        let mut closed = Image::from_size_val(mask.size(), 0u8)?;
        let mut cleaned = Image::from_size_val(mask.size(), 0u8)?;

        close(mask, &mut closed, &self.kernel)?;
        open(&closed, &mut cleaned, &self.kernel)?;

        Ok(cleaned)
    }
}
