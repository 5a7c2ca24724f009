use quadpose_image::{Image, ImageError};

use super::{Kernel, MorphologyError};
use crate::parallel;

#[derive(Clone, Copy)]
enum Reduce {
    Max,
    Min,
}

fn check_sizes<const C: usize>(
    src: &Image<u8, C>,
    dst: &Image<u8, C>,
) -> Result<(), MorphologyError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }
    Ok(())
}

// Neighbours falling outside the image are skipped, which leaves the value
// untouched at the border for both dilation and erosion.
fn morph<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel,
    reduce: Reduce,
) -> Result<(), MorphologyError> {
    check_sizes(src, dst)?;

    let offsets = kernel.offsets();
    let (cols, rows) = (src.cols() as isize, src.rows() as isize);
    let src_data = src.as_slice();

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        let y = y as isize;
        for (x, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
            let x = x as isize;
            for (ch, dst_val) in dst_pixel.iter_mut().enumerate() {
                let mut acc = match reduce {
                    Reduce::Max => u8::MIN,
                    Reduce::Min => u8::MAX,
                };
                for &(dx, dy) in offsets.iter() {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= cols || ny >= rows {
                        continue;
                    }
                    let val = src_data[((ny * cols + nx) as usize) * C + ch];
                    acc = match reduce {
                        Reduce::Max => acc.max(val),
                        Reduce::Min => acc.min(val),
                    };
                }
                *dst_val = acc;
            }
        }
    });

    Ok(())
}

/// Dilate an image with the given structuring element.
///
/// Each output sample is the maximum of the source samples covered by the active
/// kernel elements. Samples beyond the image border are ignored.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image, same size as `src`.
/// * `kernel` - The structuring element anchored at its centre.
pub fn dilate<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError> {
    morph(src, dst, kernel, Reduce::Max)
}

/// Erode an image with the given structuring element.
///
/// Each output sample is the minimum of the source samples covered by the active
/// kernel elements. Samples beyond the image border are ignored.
pub fn erode<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError> {
    morph(src, dst, kernel, Reduce::Min)
}

/// Morphological closing: dilation followed by erosion.
///
/// Fills holes and gaps smaller than the kernel.
pub fn close<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError> {
    let mut tmp = Image::from_size_val(src.size(), 0u8)?;
    dilate(src, &mut tmp, kernel)?;
    erode(&tmp, dst, kernel)
}

/// Morphological opening: erosion followed by dilation.
///
/// Removes specks smaller than the kernel.
pub fn open<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError> {
    let mut tmp = Image::from_size_val(src.size(), 0u8)?;
    erode(src, &mut tmp, kernel)?;
    dilate(&tmp, dst, kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::KernelShape;
    use quadpose_image::ImageSize;

    fn mask(width: usize, height: usize, data: Vec<u8>) -> Result<Image<u8, 1>, ImageError> {
        Image::new(ImageSize { width, height }, data)
    }

    #[test]
    fn test_dilate_cross() -> Result<(), MorphologyError> {
        #[rustfmt::skip]
        let src = mask(5, 5, vec![
            0, 0, 0, 0, 0,
            0, 0, 0, 0, 0,
            0, 0, 255, 0, 0,
            0, 0, 0, 0, 0,
            0, 0, 0, 0, 0,
        ])?;
        let kernel = Kernel::from_shape(KernelShape::Cross, 3, 3)?;
        let mut dst = Image::from_size_val(src.size(), 0)?;

        dilate(&src, &mut dst, &kernel)?;

        #[rustfmt::skip]
        let expected = [
            0, 0, 0, 0, 0,
            0, 0, 255, 0, 0,
            0, 255, 255, 255, 0,
            0, 0, 255, 0, 0,
            0, 0, 0, 0, 0,
        ];
        assert_eq!(dst.as_slice(), &expected);

        Ok(())
    }

    #[test]
    fn test_erode_box_ignores_border() -> Result<(), MorphologyError> {
        #[rustfmt::skip]
        let src = mask(4, 3, vec![
            255, 255, 255, 255,
            255, 255, 255, 255,
            255, 255, 255, 0,
        ])?;
        let kernel = Kernel::from_shape(KernelShape::Box, 3, 3)?;
        let mut dst = Image::from_size_val(src.size(), 0)?;

        erode(&src, &mut dst, &kernel)?;

        #[rustfmt::skip]
        let expected = [
            255, 255, 255, 255,
            255, 255, 0, 0,
            255, 255, 0, 0,
        ];
        assert_eq!(dst.as_slice(), &expected);

        Ok(())
    }

    #[test]
    fn test_open_removes_speck() -> Result<(), MorphologyError> {
        let mut data = vec![0u8; 7 * 7];
        data[3 * 7 + 3] = 255;
        let src = mask(7, 7, data)?;
        let kernel = Kernel::from_shape(KernelShape::Ellipse, 5, 5)?;
        let mut dst = Image::from_size_val(src.size(), 0)?;

        open(&src, &mut dst, &kernel)?;
        assert!(dst.as_slice().iter().all(|&v| v == 0));

        Ok(())
    }

    #[test]
    fn test_close_fills_hole() -> Result<(), MorphologyError> {
        let mut data = vec![255u8; 7 * 7];
        data[3 * 7 + 3] = 0;
        let src = mask(7, 7, data)?;
        let kernel = Kernel::from_shape(KernelShape::Box, 3, 3)?;
        let mut dst = Image::from_size_val(src.size(), 0)?;

        close(&src, &mut dst, &kernel)?;
        assert!(dst.as_slice().iter().all(|&v| v == 255));

        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), MorphologyError> {
        let src = mask(2, 2, vec![0; 4])?;
        let mut dst = mask(3, 2, vec![0; 6])?;
        let kernel = Kernel::from_shape(KernelShape::Box, 3, 3)?;
        assert_eq!(
            dilate(&src, &mut dst, &kernel),
            Err(MorphologyError::Image(ImageError::InvalidImageSize(
                2, 2, 3, 2
            )))
        );

        Ok(())
    }
}
