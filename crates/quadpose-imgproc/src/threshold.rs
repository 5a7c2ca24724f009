use quadpose_image::{Image, ImageError};

use crate::parallel;

/// Value written to the mask for samples inside the range.
pub const MASK_SET: u8 = 255;

/// Value written to the mask for samples outside the range.
pub const MASK_UNSET: u8 = 0;

/// Apply a range threshold to an image.
///
/// A mask pixel is set to [`MASK_SET`] when every channel of the source pixel lies
/// within the inclusive range `[lower_bound[c], upper_bound[c]]`, and to
/// [`MASK_UNSET`] otherwise. Bounds are given in the channel order of the source
/// image. A channel whose lower bound exceeds its upper bound matches nothing.
///
/// # Arguments
///
/// * `src` - The input image of an arbitrary number of channels and type.
/// * `dst` - The output single channel mask with the same size as `src`.
/// * `lower_bound` - The inclusive lower bound for each channel.
/// * `upper_bound` - The inclusive upper bound for each channel.
///
/// # Examples
///
/// ```
/// use quadpose_image::{Image, ImageSize};
/// use quadpose_imgproc::threshold::in_range;
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 3>::new(ImageSize { width: 2, height: 1 }, data).unwrap();
///
/// let mut mask = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// in_range(&image, &mut mask, &[100, 150, 0], &[200, 200, 200]).unwrap();
/// assert_eq!(mask.as_slice(), &[255, 0]);
/// ```
pub fn in_range<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<u8, 1>,
    lower_bound: &[T; C],
    upper_bound: &[T; C],
) -> Result<(), ImageError>
where
    T: Clone + Send + Sync + PartialOrd,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    // parallelize the operation by rows
    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let is_in_range = src_pixel
            .iter()
            .zip(lower_bound.iter().zip(upper_bound.iter()))
            .all(|(src_val, (lower, upper))| src_val >= lower && src_val <= upper);
        dst_pixel[0] = if is_in_range { MASK_SET } else { MASK_UNSET };
    });

    Ok(())
}

/// Count the set samples of a binary mask.
pub fn count_nonzero(mask: &Image<u8, 1>) -> usize {
    mask.as_slice().iter().filter(|&&v| v != 0).count()
}
