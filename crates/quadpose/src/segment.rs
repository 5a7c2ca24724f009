use quadpose_image::{Image, ImageError};
use quadpose_imgproc::threshold::in_range;

use crate::config::ThresholdParams;

/// Binary mask of the pixels whose color lies inside the threshold bounds.
///
/// The frame is RGB and the mask has the same size, 255 for set pixels.
pub fn segment(frame: &Image<u8, 3>, params: &ThresholdParams) -> Result<Image<u8, 1>, ImageError> {
    let mut mask = Image::from_size_val(frame.size(), 0u8)?;
    in_range(frame, &mut mask, &params.lower(), &params.upper())?;
    log::trace!(
        "segmented {} pixels in {}",
        quadpose_imgproc::threshold::count_nonzero(&mask),
        frame.size()
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadpose_image::ImageSize;

    #[test]
    fn test_segment_rgb_order() -> Result<(), ImageError> {
        // a blue pixel, a red pixel, a magenta pixel
        let frame = Image::<u8, 3>::new(
            ImageSize {
                width: 3,
                height: 1,
            },
            vec![10, 20, 200, 200, 20, 10, 200, 100, 230],
        )?;
        let mask = segment(&frame, &ThresholdParams::default())?;
        assert_eq!(mask.as_slice(), &[255, 0, 255]);
        Ok(())
    }

    #[test]
    fn test_segment_inverted_bounds() -> Result<(), ImageError> {
        let frame = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 4,
                height: 4,
            },
            128,
        )?;
        let params = ThresholdParams {
            low_g: 200,
            high_g: 100,
            ..Default::default()
        };
        let mask = segment(&frame, &params)?;
        assert!(mask.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }
}
