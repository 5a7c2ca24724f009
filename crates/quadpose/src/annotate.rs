use quadpose_image::{Image, ImageError};
use quadpose_imgproc::draw::{draw_circle, draw_number, draw_polygon};

use crate::corners::OrderedCorners;
use crate::pipeline::FrameOutput;

/// Color of the marker outline and corner labels.
pub const OUTLINE_COLOR: [u8; 3] = [255, 0, 255];

/// Color of the corner rings.
pub const CORNER_COLOR: [u8; 3] = [0, 0, 255];

const CORNER_RADIUS: i64 = 8;
const CORNER_THICKNESS: i64 = 2;
const LABEL_SCALE: usize = 4;

/// The images shown for one processed frame.
#[derive(Debug, Clone)]
pub struct DisplayFrames {
    /// The input frame with the marker outline drawn on it.
    pub annotated: Image<u8, 3>,
    /// The cleaned segmentation mask.
    pub mask: Image<u8, 1>,
    /// Black canvas with the ordered corners ringed and labelled 1 to 4.
    pub corners: Image<u8, 3>,
}

/// Draw a ring of the given width, growing outward from `radius`.
fn draw_ring(img: &mut Image<u8, 3>, center: (i64, i64), radius: i64, color: [u8; 3]) {
    for r in radius..radius + CORNER_THICKNESS {
        draw_circle(img, center, r, color, false);
    }
}

/// Draw the ordered corners on `img`, ringed and labelled by slot.
pub fn draw_corners(img: &mut Image<u8, 3>, corners: &OrderedCorners) {
    for (slot, p) in corners.to_array().iter().enumerate() {
        let center = (p[0].round() as i64, p[1].round() as i64);
        draw_ring(img, center, CORNER_RADIUS, CORNER_COLOR);

        // the label sits above and right of the corner, like a text baseline
        let origin = (center.0, center.1 - 5 * LABEL_SCALE as i64);
        draw_number(img, origin, slot as u32 + 1, OUTLINE_COLOR, LABEL_SCALE);
    }
}

/// Build the display images for a frame and its pipeline output.
pub fn render(frame: &Image<u8, 3>, output: &FrameOutput) -> Result<DisplayFrames, ImageError> {
    let mut annotated = frame.clone();
    let mut corners = Image::from_size_val(frame.size(), 0u8)?;

    if let Some(detection) = &output.detection {
        let outline: Vec<(i64, i64)> = detection
            .candidate
            .vertices
            .iter()
            .map(|v| (v.x as i64, v.y as i64))
            .collect();
        draw_polygon(&mut annotated, &outline, OUTLINE_COLOR, 1);

        if let Some(ordered) = &detection.corners {
            draw_corners(&mut corners, ordered);
        }
    }

    Ok(DisplayFrames {
        annotated,
        mask: output.mask.clone(),
        corners,
    })
}
