use quadpose_image::Image;

/// Set a pixel's color, ignoring coordinates outside the image.
#[inline]
fn set_pixel<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C]) {
    if x >= 0 && x < img.cols() as i64 && y >= 0 && y < img.rows() as i64 {
        let start = (y as usize * img.cols() + x as usize) * C;
        img.as_slice_mut()[start..start + C].copy_from_slice(&color);
    }
}

// Stamp a square of side `thickness` centred on (x, y).
#[inline]
fn stamp<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C], thickness: usize) {
    if thickness <= 1 {
        set_pixel(img, x, y, color);
        return;
    }
    let half = thickness as i64 / 2;
    for j in -half..=half {
        for i in -half..=half {
            set_pixel(img, x + i, y + j, color);
        }
    }
}

/// Draws a line on an image inplace using Bresenham's line algorithm.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as a tuple of (x, y).
/// * `p1` - The end point of the line as a tuple of (x, y).
/// * `color` - The color of the line as an array of `C` elements.
/// * `thickness` - The thickness of the line, approximated with square stamps.
pub fn draw_line<const C: usize>(
    img: &mut Image<u8, C>,
    p0: (i64, i64),
    p1: (i64, i64),
    color: [u8; C],
    thickness: usize,
) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx - dy;

    loop {
        stamp(img, x0, y0, color, thickness);

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draws the outline of a closed polygon inplace.
///
/// Consecutive vertices are joined and the last vertex is joined back to the first.
pub fn draw_polygon<const C: usize>(
    img: &mut Image<u8, C>,
    points: &[(i64, i64)],
    color: [u8; C],
    thickness: usize,
) {
    if points.is_empty() {
        return;
    }
    for (i, &p0) in points.iter().enumerate() {
        let p1 = points[(i + 1) % points.len()];
        draw_line(img, p0, p1, color, thickness);
    }
}

/// Draws a circle inplace.
///
/// With `filled` set every pixel within `radius` of the centre is painted,
/// otherwise only the ring traced by the midpoint circle algorithm.
pub fn draw_circle<const C: usize>(
    img: &mut Image<u8, C>,
    center: (i64, i64),
    radius: i64,
    color: [u8; C],
    filled: bool,
) {
    let (cx, cy) = center;
    if radius <= 0 {
        set_pixel(img, cx, cy, color);
        return;
    }

    if filled {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    set_pixel(img, cx + dx, cy + dy, color);
                }
            }
        }
        return;
    }

    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            set_pixel(img, cx + px, cy + py, color);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

// 3x5 bitmaps for the decimal digits, one row per entry, msb on the left.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Draws a decimal number with a blocky 3x5 font inplace.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `origin` - Top-left corner of the first glyph.
/// * `value` - The number to draw.
/// * `color` - The color of the glyphs.
/// * `scale` - Side length in pixels of one glyph cell.
pub fn draw_number<const C: usize>(
    img: &mut Image<u8, C>,
    origin: (i64, i64),
    value: u32,
    color: [u8; C],
    scale: usize,
) {
    let scale = scale.max(1) as i64;
    let digits = value.to_string();
    for (n, ch) in digits.bytes().enumerate() {
        let glyph = &DIGIT_GLYPHS[(ch - b'0') as usize];
        let gx = origin.0 + n as i64 * 4 * scale;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for j in 0..scale {
                    for i in 0..scale {
                        set_pixel(
                            img,
                            gx + col as i64 * scale + i,
                            origin.1 + row as i64 * scale + j,
                            color,
                        );
                    }
                }
            }
        }
    }
}
