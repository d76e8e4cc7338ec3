use super::font::{glyph, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use image::{ImageBuffer, Rgba, RgbaImage};

/// Drawing surface for a single frame.
///
/// A canvas is created inside one render call and owned by it; it is released
/// when the call returns, whichever way it returns.
pub(crate) struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> Self {
        Canvas {
            image: ImageBuffer::from_pixel(width, height, Rgba(background)),
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn plot(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        let (width, height) = (self.image.width() as i64, self.image.height() as i64);
        if (0..width).contains(&x) && (0..height).contains(&y) {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Filled circle centred on `(cx, cy)`, clipped to the image.
    pub fn fill_disk(&mut self, cx: f64, cy: f64, radius: f64, color: [u8; 4]) {
        let color = Rgba(color);
        let r2 = radius * radius;
        let x_min = (cx - radius).floor().max(0.0) as i64;
        let y_min = (cy - radius).floor().max(0.0) as i64;
        let x_max = (cx + radius).ceil().min(self.image.width() as f64) as i64;
        let y_max = (cy + radius).ceil().min(self.image.height() as f64) as i64;

        for py in y_min..=y_max {
            for px in x_min..=x_max {
                let dx = px as f64 + 0.5 - cx;
                let dy = py as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.plot(px, py, color);
                }
            }
        }
    }

    /// Straight segment of the given pixel width, stamped at half pixel steps.
    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: [u8; 4]) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = ((dx.abs().max(dy.abs())) * 2.0).ceil().max(1.0) as usize;
        let radius = (width / 2.0).max(0.5);

        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let (x, y) = (from.0 + dx * t, from.1 + dy * t);
            if radius <= 0.5 {
                self.plot(x.floor() as i64, y.floor() as i64, Rgba(color));
            } else {
                self.fill_disk(x, y, radius, color);
            }
        }
    }

    /// Text with its top-left corner at `(left, top)`.
    pub fn text(&mut self, left: f64, top: f64, text: &str, scale: u32, color: [u8; 4]) {
        let color = Rgba(color);
        let (left, top) = (left.round() as i64, top.round() as i64);
        let scale = scale.max(1) as i64;

        for (i, c) in text.chars().enumerate() {
            let origin_x = left + i as i64 * GLYPH_ADVANCE as i64 * scale;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            self.plot(
                                origin_x + col as i64 * scale + sx,
                                top + row as i64 * scale + sy,
                                color,
                            );
                        }
                    }
                }
            }
        }
    }

    /// Text horizontally centred on `cx` with its bottom edge at `bottom`.
    pub fn text_above(&mut self, cx: f64, bottom: f64, text: &str, scale: u32, color: [u8; 4]) {
        let width = text_width(text, scale) as f64;
        let height = (GLYPH_HEIGHT * scale) as f64;
        self.text(cx - width / 2.0, bottom - height, text, scale, color);
    }
}
