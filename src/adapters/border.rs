//! Photo bordering — hand-drawn-style border rendering.
//!
//! Draws a wobbly border around a member photo, matching the style of
//! the photos already on the lab website. The wobble comes from
//! perpendicular perturbation of points along each edge, seeded so the
//! same (photo, seed) pair always renders byte-identical output.

use std::f32::consts::PI;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ImageError;

/// Square output size for website photos.
const OUTPUT_SIZE: u32 = 400;

/// Minimum acceptable input dimension.
const MIN_DIMENSION: u32 = 200;

/// Border appearance settings.
#[derive(Debug, Clone, Copy)]
pub struct BorderStyle {
    /// Stroke color (RGB).
    pub color: [u8; 3],
    /// Stroke width in pixels.
    pub width: u32,
    /// Maximum perpendicular perturbation in pixels.
    pub wobble: f32,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            color: [0, 105, 62],
            width: 8,
            wobble: 1.5,
        }
    }
}

/// Derive a stable border seed from a subject id (FNV-1a), so
/// reprocessing the same member's photo reproduces the same border
/// across process restarts.
pub fn seed_for(subject_id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in subject_id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Renders hand-drawn borders onto member photos.
#[derive(Debug, Clone)]
pub struct PhotoBorderer {
    style: BorderStyle,
}

impl PhotoBorderer {
    pub fn new(style: BorderStyle) -> Self {
        Self { style }
    }

    /// Check that the bytes decode to a usable photo.
    pub fn validate(&self, bytes: &[u8]) -> Result<(), ImageError> {
        let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let (width, height) = (img.width(), img.height());
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(ImageError::TooSmall {
                width,
                height,
                min: MIN_DIMENSION,
            });
        }
        Ok(())
    }

    /// Decode, border, and re-encode as PNG.
    pub fn apply_border_bytes(&self, bytes: &[u8], seed: u64) -> Result<Vec<u8>, ImageError> {
        let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let bordered = self.apply_border(&img, seed);

        let mut out = Vec::new();
        DynamicImage::ImageRgba8(bordered)
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Ok(out)
    }

    /// Render the bordered photo: square crop, standard resize, then a
    /// three-pass wobbly stroke on a padded transparent canvas.
    pub fn apply_border(&self, input: &DynamicImage, seed: u64) -> RgbaImage {
        let mut rng = StdRng::seed_from_u64(seed);

        let square = make_square(&input.to_rgba8());
        let photo = imageops::resize(&square, OUTPUT_SIZE, OUTPUT_SIZE, FilterType::Lanczos3);

        let padding = self.style.width + self.style.wobble.ceil() as u32 + 2;
        let mut canvas = RgbaImage::from_pixel(
            OUTPUT_SIZE + 2 * padding,
            OUTPUT_SIZE + 2 * padding,
            Rgba([255, 255, 255, 0]),
        );
        imageops::overlay(&mut canvas, &photo, i64::from(padding), i64::from(padding));

        self.draw_border(
            &mut canvas,
            &mut rng,
            padding as f32,
            OUTPUT_SIZE as f32,
            OUTPUT_SIZE as f32,
        );
        canvas
    }

    /// Draw the border as three overlapping passes with narrowing
    /// stroke widths; the overlap is what reads as hand-drawn.
    fn draw_border(&self, canvas: &mut RgbaImage, rng: &mut StdRng, offset: f32, w: f32, h: f32) {
        for pass in 0..3u32 {
            if self.style.width <= pass {
                continue;
            }
            let stroke = (self.style.width - pass) as f32;

            let corners = [
                ((offset, offset), (offset + w, offset)),
                ((offset + w, offset), (offset + w, offset + h)),
                ((offset + w, offset + h), (offset, offset + h)),
                ((offset, offset + h), (offset, offset)),
            ];
            for (start, end) in corners {
                let points = wobbly_line(rng, start, end, self.style.wobble);
                self.stroke_polyline(canvas, &points, stroke);
            }
        }
    }

    fn stroke_polyline(&self, canvas: &mut RgbaImage, points: &[(f32, f32)], stroke: f32) {
        let radius = (stroke / 2.0).max(0.5);
        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            let steps = (length * 2.0).ceil().max(1.0) as u32;
            for s in 0..=steps {
                let t = s as f32 / steps as f32;
                self.stamp(canvas, x0 + t * (x1 - x0), y0 + t * (y1 - y0), radius);
            }
        }
    }

    /// Stamp an opaque filled disc at (cx, cy).
    fn stamp(&self, canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32) {
        let color = Rgba([self.style.color[0], self.style.color[1], self.style.color[2], 255]);
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;

        for px in x0..=x1 {
            for py in y0..=y1 {
                if px < 0
                    || py < 0
                    || px as u32 >= canvas.width()
                    || py as u32 >= canvas.height()
                {
                    continue;
                }
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    canvas.put_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}

/// Center-crop to a square.
fn make_square(img: &RgbaImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width == height {
        return img.clone();
    }
    let size = width.min(height);
    let left = (width - size) / 2;
    let top = (height - size) / 2;
    imageops::crop_imm(img, left, top, size, size).to_image()
}

/// Points along a segment, each interior point nudged perpendicular to
/// the segment. The nudge is scaled by a sine envelope so the line
/// stays pinned at the corners.
fn wobbly_line(
    rng: &mut StdRng,
    start: (f32, f32),
    end: (f32, f32),
    wobble: f32,
) -> Vec<(f32, f32)> {
    const STEP: f32 = 4.0;

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return vec![start, end];
    }

    let num_points = ((length / STEP) as usize).max(2);
    let perp_x = -dy / length;
    let perp_y = dx / length;

    let mut points = Vec::with_capacity(num_points + 1);
    for i in 0..=num_points {
        let t = i as f32 / num_points as f32;
        let mut x = start.0 + t * dx;
        let mut y = start.1 + t * dy;

        // Endpoints stay exact so adjacent edges meet.
        if i > 0 && i < num_points {
            let offset: f32 = rng.gen_range(-wobble..wobble);
            let envelope = (t * PI).sin() * 0.5 + 0.5;
            x += perp_x * offset * envelope;
            y += perp_y * offset * envelope;
        }
        points.push((x, y));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_photo(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        DynamicImage::ImageRgba8(img)
    }

    fn borderer() -> PhotoBorderer {
        PhotoBorderer::new(BorderStyle::default())
    }

    #[test]
    fn same_seed_is_byte_identical() {
        let photo = test_photo(256, 256);
        let a = borderer().apply_border(&photo, 7);
        let b = borderer().apply_border(&photo, 7);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn different_seeds_differ_in_border() {
        let photo = test_photo(256, 256);
        let a = borderer().apply_border(&photo, 1);
        let b = borderer().apply_border(&photo, 2);
        assert_eq!(a.dimensions(), b.dimensions());
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn output_exceeds_input_dimensions() {
        let photo = test_photo(256, 320);
        let out = borderer().apply_border(&photo, 3);
        assert!(out.width() > 320);
        assert!(out.height() > 320);
        // Padding extends beyond the standardized photo frame too.
        assert!(out.width() > OUTPUT_SIZE);
        assert!(out.height() > OUTPUT_SIZE);
    }

    #[test]
    fn border_pixels_are_stroke_colored() {
        let photo = test_photo(256, 256);
        let style = BorderStyle::default();
        let out = PhotoBorderer::new(style).apply_border(&photo, 11);

        // Sample along the top edge at the frame line.
        let padding = style.width + style.wobble.ceil() as u32 + 2;
        let mut hits = 0;
        for x in (padding..padding + OUTPUT_SIZE).step_by(8) {
            let px = out.get_pixel(x, padding);
            if px.0 == [style.color[0], style.color[1], style.color[2], 255] {
                hits += 1;
            }
        }
        assert!(hits > 0, "no stroke-colored pixels found on the top edge");
    }

    #[test]
    fn non_square_input_is_center_cropped() {
        let img = RgbaImage::from_pixel(300, 200, Rgba([1, 2, 3, 255]));
        let square = make_square(&img);
        assert_eq!(square.dimensions(), (200, 200));
    }

    #[test]
    fn wobbly_line_pins_endpoints() {
        let mut rng = StdRng::seed_from_u64(9);
        let points = wobbly_line(&mut rng, (10.0, 10.0), (110.0, 10.0), 1.5);
        assert!(points.len() > 2);
        assert_eq!(*points.first().unwrap(), (10.0, 10.0));
        assert_eq!(*points.last().unwrap(), (110.0, 10.0));
        // Interior points stay within the wobble bound.
        for (_, y) in &points[1..points.len() - 1] {
            assert!((y - 10.0).abs() <= 1.5);
        }
    }

    #[test]
    fn validate_rejects_small_images() {
        let mut bytes = Vec::new();
        test_photo(100, 100)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let err = borderer().validate(&bytes);
        assert!(matches!(err, Err(ImageError::TooSmall { .. })));
    }

    #[test]
    fn validate_rejects_garbage() {
        let err = borderer().validate(b"not an image");
        assert!(matches!(err, Err(ImageError::Decode(_))));
    }

    #[test]
    fn bytes_roundtrip_produces_png() {
        let mut bytes = Vec::new();
        test_photo(256, 256)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let out = borderer().apply_border_bytes(&bytes, 5).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert!(decoded.width() > 256);

        // Deterministic at the byte level as well.
        let again = borderer().apply_border_bytes(&bytes, 5).unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn seed_for_is_stable() {
        assert_eq!(seed_for("U12345"), seed_for("U12345"));
        assert_ne!(seed_for("U12345"), seed_for("U54321"));
    }
}
