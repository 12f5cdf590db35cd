//! Software raster implementing [`DrawingSurface`].
//!
//! Pixels are stored as premultiplied RGBA `f32` in [0, 1]. Shapes are
//! sampled at pixel centers without anti-aliasing, so the same draw calls
//! always produce the same buffer.

use nalgebra::{Point2, Vector2};

use crate::surface::{Composite, DrawingSurface, GradientStop, Rgba, TextRotation, TextStyle};

/// Premultiplied RGBA pixel.
pub type Pixel = [f32; 4];

/// A fixed-size pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    composite: Composite,
    pixels: Vec<Pixel>,
}

impl Raster {
    /// Creates a transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            composite: Composite::SourceOver,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    /// Current compositing mode.
    pub fn composite(&self) -> Composite {
        self.composite
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[(y * self.width + x) as usize])
    }

    /// Pixel at `(x, y)` as straight 8-bit RGBA.
    pub fn pixel_rgba8(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixel(x, y).map(to_rgba8)
    }

    /// Whole buffer as straight 8-bit RGBA, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| to_rgba8(*p)).collect()
    }

    /// Composites `src` onto the pixel at `(x, y)`; out-of-bounds writes are
    /// dropped.
    fn blend(&mut self, x: i64, y: i64, src: Pixel) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = (y as usize) * self.width as usize + x as usize;
        let dst = &mut self.pixels[idx];
        match self.composite {
            Composite::SourceOver => {
                let k = 1.0 - src[3];
                for c in 0..4 {
                    dst[c] = src[c] + dst[c] * k;
                }
            }
            Composite::Lighter => {
                for c in 0..4 {
                    dst[c] = (src[c] + dst[c]).min(1.0);
                }
            }
        }
    }

    /// Pixel index range whose centers fall inside `[lo, hi)`.
    fn span(lo: f64, hi: f64, limit: u32) -> std::ops::Range<i64> {
        let start = (lo - 0.5).ceil().max(0.0) as i64;
        let end = ((hi - 0.5).ceil() as i64).min(limit as i64);
        start..end.max(start)
    }
}

impl DrawingSurface for Raster {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
        self.composite = Composite::SourceOver;
    }

    fn fill_rect(&mut self, origin: Point2<f64>, width: f64, height: f64, color: Rgba) {
        let src = color.premultiplied();
        for y in Self::span(origin.y, origin.y + height, self.height) {
            for x in Self::span(origin.x, origin.x + width, self.width) {
                self.blend(x, y, src);
            }
        }
    }

    fn stroke_line(&mut self, from: Point2<f64>, to: Point2<f64>, width: f64, color: Rgba) {
        let src = color.premultiplied();
        let half = width / 2.0;
        let min = from.coords.inf(&to.coords);
        let max = from.coords.sup(&to.coords);
        let seg = to - from;
        let len_sq = seg.norm_squared();

        for y in Self::span(min.y - half, max.y + half, self.height) {
            for x in Self::span(min.x - half, max.x + half, self.width) {
                let p = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
                let t = if len_sq > 0.0 {
                    ((p - from).dot(&seg) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let closest = from + seg * t;
                if (p - closest).norm() <= half {
                    self.blend(x, y, src);
                }
            }
        }
    }

    fn fill_text(&mut self, text: &str, at: Point2<f64>, style: &TextStyle) {
        let src = style.color.premultiplied();
        let scale = ((style.size_px / 6.0).round() as i64).max(1);
        let (ax, ay) = (at.x.floor() as i64, at.y.floor() as i64);
        let mut pen = 0i64;

        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_W {
                        if bits & (0b100 >> col) == 0 {
                            continue;
                        }
                        for sy in 0..scale {
                            for sx in 0..scale {
                                // Local frame: x along the baseline, y down,
                                // glyph sitting on the baseline
                                let lx = pen + col * scale + sx;
                                let ly = (row as i64 - GLYPH_H) * scale + sy;
                                let (px, py) = match style.rotation {
                                    TextRotation::Horizontal => (ax + lx, ay + ly),
                                    TextRotation::Upward => (ax + ly, ay - lx - 1),
                                };
                                self.blend(px, py, src);
                            }
                        }
                    }
                }
            }
            pen += (GLYPH_W + 1) * scale;
        }
    }

    fn set_composite(&mut self, mode: Composite) {
        self.composite = mode;
    }

    fn fill_radial_disk(&mut self, center: Point2<f64>, radius: f64, stops: &[GradientStop]) {
        if radius <= 0.0 || stops.is_empty() || !center.x.is_finite() || !center.y.is_finite() {
            return;
        }
        let r = Vector2::new(radius, radius);
        let (min, max) = (center - r, center + r);

        for y in Self::span(min.y, max.y, self.height) {
            for x in Self::span(min.x, max.x, self.width) {
                let p = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
                let d = (p - center).norm();
                if d <= radius {
                    let src = sample_gradient(stops, (d / radius) as f32);
                    self.blend(x, y, src);
                }
            }
        }
    }
}

/// Interpolates gradient stops in premultiplied space.
fn sample_gradient(stops: &[GradientStop], t: f32) -> Pixel {
    let first = stops[0];
    if t <= first.offset {
        return first.color.premultiplied();
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let k = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            let (ca, cb) = (a.color.premultiplied(), b.color.premultiplied());
            let mut out = [0.0; 4];
            for c in 0..4 {
                out[c] = ca[c] + (cb[c] - ca[c]) * k;
            }
            return out;
        }
    }
    stops[stops.len() - 1].color.premultiplied()
}

fn to_rgba8(p: Pixel) -> [u8; 4] {
    let a = p[3].clamp(0.0, 1.0);
    let channel = |c: f32| {
        let straight = if a > 0.0 { c / a } else { 0.0 };
        (straight.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    [channel(p[0]), channel(p[1]), channel(p[2]), (a * 255.0).round() as u8]
}

// =============================================================================
// BITMAP FONT
// =============================================================================

const GLYPH_W: i64 = 3;
const GLYPH_H: i64 = 5;

/// 3x5 glyphs for the characters axis labels need. Bit 2 is the left column.
fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        'X' | 'x' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' | 'y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        _ => return None,
    };
    Some(rows)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fill_rect_covers_pixel_centers() {
        let mut r = Raster::new(10, 10);
        r.fill_rect(Point2::new(2.0, 3.0), 3.0, 2.0, Rgba::WHITE);

        assert_eq!(r.pixel_rgba8(2, 3), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel_rgba8(4, 4), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel_rgba8(5, 3), Some([0, 0, 0, 0]));
        assert_eq!(r.pixel_rgba8(2, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_lighter_adds_and_clamps() {
        let mut r = Raster::new(1, 1);
        r.set_composite(Composite::Lighter);
        let c = Rgba::rgba(0, 128, 255, 0.4);
        r.fill_rect(Point2::origin(), 1.0, 1.0, c);
        r.fill_rect(Point2::origin(), 1.0, 1.0, c);
        let p = r.pixel(0, 0).unwrap();
        assert_relative_eq!(p[3], 0.8, epsilon = 1e-6);

        for _ in 0..5 {
            r.fill_rect(Point2::origin(), 1.0, 1.0, c);
        }
        let p = r.pixel(0, 0).unwrap();
        assert_relative_eq!(p[3], 1.0);
        assert_relative_eq!(p[2], 1.0);
    }

    #[test]
    fn test_source_over_occludes() {
        let mut r = Raster::new(1, 1);
        r.fill_rect(Point2::origin(), 1.0, 1.0, Rgba::rgb(255, 0, 0));
        r.fill_rect(Point2::origin(), 1.0, 1.0, Rgba::rgb(0, 0, 255));
        assert_eq!(r.pixel_rgba8(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_clear_resets_composite() {
        let mut r = Raster::new(2, 2);
        r.set_composite(Composite::Lighter);
        r.fill_rect(Point2::origin(), 2.0, 2.0, Rgba::WHITE);
        r.clear();
        assert_eq!(r.composite(), Composite::SourceOver);
        assert_eq!(r.pixel(1, 1), Some([0.0; 4]));
    }

    #[test]
    fn test_vertical_line() {
        let mut r = Raster::new(10, 10);
        r.stroke_line(Point2::new(4.0, 1.0), Point2::new(4.0, 8.0), 1.5, Rgba::WHITE);
        assert_eq!(r.pixel_rgba8(3, 5).map(|p| p[3]), Some(255));
        assert_eq!(r.pixel_rgba8(4, 5).map(|p| p[3]), Some(255));
        assert_eq!(r.pixel_rgba8(6, 5).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_radial_disk_fades_to_rim() {
        let mut r = Raster::new(41, 41);
        let stops = [
            GradientStop::new(0.0, Rgba::rgba(0, 128, 255, 0.4)),
            GradientStop::new(0.5, Rgba::rgba(0, 255, 128, 0.4)),
            GradientStop::new(1.0, Rgba::rgba(255, 255, 0, 0.0)),
        ];
        r.fill_radial_disk(Point2::new(20.5, 20.5), 20.0, &stops);

        let center = r.pixel(20, 20).unwrap();
        assert_relative_eq!(center[3], 0.4, epsilon = 1e-6);
        assert_relative_eq!(center[2], 0.4, epsilon = 1e-6);

        // Outside the radius nothing is painted
        assert_eq!(r.pixel(0, 0), Some([0.0; 4]));

        // Alpha decreases outward
        let mid = r.pixel(30, 20).unwrap();
        let edge = r.pixel(39, 20).unwrap();
        assert!(center[3] >= mid[3] && mid[3] > edge[3]);
    }

    #[test]
    fn test_nan_disk_is_ignored() {
        let mut r = Raster::new(4, 4);
        let stops = [GradientStop::new(0.0, Rgba::WHITE)];
        r.fill_radial_disk(Point2::new(f64::NAN, 1.0), 2.0, &stops);
        assert!(r.to_rgba8().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_text_paints_known_glyphs_only() {
        let mut r = Raster::new(40, 20);
        let style = TextStyle::new(6.0, Rgba::WHITE);
        r.fill_text("??", Point2::new(2.0, 10.0), &style);
        assert!(r.to_rgba8().iter().all(|b| *b == 0));

        r.fill_text("1", Point2::new(2.0, 10.0), &style);
        // Bottom row of '1' is solid, one pixel above the baseline
        assert_eq!(r.pixel_rgba8(2, 9).map(|p| p[3]), Some(255));
        assert_eq!(r.pixel_rgba8(4, 9).map(|p| p[3]), Some(255));
        assert_eq!(r.pixel_rgba8(2, 10).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_upward_text_stays_left_of_anchor() {
        let mut r = Raster::new(20, 20);
        let style = TextStyle::new(6.0, Rgba::WHITE).upward();
        r.fill_text("Y", Point2::new(10.0, 15.0), &style);
        let bytes = r.to_rgba8();
        for y in 0..20u32 {
            for x in 0..20u32 {
                let a = bytes[((y * 20 + x) * 4 + 3) as usize];
                if a > 0 {
                    assert!(x < 10 && x >= 5, "pixel at ({x},{y})");
                    assert!(y < 15 && y >= 12, "pixel at ({x},{y})");
                }
            }
        }
    }
}
