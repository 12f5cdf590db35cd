//! Drawing surface abstraction.
//!
//! The heatmap renderer only talks to a [`DrawingSurface`]. Two
//! implementations ship with the crate:
//!
//! - [`Raster`](crate::raster::Raster): a real pixel buffer, used for PNG
//!   output and pixel-level checks.
//! - [`DrawLog`]: records every call as a [`DrawOp`], used to inspect what a
//!   render pass asked for without looking at pixels.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// An sRGB color with straight (non-premultiplied) alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Color with alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from `0xRRGGBB`.
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Premultiplied linear components `[r*a, g*a, b*a, a]`.
    pub fn premultiplied(&self) -> [f32; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [
            self.r as f32 / 255.0 * a,
            self.g as f32 / 255.0 * a,
            self.b as f32 / 255.0 * a,
            a,
        ]
    }
}

/// Pixel compositing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Composite {
    /// Standard alpha blending (source drawn over destination)
    #[default]
    SourceOver,
    /// Additive blending; overlapping draws brighten instead of occluding
    Lighter,
}

/// One color stop of a radial gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the radius in [0, 1]
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// Text orientation relative to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextRotation {
    #[default]
    Horizontal,
    /// Rotated -90 degrees, reading bottom to top
    Upward,
}

/// How text is painted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Nominal font size in pixels
    pub size_px: f32,
    pub color: Rgba,
    pub rotation: TextRotation,
}

impl TextStyle {
    pub const fn new(size_px: f32, color: Rgba) -> Self {
        Self {
            size_px,
            color,
            rotation: TextRotation::Horizontal,
        }
    }

    pub const fn upward(mut self) -> Self {
        self.rotation = TextRotation::Upward;
        self
    }
}

/// A fixed-size 2-D surface the heatmap renderer can paint on.
///
/// Coordinates are in logical pixels with the origin at the top-left corner
/// and Y growing downward. Text is positioned by its baseline start point.
pub trait DrawingSurface {
    /// Surface size as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Erases all pixels to transparent and resets the compositing mode to
    /// [`Composite::SourceOver`].
    fn clear(&mut self);

    /// Fills an axis-aligned rectangle.
    fn fill_rect(&mut self, origin: Point2<f64>, width: f64, height: f64, color: Rgba);

    /// Strokes a straight segment.
    fn stroke_line(&mut self, from: Point2<f64>, to: Point2<f64>, width: f64, color: Rgba);

    /// Paints text starting at `at` (baseline).
    fn fill_text(&mut self, text: &str, at: Point2<f64>, style: &TextStyle);

    /// Sets the compositing mode for subsequent draws.
    fn set_composite(&mut self, mode: Composite);

    /// Fills a disk with a radial gradient running from the center (offset 0)
    /// to the rim (offset 1).
    fn fill_radial_disk(&mut self, center: Point2<f64>, radius: f64, stops: &[GradientStop]);
}

// =============================================================================
// DRAW LOG
// =============================================================================

/// A recorded surface call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    Clear,
    FillRect {
        origin: Point2<f64>,
        width: f64,
        height: f64,
        color: Rgba,
    },
    StrokeLine {
        from: Point2<f64>,
        to: Point2<f64>,
        width: f64,
        color: Rgba,
    },
    FillText {
        text: String,
        at: Point2<f64>,
        style: TextStyle,
    },
    SetComposite(Composite),
    RadialDisk {
        center: Point2<f64>,
        radius: f64,
        stops: Vec<GradientStop>,
        /// Compositing mode in effect when the disk was drawn
        composite: Composite,
    },
}

/// Surface that records calls instead of painting.
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    width: u32,
    height: u32,
    composite: Composite,
    ops: Vec<DrawOp>,
}

impl DrawLog {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// All recorded operations in call order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Text strings painted, in call order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of gradient disks painted.
    pub fn disk_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::RadialDisk { .. }))
            .count()
    }

    /// Number of line segments stroked.
    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::StrokeLine { .. }))
            .count()
    }
}

impl DrawingSurface for DrawLog {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.composite = Composite::SourceOver;
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, origin: Point2<f64>, width: f64, height: f64, color: Rgba) {
        self.ops.push(DrawOp::FillRect {
            origin,
            width,
            height,
            color,
        });
    }

    fn stroke_line(&mut self, from: Point2<f64>, to: Point2<f64>, width: f64, color: Rgba) {
        self.ops.push(DrawOp::StrokeLine {
            from,
            to,
            width,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, at: Point2<f64>, style: &TextStyle) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            at,
            style: *style,
        });
    }

    fn set_composite(&mut self, mode: Composite) {
        self.composite = mode;
        self.ops.push(DrawOp::SetComposite(mode));
    }

    fn fill_radial_disk(&mut self, center: Point2<f64>, radius: f64, stops: &[GradientStop]) {
        self.ops.push(DrawOp::RadialDisk {
            center,
            radius,
            stops: stops.to_vec(),
            composite: self.composite,
        });
    }
}
