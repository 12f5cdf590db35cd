//! Spatial Renderer (Heatmap)
//! ==========================
//!
//! Paints every record as a soft radial blob on a fixed 600x250 surface.
//! Blobs are composited additively, so dense regions brighten instead of
//! hiding each other. Axes and tick labels give a scale reference.
//!
//! # Coordinate mapping
//! ```text
//! canvas_x = left + pos_x * scale
//! canvas_y = (height - bottom) - pos_y * scale
//! ```
//!
//! Ticks are placed at fixed pixel positions across the drawable area and
//! labelled with the data value at that position. They do not follow the
//! extent of the data.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::MetricKind;
use crate::record::Record;
use crate::surface::{Composite, DrawingSurface, GradientStop, Rgba, TextStyle};

/// Background fill behind the plot.
pub const BACKGROUND: Rgba = Rgba::hex(0x222222);
/// Axis lines and axis letters.
pub const AXIS_COLOR: Rgba = Rgba::WHITE;
/// Tick marks and tick labels.
pub const TICK_COLOR: Rgba = Rgba::hex(0xaaaaaa);

/// Blob alpha when every detection weighs the same.
pub const COUNT_INTENSITY: f32 = 0.15;

/// Geometry of the heatmap surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapLayout {
    pub width: u32,
    pub height: u32,
    pub left_margin: f64,
    pub bottom_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    /// Pixels per data unit
    pub scale_factor: f64,
    /// Blob radius in pixels
    pub blob_radius: f64,
    /// Number of intervals along the X axis (ticks = intervals + 1)
    pub x_tick_intervals: u32,
    /// Number of intervals along the Y axis (ticks = intervals + 1)
    pub y_tick_intervals: u32,
    pub axis_line_width: f64,
    pub tick_length: f64,
}

impl Default for HeatmapLayout {
    fn default() -> Self {
        Self {
            width: 600,
            height: 250,
            left_margin: 40.0,
            bottom_margin: 30.0,
            right_margin: 20.0,
            top_margin: 20.0,
            scale_factor: 20.0,
            blob_radius: 20.0,
            x_tick_intervals: 5,
            y_tick_intervals: 4,
            axis_line_width: 1.5,
            tick_length: 5.0,
        }
    }
}

/// A tick mark and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Pixel position along the axis (x for the X axis, y for the Y axis)
    pub pixel: f64,
    /// Data value at that position, one decimal
    pub label: String,
}

impl HeatmapLayout {
    pub fn drawable_width(&self) -> f64 {
        self.width as f64 - self.left_margin - self.right_margin
    }

    pub fn drawable_height(&self) -> f64 {
        self.height as f64 - self.top_margin - self.bottom_margin
    }

    /// Y pixel of the X axis.
    pub fn baseline(&self) -> f64 {
        self.height as f64 - self.bottom_margin
    }

    /// Maps data coordinates to surface pixels. Y is inverted so data "up"
    /// is screen "up".
    pub fn to_canvas(&self, pos_x: f64, pos_y: f64) -> Point2<f64> {
        Point2::new(
            self.left_margin + pos_x * self.scale_factor,
            self.baseline() - pos_y * self.scale_factor,
        )
    }

    /// Ticks along the X axis, origin first.
    pub fn x_ticks(&self) -> Vec<Tick> {
        self.ticks(self.drawable_width(), self.x_tick_intervals)
            .map(|(offset, label)| Tick {
                pixel: self.left_margin + offset,
                label,
            })
            .collect()
    }

    /// Ticks along the Y axis, origin first (bottom to top).
    pub fn y_ticks(&self) -> Vec<Tick> {
        self.ticks(self.drawable_height(), self.y_tick_intervals)
            .map(|(offset, label)| Tick {
                pixel: self.baseline() - offset,
                label,
            })
            .collect()
    }

    fn ticks(&self, extent: f64, intervals: u32) -> impl Iterator<Item = (f64, String)> + '_ {
        let intervals = intervals.max(1);
        let spacing = extent / intervals as f64;
        (0..=intervals).map(move |i| {
            let offset = i as f64 * spacing;
            (offset, format!("{:.1}", offset / self.scale_factor))
        })
    }
}

/// Blob alpha for one record.
pub fn intensity(record: &Record, metric: MetricKind) -> f32 {
    match metric {
        MetricKind::Count => COUNT_INTENSITY,
        MetricKind::XPos => (record.x() / 200.0).clamp(0.1, 0.4) as f32,
    }
}

/// Gradient for a blob: blue center, green at mid-radius, transparent rim.
pub fn blob_stops(alpha: f32) -> [GradientStop; 3] {
    [
        GradientStop::new(0.0, Rgba::rgba(0, 128, 255, alpha)),
        GradientStop::new(0.5, Rgba::rgba(0, 255, 128, alpha)),
        GradientStop::new(1.0, Rgba::rgba(255, 255, 0, 0.0)),
    ]
}

/// Renders the heatmap with the default layout.
pub fn render<S: DrawingSurface>(surface: &mut S, records: &[Record], metric: MetricKind) {
    render_with(surface, &HeatmapLayout::default(), records, metric);
}

/// Renders the heatmap with an explicit layout.
pub fn render_with<S: DrawingSurface>(
    surface: &mut S,
    layout: &HeatmapLayout,
    records: &[Record],
    metric: MetricKind,
) {
    let (w, h) = (layout.width as f64, layout.height as f64);

    // 1) Background
    surface.clear();
    surface.fill_rect(Point2::origin(), w, h, BACKGROUND);

    // 2) Axes
    draw_axes(surface, layout);

    // 3) Ticks
    draw_ticks(surface, layout);

    // 4) Data
    surface.set_composite(Composite::Lighter);
    for record in records {
        let center = layout.to_canvas(record.x(), record.y());
        let stops = blob_stops(intensity(record, metric));
        surface.fill_radial_disk(center, layout.blob_radius, &stops);
    }

    debug!(blobs = records.len(), metric = %metric, "heatmap rendered");
}

fn draw_axes<S: DrawingSurface>(surface: &mut S, layout: &HeatmapLayout) {
    let base = layout.baseline();
    let origin = Point2::new(layout.left_margin, base);

    surface.stroke_line(
        Point2::new(layout.left_margin, layout.top_margin),
        origin,
        layout.axis_line_width,
        AXIS_COLOR,
    );
    surface.stroke_line(
        origin,
        Point2::new(layout.width as f64 - layout.right_margin, base),
        layout.axis_line_width,
        AXIS_COLOR,
    );

    let letter = TextStyle::new(12.0, AXIS_COLOR);
    surface.fill_text(
        "X",
        Point2::new(layout.width as f64 - layout.right_margin - 10.0, base + 20.0),
        &letter,
    );
    surface.fill_text(
        "Y",
        Point2::new(layout.left_margin - 25.0, layout.top_margin + 20.0),
        &letter.upward(),
    );
}

fn draw_ticks<S: DrawingSurface>(surface: &mut S, layout: &HeatmapLayout) {
    let base = layout.baseline();
    let style = TextStyle::new(10.0, TICK_COLOR);

    for tick in layout.x_ticks() {
        surface.stroke_line(
            Point2::new(tick.pixel, base),
            Point2::new(tick.pixel, base + layout.tick_length),
            1.0,
            TICK_COLOR,
        );
        surface.fill_text(&tick.label, Point2::new(tick.pixel - 10.0, base + 15.0), &style);
    }

    for tick in layout.y_ticks() {
        surface.stroke_line(
            Point2::new(layout.left_margin - layout.tick_length, tick.pixel),
            Point2::new(layout.left_margin, tick.pixel),
            1.0,
            TICK_COLOR,
        );
        surface.fill_text(&tick.label, Point2::new(5.0, tick.pixel + 3.0), &style);
    }
}

// =============================================================================
// TESTS
// =============================================================================
