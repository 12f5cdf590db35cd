//! TrackView Core - Aggregation and Heatmap Rendering for Tracking Records
//!
//! Turns a list of multi-object tracking detections into the two views of the
//! tracking dashboard:
//! 1. **Time series**: records grouped into fixed-width time buckets and
//!    reduced to a count or a mean X position (`aggregate`, `chart`)
//! 2. **Heatmap**: every record painted as an additive radial blob on a fixed
//!    600x250 surface with axes and ticks (`heatmap`, `surface`, `raster`)
//!
//! Both views are pure functions of the record list; nothing is cached
//! between calls.

pub mod aggregate;
pub mod chart;
pub mod error;
pub mod heatmap;
pub mod raster;
pub mod record;
pub mod surface;

// Re-export key types for convenience
pub use aggregate::{aggregate, aggregate_in, Aggregation, BucketWidth, MetricKind};
pub use chart::{ChartSeries, ChartView};
pub use error::TrackViewError;
pub use heatmap::{render, render_with, HeatmapLayout};
pub use raster::Raster;
pub use record::{RawRow, Record};
pub use surface::{Composite, DrawLog, DrawOp, DrawingSurface, Rgba};
