//! File exporters for the dashboard views.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use trackview_core::{ChartView, DrawingSurface, Raster};

use crate::error::ReplayError;

/// Encodes `raster` as an 8-bit RGBA PNG into `out`.
pub fn encode_png<W: Write>(raster: &Raster, out: W) -> Result<(), ReplayError> {
    let (width, height) = raster.size();
    let mut encoder = png::Encoder::new(out, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&raster.to_rgba8())?;
    writer.finish()?;
    Ok(())
}

/// Writes `raster` as a PNG file.
pub fn write_png(raster: &Raster, path: impl AsRef<Path>) -> Result<(), ReplayError> {
    let path = path.as_ref();
    encode_png(raster, BufWriter::new(File::create(path)?))?;
    info!(path = %path.display(), "heatmap written");
    Ok(())
}

/// Writes the chart view as pretty JSON.
pub fn write_chart(view: &ChartView, path: impl AsRef<Path>) -> Result<(), ReplayError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(view)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    info!(path = %path.display(), "chart written");
    Ok(())
}
