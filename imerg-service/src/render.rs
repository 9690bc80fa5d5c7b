//! PNG heatmap rendering of dense precipitation grids.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use imerg::CroppedGrid;

/// Colour stops over the normalized rate `value / max`.
const RAMP: [(f32, [u8; 3]); 5] = [
    (0.0, [170, 210, 255]), // very light blue
    (0.25, [50, 130, 255]), // blue
    (0.5, [0, 200, 100]),   // teal
    (0.75, [255, 220, 0]),  // yellow
    (1.0, [220, 30, 0]),    // red
];

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Colour for `value` on a ramp scaled to `max`.
///
/// NaN and non-positive values are transparent.
pub fn color_for(value: f32, max: f32) -> Rgba<u8> {
    if value.is_nan() || value <= 0.0 || max <= 0.0 {
        return TRANSPARENT;
    }

    let t = (value / max).clamp(0.0, 1.0);
    let upper = RAMP
        .iter()
        .position(|&(stop, _)| t <= stop)
        .unwrap_or(RAMP.len() - 1)
        .max(1);
    let (lo_stop, lo) = RAMP[upper - 1];
    let (hi_stop, hi) = RAMP[upper];
    let f = ((t - lo_stop) / (hi_stop - lo_stop)).clamp(0.0, 1.0);

    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * f).round() as u8;
    Rgba([mix(lo[0], hi[0]), mix(lo[1], hi[1]), mix(lo[2], hi[2]), 255])
}

/// Render `grid` as an RGBA image, one pixel per cell, north up.
///
/// An empty grid renders as a single transparent pixel.
pub fn render_image(grid: &CroppedGrid) -> RgbaImage {
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return RgbaImage::from_pixel(1, 1, TRANSPARENT);
    }

    let max = grid.max_value().unwrap_or(0.0);
    let flip = grid.lats_ascending();
    let values = grid.values();

    RgbaImage::from_fn(cols as u32, rows as u32, |x, y| {
        let row = if flip { rows - 1 - y as usize } else { y as usize };
        color_for(values[[row, x as usize]], max)
    })
}

/// Render `grid` and encode it as PNG.
pub fn render_png(grid: &CroppedGrid) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    render_image(grid).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
