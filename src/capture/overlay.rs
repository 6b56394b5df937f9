//! Diagnostic overlays: screenshots annotated with the ground truth and the
//! estimates of every detector run against them.
//!
//! Overlays are keyed by user, run and sample. An overlay that already exists
//! is reopened and drawn onto, so every detector of a run ends up on one image.
//! Each marker carries a caption in the marker colour.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::algorithm::detectors::DetectorId;
use crate::capture::label::{draw_text, GLYPH_HEIGHT};
use crate::error::Result;
use crate::models::geometry::Point2D;

pub const HOME_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
pub const GROUND_TRUTH_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

pub const HOME_LABEL: &str = "fixation point";
pub const GROUND_TRUTH_LABEL: &str = "mouse target";

const FILL_ALPHA: u8 = 32;

/// Colour for one detector in one run: `(0, 255 - c, c)`.
///
/// The red channel is always zero, so it never matches the home or
/// ground-truth markers.
pub fn detector_color(run_id: &Uuid, detector: DetectorId) -> Rgba<u8> {
    let bytes = run_id.as_bytes();
    let byte = bytes[detector.0 as usize % bytes.len()] as u32;
    let seed = (byte ^ detector.0.wrapping_mul(97)) & 0xff;
    let c = ((50 + seed) % 256) as u8;
    Rgba([0, 255 - c, c, 255])
}

/// Writes overlays below `{evaluation_dir}/{user}_{run_timestamp}/`.
#[derive(Debug, Clone)]
pub struct OverlayWriter {
    evaluation_dir: PathBuf,
    marker_radius: u32,
}

impl OverlayWriter {
    pub fn new(evaluation_dir: impl Into<PathBuf>, marker_radius: u32) -> Self {
        Self {
            evaluation_dir: evaluation_dir.into(),
            marker_radius: marker_radius.max(1),
        }
    }

    pub fn overlay_path(&self, user: &str, run_timestamp: i64, sample_timestamp: i64) -> PathBuf {
        self.evaluation_dir
            .join(format!("{user}_{run_timestamp}"))
            .join(format!("{user}_{sample_timestamp}_evaluated.png"))
    }

    /// Draws one detector estimate, captioned with `label`, onto the overlay
    /// at `path`.
    ///
    /// When the overlay does not exist yet it starts from `screenshot` and the
    /// home (image center) and ground-truth markers are drawn first.
    pub fn compose(
        &self,
        path: &Path,
        screenshot: &RgbaImage,
        ground_truth: Point2D,
        estimate: Point2D,
        color: Rgba<u8>,
        label: &str,
    ) -> Result<()> {
        let mut canvas = if path.is_file() {
            image::open(path)?.to_rgba8()
        } else {
            let mut canvas = screenshot.clone();
            let home = Point2D::new(
                screenshot.width() as f64 / 2.0,
                screenshot.height() as f64 / 2.0,
            );
            self.draw_labelled(&mut canvas, home, HOME_COLOR, HOME_LABEL);
            self.draw_labelled(&mut canvas, ground_truth, GROUND_TRUTH_COLOR, GROUND_TRUTH_LABEL);
            canvas
        };

        self.draw_labelled(&mut canvas, estimate, color, label);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        canvas.save(path)?;
        log::debug!("overlay: wrote {}", path.display());
        Ok(())
    }

    /// Marker plus a caption to its right, vertically centred on it.
    fn draw_labelled(
        &self,
        canvas: &mut RgbaImage,
        center: Point2D,
        color: Rgba<u8>,
        label: &str,
    ) {
        draw_marker(canvas, center, self.marker_radius, color);
        if !center.is_finite() || label.is_empty() {
            return;
        }
        let scale = (self.marker_radius / 4).max(1);
        let x = (center.x + self.marker_radius as f64 + 2.0).round() as i64;
        let y = center.y.round() as i64 - i64::from(GLYPH_HEIGHT * scale / 2);
        draw_text(canvas, x, y, label, color, scale);
    }
}

/// Opaque ring plus a translucent disc.
pub fn draw_marker(canvas: &mut RgbaImage, center: Point2D, radius: u32, color: Rgba<u8>) {
    if !center.is_finite() {
        return;
    }
    let r = radius as f64;
    let fill = Rgba([color[0], color[1], color[2], FILL_ALPHA]);

    let min_x = (center.x - r - 1.0).floor().max(0.0) as u32;
    let min_y = (center.y - r - 1.0).floor().max(0.0) as u32;
    let max_x = ((center.x + r + 1.0).ceil().max(0.0) as u32).min(canvas.width());
    let max_y = ((center.y + r + 1.0).ceil().max(0.0) as u32).min(canvas.height());

    for y in min_y..max_y {
        for x in min_x..max_x {
            let distance = Point2D::new(x as f64 + 0.5, y as f64 + 0.5).distance_to(center);
            if (distance - r).abs() <= 0.5 {
                canvas.put_pixel(x, y, color);
            } else if distance < r {
                blend(canvas.get_pixel_mut(x, y), fill);
            }
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = src[3] as u32;
    for channel in 0..3 {
        let mixed = (src[channel] as u32 * alpha + dst[channel] as u32 * (255 - alpha)) / 255;
        dst[channel] = mixed as u8;
    }
    dst[3] = dst[3].max(src[3]);
}
