//! Target detectors: anything that maps a screenshot to a likely click target.

use std::fmt;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::geometry::Point2D;

/// Identifier assigned by [`DetectorRegistry`]; stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectorId(pub u32);

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability implemented by every target estimator.
///
/// `analyse` must be deterministic for a given image so that repeated runs
/// stay comparable.
///
/// Detectors carry no id of their own: [`DetectorRegistry::register`] assigns
/// the [`DetectorId`] that reports, colours and rankings use.
pub trait Detector: Send + Sync {
    /// Estimated target in screenshot coordinates.
    fn analyse(&self, image: &RgbaImage) -> Point2D;
    fn display_name(&self) -> &str;
}

/// Owns the detectors of one process and hands out their ids.
///
/// Ids are sequential from 0 and never reused.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in reference detectors.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CenterDetector));
        registry.register(Box::new(DarkCentroidDetector::default()));
        registry
    }

    pub fn register(&mut self, detector: Box<dyn Detector>) -> DetectorId {
        let id = DetectorId(self.detectors.len() as u32);
        log::debug!("detectors: registered {} as {id}", detector.display_name());
        self.detectors.push(detector);
        id
    }

    pub fn get(&self, id: DetectorId) -> Result<&dyn Detector> {
        self.detectors
            .get(id.0 as usize)
            .map(|detector| detector.as_ref())
            .ok_or(Error::UnknownDetector(id))
    }

    pub fn contains(&self, id: DetectorId) -> bool {
        (id.0 as usize) < self.detectors.len()
    }

    /// Display name, or a placeholder for unregistered ids.
    pub fn display_name(&self, id: DetectorId) -> String {
        self.get(id)
            .map(|detector| detector.display_name().to_string())
            .unwrap_or_else(|_| format!("unknown detector {id}"))
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = DetectorId> + '_ {
        (0..self.detectors.len()).map(|index| DetectorId(index as u32))
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.display_name()))
            .finish()
    }
}

fn image_center(image: &RgbaImage) -> Point2D {
    Point2D::new(image.width() as f64 / 2.0, image.height() as f64 / 2.0)
}

/// Baseline: screenshots are cropped around the fixation, so the center is the
/// raw fixation estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterDetector;

impl Detector for CenterDetector {
    fn analyse(&self, image: &RgbaImage) -> Point2D {
        image_center(image)
    }

    fn display_name(&self) -> &str {
        "Fixation Center"
    }
}

/// Centroid of pixels darker than `threshold` (text on light backgrounds).
#[derive(Debug, Clone, Copy)]
pub struct DarkCentroidDetector {
    pub threshold: u8,
}

impl Default for DarkCentroidDetector {
    fn default() -> Self {
        Self { threshold: 96 }
    }
}

impl Detector for DarkCentroidDetector {
    fn analyse(&self, image: &RgbaImage) -> Point2D {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut count = 0usize;

        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            if a == 0 {
                continue;
            }
            let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
            if luma < self.threshold as f64 {
                sum_x += x as f64 + 0.5;
                sum_y += y as f64 + 0.5;
                count += 1;
            }
        }

        if count == 0 {
            return image_center(image);
        }
        Point2D::new(sum_x / count as f64, sum_y / count as f64)
    }

    fn display_name(&self) -> &str {
        "Dark Centroid"
    }
}
