//! Recorded evaluation session ({user}.json).
//! schemaVersion: 1

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::geometry::Point2D;

pub const SCHEMA_VERSION: u32 = 1;

/// One ground-truth observation: where the user clicked while looking at a
/// target, plus the fixation the tracker reported at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthSample {
    /// Unix timestamp (ms); also keys the stored screenshot.
    pub timestamp: i64,
    /// Clicked position in screenshot coordinates.
    pub mouse_point: Point2D,
    /// Fixation estimate in screen coordinates.
    #[serde(default)]
    pub fixation: Option<Point2D>,
    /// Pupil sizes: `[left, right]`.
    #[serde(default)]
    pub pupils: Option<[f32; 2]>,
}

/// Root object of a session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    pub schema_version: u32,
    pub user: String,
    #[serde(default)]
    pub samples: Vec<GroundTruthSample>,
}

impl SessionFile {
    pub fn new(user: impl Into<String>, samples: Vec<GroundTruthSample>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            user: user.into(),
            samples,
        }
    }

    /// Loads a session file, rejecting unknown schema versions.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let session: SessionFile = serde_json::from_str(&raw)?;

        if session.schema_version != SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                path: path.display().to_string(),
                expected: SCHEMA_VERSION,
                got: session.schema_version,
            });
        }

        log::debug!(
            "session load: user={} samples={} path={}",
            session.user,
            session.samples.len(),
            path.display()
        );
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
