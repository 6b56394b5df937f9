//! Recorded gaze/pointer input stream (events.json).
//! schemaVersion: 1

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::geometry::Point2D;

pub const SCHEMA_VERSION: u32 = 1;

/// One recorded input observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    /// Sampled cursor position.
    Move {
        /// Milliseconds since recording start.
        ts: i64,
        x: f64,
        y: f64,
    },
    /// New fixation estimate from the eye tracker.
    Fixation { ts: i64, x: f64, y: f64 },
    /// Explicit engine reset (e.g. tracker lost the user).
    Reset { ts: i64 },
}

impl InputEvent {
    pub fn ts(&self) -> i64 {
        match self {
            InputEvent::Move { ts, .. } => *ts,
            InputEvent::Fixation { ts, .. } => *ts,
            InputEvent::Reset { ts } => *ts,
        }
    }

    /// Position carried by the event, if any.
    pub fn position(&self) -> Option<Point2D> {
        match self {
            InputEvent::Move { x, y, .. } | InputEvent::Fixation { x, y, .. } => {
                Some(Point2D::new(*x, *y))
            }
            InputEvent::Reset { .. } => None,
        }
    }
}

/// Root container of an events.json file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsFile {
    pub schema_version: u32,
    #[serde(alias = "recording_id")]
    pub recording_id: String,
    /// Unix timestamp (ms) of the recording start.
    #[serde(default, alias = "start_time_ms")]
    pub start_time_ms: i64,
    pub events: Vec<InputEvent>,
}

impl EventsFile {
    pub fn new(recording_id: impl Into<String>, events: Vec<InputEvent>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            recording_id: recording_id.into(),
            start_time_ms: 0,
            events,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: EventsFile = serde_json::from_str(&raw)?;

        if file.schema_version != SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                path: path.display().to_string(),
                expected: SCHEMA_VERSION,
                got: file.schema_version,
            });
        }
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_events_with_type_tag() {
        let event = InputEvent::Fixation {
            ts: 5,
            x: 100.0,
            y: 200.0,
        };

        let json = serde_json::to_string(&event).expect("serialize fixation");
        assert!(json.contains("\"type\":\"fixation\""));
    }

    #[test]
    fn accepts_legacy_snake_case_fields_during_deserialization() {
        let legacy = r#"{
            "schemaVersion": 1,
            "recording_id": "abc",
            "start_time_ms": 42,
            "events": [
                {"type":"move","ts":1,"x":10.0,"y":20.0},
                {"type":"reset","ts":2}
            ]
        }"#;

        let file: EventsFile = serde_json::from_str(legacy).expect("deserialize legacy file");
        assert_eq!(file.recording_id, "abc");
        assert_eq!(file.start_time_ms, 42);
        assert_eq!(file.events.len(), 2);
        assert_eq!(file.events[0].position(), Some(Point2D::new(10.0, 20.0)));
        assert_eq!(file.events[1].ts(), 2);
        assert!(file.events[1].position().is_none());
    }

    #[test]
    fn load_rejects_other_schema_versions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.json");

        let mut file = EventsFile::new("rec", vec![InputEvent::Reset { ts: 0 }]);
        file.save(&path).expect("save events");
        assert_eq!(EventsFile::load(&path).expect("load events").events.len(), 1);

        file.schema_version = 2;
        file.save(&path).expect("save events");
        assert!(matches!(
            EventsFile::load(&path),
            Err(Error::UnsupportedSchema { got: 2, .. })
        ));
    }
}
