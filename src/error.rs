//! Crate-wide error type.

use thiserror::Error;

use crate::algorithm::detectors::DetectorId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed ground-truth record {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    #[error("detector {0} is not registered")]
    UnknownDetector(DetectorId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported schemaVersion in {path}: expected {expected}, got {got}")]
    UnsupportedSchema {
        path: String,
        expected: u32,
        got: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
