//! Stored screenshots of recorded sessions.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::Result;

/// Resolves `(user, timestamp)` to the screenshot taken at that moment.
pub trait ScreenshotStore {
    /// `Ok(None)` when no screenshot exists; `Err` when it exists but cannot be
    /// decoded.
    fn load(&self, user: &str, timestamp: i64) -> Result<Option<RgbaImage>>;
}

/// Screenshots laid out as `{root}/data/{user}/{user}_{timestamp}.png`.
#[derive(Debug, Clone)]
pub struct FsScreenshotStore {
    root: PathBuf,
}

impl FsScreenshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user: &str) -> PathBuf {
        self.root.join("data").join(user)
    }

    pub fn screenshot_path(&self, user: &str, timestamp: i64) -> PathBuf {
        self.user_dir(user).join(format!("{user}_{timestamp}.png"))
    }

    /// `{root}/data/{user}/{user}.json`.
    pub fn session_path(&self, user: &str) -> PathBuf {
        self.user_dir(user).join(format!("{user}.json"))
    }
}

impl ScreenshotStore for FsScreenshotStore {
    fn load(&self, user: &str, timestamp: i64) -> Result<Option<RgbaImage>> {
        let path = self.screenshot_path(user, timestamp);
        if !path.is_file() {
            return Ok(None);
        }
        let image = image::open(&path)?;
        Ok(Some(image.to_rgba8()))
    }
}
