use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

const DEFAULT_WINDOW_TITLE: &str = "FreeRTOS Emulator";
const DEFAULT_FONT: &str = "IBMPlexSans-Medium.ttf";
const DEFAULT_FONT_SIZE: u32 = 15;

/// Main drawing configuration. Every field has a default, so a JSON document only needs to
/// name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Title handed to the backend when it creates its window
    pub window_title: String,
    /// Logical screen width in pixels
    pub screen_width: u32,
    /// Logical screen height in pixels
    pub screen_height: u32,
    /// Root directory searched for images and fonts
    pub resources_dir: PathBuf,
    /// Font directory, relative to `resources_dir`
    pub fonts_dir: PathBuf,
    /// Font loaded and selected during initialisation
    pub default_font: String,
    /// Size used for the default font and for loads that ask for size 0
    pub default_font_size: u32,
    /// Upper bound on presented frames per second (no limit when `None`)
    pub fps_limit: Option<u32>,
    /// Whether `update_screen` claims the rendering context for the calling thread
    pub auto_bind: bool,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            screen_width: 640,
            screen_height: 480,
            resources_dir: PathBuf::from("../resources"),
            fonts_dir: PathBuf::from("fonts"),
            default_font: DEFAULT_FONT.to_string(),
            default_font_size: DEFAULT_FONT_SIZE,
            fps_limit: None,
            auto_bind: true,
        }
    }
}

impl DrawConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Absolute-or-relative directory fonts are loaded from.
    pub fn font_directory(&self) -> PathBuf {
        self.resources_dir.join(&self.fonts_dir)
    }
}
