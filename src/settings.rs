use crate::overlay::dismiss::{DEFAULT_BOTTOM_BAND_PX, DEFAULT_HALF_WIDTH_PX};
use crate::overlay::geometry::GeometryConfig;
use crate::overlay::gesture::DEFAULT_DRAG_THRESHOLD_PX;
use crate::overlay::{ControllerConfig, DismissZone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Mirror notices into the toast log.
    #[serde(default = "default_toasts")]
    pub enable_toasts: bool,
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold_px: f32,
    #[serde(default = "default_bottom_band")]
    pub dismiss_bottom_band_px: f32,
    #[serde(default = "default_half_width")]
    pub dismiss_half_width_px: f32,
    #[serde(default = "default_bubble_start")]
    pub bubble_start: (i32, i32),
    #[serde(default = "default_panel_margin")]
    pub panel_margin_x: i32,
    #[serde(default = "default_remove_target_margin")]
    pub remove_target_margin_y: i32,
    /// Folder for saved screenshots. Defaults to the picture directory.
    #[serde(default)]
    pub screenshot_dir: Option<String>,
}

fn default_toasts() -> bool {
    true
}

fn default_drag_threshold() -> f32 {
    DEFAULT_DRAG_THRESHOLD_PX
}

fn default_bottom_band() -> f32 {
    DEFAULT_BOTTOM_BAND_PX
}

fn default_half_width() -> f32 {
    DEFAULT_HALF_WIDTH_PX
}

fn default_bubble_start() -> (i32, i32) {
    GeometryConfig::default().bubble_start
}

fn default_panel_margin() -> i32 {
    GeometryConfig::default().panel_margin_x
}

fn default_remove_target_margin() -> i32 {
    GeometryConfig::default().remove_target_margin_y
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            enable_toasts: default_toasts(),
            drag_threshold_px: default_drag_threshold(),
            dismiss_bottom_band_px: default_bottom_band(),
            dismiss_half_width_px: default_half_width(),
            bubble_start: default_bubble_start(),
            panel_margin_x: default_panel_margin(),
            remove_target_margin_y: default_remove_target_margin(),
            screenshot_dir: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            geometry: GeometryConfig {
                bubble_start: self.bubble_start,
                panel_margin_x: self.panel_margin_x,
                remove_target_margin_y: self.remove_target_margin_y,
            },
            drag_threshold_px: self.drag_threshold_px,
            dismiss_zone: DismissZone::new(self.dismiss_bottom_band_px, self.dismiss_half_width_px),
        }
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(PathBuf::from)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        crate::capture::screenshot_dir(self.screenshot_dir.as_deref())
    }
}
