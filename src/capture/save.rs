use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const SCREENSHOT_SUBDIR: &str = "VolumeMaster";
pub const SCREENSHOT_PREFIX: &str = "Screenshot";

/// Directory screenshots are written to.
///
/// Uses `configured` when set, otherwise a `VolumeMaster` folder inside the
/// user's picture directory, falling back to the working directory.
pub fn screenshot_dir(configured: Option<&str>) -> PathBuf {
    if let Some(dir) = configured {
        return PathBuf::from(dir);
    }
    dirs_next::picture_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(std::env::temp_dir)
        .join(SCREENSHOT_SUBDIR)
}

pub fn build_filename(now: DateTime<Local>) -> String {
    format!("{}_{}.png", SCREENSHOT_PREFIX, now.format("%Y%m%d_%H%M%S"))
}

fn unique_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    let candidate = dir.join(build_filename(now));
    if !candidate.exists() {
        return candidate;
    }
    let stem = format!("{}_{}", SCREENSHOT_PREFIX, now.format("%Y%m%d_%H%M%S"));
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}.png")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

pub fn save_screenshot(image: &RgbaImage, dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create screenshot folder {}", dir.display()))?;
    let path = unique_path(dir, now);
    image
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("write screenshot {}", path.display()))?;
    tracing::info!(path = %path.display(), "screenshot saved");
    Ok(path)
}
