use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Corner or edge a surface is positioned against.
///
/// Offsets in [`LayoutParams`] are measured from this anchor, so a positive
/// `x` on an [`Anchor::TopEnd`] surface moves it *left*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopStart,
    TopEnd,
    BottomCenter,
}

impl Anchor {
    pub fn is_right_anchored(self) -> bool {
        matches!(self, Anchor::TopEnd)
    }
}

bitflags! {
    /// Window-manager flags attached to a surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u32 {
        const NOT_FOCUSABLE = 1 << 0;
        const LAYOUT_NO_LIMITS = 1 << 1;
        const HARDWARE_ACCELERATED = 1 << 2;
        /// Flags every overlay surface is created with.
        const OVERLAY = Self::NOT_FOCUSABLE.bits()
            | Self::LAYOUT_NO_LIMITS.bits()
            | Self::HARDWARE_ACCELERATED.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPosition {
    pub x: i32,
    pub y: i32,
    pub anchor: Anchor,
}

/// Parameters handed to the window-placement API for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParams {
    pub x: i32,
    pub y: i32,
    pub anchor: Anchor,
    pub flags: WindowFlags,
}

impl LayoutParams {
    pub fn wrap_content(anchor: Anchor, x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            anchor,
            flags: WindowFlags::OVERLAY,
        }
    }

    pub fn position(&self) -> OverlayPosition {
        OverlayPosition {
            x: self.x,
            y: self.y,
            anchor: self.anchor,
        }
    }

    pub fn move_to(&mut self, position: OverlayPosition) {
        self.x = position.x;
        self.y = position.y;
        self.anchor = position.anchor;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
}

impl Default for ScreenMetrics {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 2400,
            density_dpi: 420,
        }
    }
}

/// Initial offsets for the three overlay surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryConfig {
    pub bubble_start: (i32, i32),
    pub panel_margin_x: i32,
    pub remove_target_margin_y: i32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            bubble_start: (30, 150),
            panel_margin_x: 20,
            remove_target_margin_y: 50,
        }
    }
}

/// Window parameters of every overlay surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryState {
    pub bubble: LayoutParams,
    pub panel: LayoutParams,
    pub remove_target: LayoutParams,
}

impl GeometryState {
    pub fn new(config: GeometryConfig) -> Self {
        let (bubble_x, bubble_y) = config.bubble_start;
        Self {
            bubble: LayoutParams::wrap_content(Anchor::TopEnd, bubble_x, bubble_y),
            panel: LayoutParams::wrap_content(Anchor::TopEnd, config.panel_margin_x, 0),
            remove_target: LayoutParams::wrap_content(
                Anchor::BottomCenter,
                0,
                config.remove_target_margin_y,
            ),
        }
    }

    pub fn bubble_position(&self) -> OverlayPosition {
        self.bubble.position()
    }

    /// Line the panel up vertically with wherever the bubble currently sits.
    pub fn align_panel_to_bubble(&mut self) {
        self.panel.y = self.bubble.y;
    }
}

impl Default for GeometryState {
    fn default() -> Self {
        Self::new(GeometryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_overlay_placement() {
        let geometry = GeometryState::default();
        assert_eq!(
            geometry.bubble_position(),
            OverlayPosition {
                x: 30,
                y: 150,
                anchor: Anchor::TopEnd
            }
        );
        assert_eq!(geometry.panel.x, 20);
        assert_eq!(geometry.remove_target.anchor, Anchor::BottomCenter);
        assert_eq!(geometry.remove_target.y, 50);
        assert!(geometry.bubble.flags.contains(WindowFlags::NOT_FOCUSABLE));
    }

    #[test]
    fn panel_follows_bubble_vertically() {
        let mut geometry = GeometryState::default();
        geometry.bubble.y = 900;
        geometry.align_panel_to_bubble();
        assert_eq!(geometry.panel.y, 900);
        assert_eq!(geometry.panel.x, 20);
    }

    #[test]
    fn flags_combine() {
        let flags = WindowFlags::NOT_FOCUSABLE | WindowFlags::HARDWARE_ACCELERATED;
        assert!(flags.contains(WindowFlags::HARDWARE_ACCELERATED));
        assert!(!flags.contains(WindowFlags::LAYOUT_NO_LIMITS));
        assert_eq!(WindowFlags::OVERLAY.bits(), 0b111);
        assert!(WindowFlags::empty().is_empty());
    }
}
