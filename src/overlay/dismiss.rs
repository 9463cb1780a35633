/// Height of the band along the bottom edge where a drop removes the overlay.
pub const DEFAULT_BOTTOM_BAND_PX: f32 = 250.0;
/// Horizontal reach of the zone on either side of the screen centre.
pub const DEFAULT_HALF_WIDTH_PX: f32 = 150.0;

/// Bottom-centre drop target that tears the overlay down.
///
/// The extents are raw screen pixels and are not scaled by display density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DismissZone {
    pub bottom_band_px: f32,
    pub half_width_px: f32,
}

impl Default for DismissZone {
    fn default() -> Self {
        Self {
            bottom_band_px: DEFAULT_BOTTOM_BAND_PX,
            half_width_px: DEFAULT_HALF_WIDTH_PX,
        }
    }
}

impl DismissZone {
    pub fn new(bottom_band_px: f32, half_width_px: f32) -> Self {
        Self {
            bottom_band_px,
            half_width_px,
        }
    }

    pub fn is_over_zone(&self, x: f32, y: f32, screen_width: u32, screen_height: u32) -> bool {
        let in_bottom_band = y > screen_height as f32 - self.bottom_band_px;
        let in_center = (x - (screen_width / 2) as f32).abs() < self.half_width_px;
        in_bottom_band && in_center
    }
}
