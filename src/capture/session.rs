use crate::overlay::geometry::ScreenMetrics;

/// Activity result code signalling the user accepted the capture prompt.
pub const RESULT_OK: i32 = -1;

/// Opaque capability produced by the OS permission prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct GrantToken(String);

impl GrantToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for GrantToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GrantToken(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionResult {
    Granted(GrantToken),
    Denied,
}

impl PermissionResult {
    /// Interpret the `(result_code, data)` pair the permission prompt returns.
    pub fn from_activity_result(result_code: i32, token: Option<GrantToken>) -> Self {
        match token {
            Some(token) if result_code == RESULT_OK => Self::Granted(token),
            _ => Self::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
}

impl From<ScreenMetrics> for DisplayGeometry {
    fn from(metrics: ScreenMetrics) -> Self {
        Self {
            width: metrics.width,
            height: metrics.height,
            density_dpi: metrics.density_dpi,
        }
    }
}

/// Everything a single capture needs. Consumed by
/// [`CaptureCoordinator::begin`](crate::capture::CaptureCoordinator::begin).
#[derive(Debug)]
pub struct CaptureSession {
    pub geometry: DisplayGeometry,
    pub grant: GrantToken,
}

impl CaptureSession {
    pub fn new(geometry: DisplayGeometry, grant: GrantToken) -> Self {
        Self { geometry, grant }
    }
}
