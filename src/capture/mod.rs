pub mod backend;
pub mod coordinator;
pub mod desktop;
pub mod frame;
pub mod save;
pub mod session;

pub use backend::{
    CaptureBackend, CaptureCounters, CaptureSignal, Frame, FrameListener, FrameSource,
    MockCaptureBackend, MockCaptureScript, MockFrameBehavior, ProjectionToken,
    UnsupportedCaptureBackend, VirtualDisplay,
};
pub use coordinator::{CaptureCoordinator, CaptureDone, CaptureOutcome};
pub use desktop::DesktopCaptureBackend;
pub use frame::{assemble_image, row_padding, PlaneView};
pub use save::{build_filename, save_screenshot, screenshot_dir};
pub use session::{CaptureSession, DisplayGeometry, GrantToken, PermissionResult, RESULT_OK};
