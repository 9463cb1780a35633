pub mod controller;
pub mod dismiss;
pub mod geometry;
pub mod gesture;
pub mod state;
pub mod surface;

pub use controller::{ControllerConfig, HostSignal, OverlaySurfaceController};
pub use dismiss::DismissZone;
pub use geometry::{Anchor, GeometryState, LayoutParams, OverlayPosition, ScreenMetrics};
pub use gesture::{GestureClassifier, GestureEvent, PointerPhase, PointerSample};
pub use state::{HiddenReason, OverlayMode};
pub use surface::{LoggingWindow, MockWindowPlacement, SurfaceKind, WindowPlacement};
