use crate::overlay::dismiss::DismissZone;
use crate::overlay::geometry::{GeometryConfig, GeometryState, ScreenMetrics};
use crate::overlay::gesture::{GestureClassifier, GestureEvent, PointerSample, DEFAULT_DRAG_THRESHOLD_PX};
use crate::overlay::state::{can_transition, HiddenReason, OverlayMode};
use crate::overlay::surface::{Surface, SurfaceKind, WindowPlacement};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub geometry: GeometryConfig,
    pub drag_threshold_px: f32,
    pub dismiss_zone: DismissZone,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            dismiss_zone: DismissZone::default(),
        }
    }
}

/// What the host has to do after the controller handled an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    None,
    /// The overlay was dropped on the dismiss zone; stop the host service.
    Stop,
}

/// Owns the bubble, panel and remove-target surfaces and drives the
/// collapsed/expanded/hidden state machine.
///
/// At most one of bubble and panel is attached at any point. The remove target
/// is attached once in [`start`](Self::start) and afterwards only changes
/// visibility.
pub struct OverlaySurfaceController {
    window: Box<dyn WindowPlacement>,
    geometry: GeometryState,
    classifier: GestureClassifier,
    dismiss_zone: DismissZone,
    mode: OverlayMode,
    bubble: Surface,
    panel: Surface,
    remove_target: Surface,
    started: bool,
}

impl OverlaySurfaceController {
    pub fn new(window: Box<dyn WindowPlacement>, config: ControllerConfig) -> Self {
        Self {
            window,
            geometry: GeometryState::new(config.geometry),
            classifier: GestureClassifier::new(config.drag_threshold_px),
            dismiss_zone: config.dismiss_zone,
            mode: OverlayMode::Collapsed,
            bubble: Surface::new(SurfaceKind::Bubble),
            panel: Surface::new(SurfaceKind::Panel),
            remove_target: Surface::new(SurfaceKind::RemoveTarget),
            started: false,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn geometry(&self) -> &GeometryState {
        &self.geometry
    }

    pub fn display_metrics(&self) -> ScreenMetrics {
        self.window.display_metrics()
    }

    pub fn is_attached(&self, kind: SurfaceKind) -> bool {
        self.surface(kind).is_attached()
    }

    pub fn is_visible(&self, kind: SurfaceKind) -> bool {
        self.surface(kind).is_visible()
    }

    fn surface(&self, kind: SurfaceKind) -> &Surface {
        match kind {
            SurfaceKind::Bubble => &self.bubble,
            SurfaceKind::Panel => &self.panel,
            SurfaceKind::RemoveTarget => &self.remove_target,
        }
    }

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let remove_params = self.geometry.remove_target;
        self.remove_target
            .attach(self.window.as_mut(), &remove_params, false);
        if !self.show_bubble() {
            tracing::error!("bubble could not be attached at start");
        }
        tracing::info!(
            drag_threshold_px = self.classifier.threshold_px(),
            "overlay started"
        );
    }

    pub fn handle_pointer(&mut self, sample: PointerSample) -> HostSignal {
        if self.mode != OverlayMode::Collapsed {
            tracing::trace!(mode = ?self.mode, "pointer ignored outside collapsed mode");
            return HostSignal::None;
        }
        let Some(event) = self
            .classifier
            .feed(sample, self.geometry.bubble_position())
        else {
            return HostSignal::None;
        };

        match event {
            GestureEvent::DragStart => {
                self.remove_target.set_visible(self.window.as_mut(), true);
                HostSignal::None
            }
            GestureEvent::DragMove {
                position,
                raw_x,
                raw_y,
            } => {
                self.geometry.bubble.move_to(position);
                let params = self.geometry.bubble;
                self.bubble.update_placement(self.window.as_mut(), &params);
                tracing::trace!(raw_x, raw_y, x = position.x, y = position.y, "drag move");
                HostSignal::None
            }
            GestureEvent::Tap => {
                self.remove_target.set_visible(self.window.as_mut(), false);
                self.expand();
                HostSignal::None
            }
            GestureEvent::DragEnd { raw_x, raw_y } => {
                self.remove_target.set_visible(self.window.as_mut(), false);
                let metrics = self.window.display_metrics();
                if self
                    .dismiss_zone
                    .is_over_zone(raw_x, raw_y, metrics.width, metrics.height)
                {
                    tracing::info!(raw_x, raw_y, "overlay dropped on dismiss zone");
                    self.teardown();
                    return HostSignal::Stop;
                }
                HostSignal::None
            }
            GestureEvent::Cancelled => {
                self.remove_target.set_visible(self.window.as_mut(), false);
                HostSignal::None
            }
        }
    }

    /// Swap the bubble for the panel.
    pub fn expand(&mut self) {
        if self.mode == OverlayMode::Expanded || !self.transition_allowed(OverlayMode::Expanded) {
            return;
        }
        self.bubble.detach(self.window.as_mut());
        self.geometry.align_panel_to_bubble();
        let params = self.geometry.panel;
        if !self.panel.attach(self.window.as_mut(), &params, true) {
            if !self.show_bubble() {
                tracing::error!("bubble could not be restored after failed expand");
            }
            return;
        }
        self.set_mode(OverlayMode::Expanded);
    }

    /// Swap the panel back for the bubble, e.g. after a tap outside the panel.
    pub fn collapse(&mut self) {
        if self.mode != OverlayMode::Expanded {
            return;
        }
        self.panel.detach(self.window.as_mut());
        if !self.show_bubble() {
            tracing::error!("bubble could not be restored; keeping the panel");
            let params = self.geometry.panel;
            if !self.panel.attach(self.window.as_mut(), &params, true) {
                tracing::error!("panel could not be re-attached; overlay has no affordance");
            }
            return;
        }
        self.set_mode(OverlayMode::Collapsed);
    }

    /// Hide the bubble ahead of a screen capture. Returns `false` when the
    /// overlay is not collapsed.
    pub fn begin_capture(&mut self) -> bool {
        let target = OverlayMode::Hidden(HiddenReason::Capture);
        if self.mode != OverlayMode::Collapsed || !self.transition_allowed(target) {
            tracing::debug!(mode = ?self.mode, "capture request ignored");
            return false;
        }
        if self.classifier.is_active() {
            self.classifier.reset();
            self.remove_target.set_visible(self.window.as_mut(), false);
        }
        self.bubble.set_visible(self.window.as_mut(), false);
        self.set_mode(target);
        true
    }

    pub fn finish_capture(&mut self) {
        if self.mode != OverlayMode::Hidden(HiddenReason::Capture) {
            return;
        }
        if !self.show_bubble() {
            tracing::error!("bubble could not be re-shown after capture");
        }
        self.set_mode(OverlayMode::Collapsed);
    }

    /// Detach every surface. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.classifier.reset();
        self.bubble.detach(self.window.as_mut());
        self.panel.detach(self.window.as_mut());
        self.remove_target.detach(self.window.as_mut());
        if !self.mode.is_terminal() {
            self.set_mode(OverlayMode::Hidden(HiddenReason::Teardown));
        }
    }

    /// Returns `true` when the bubble is on screen afterwards.
    fn show_bubble(&mut self) -> bool {
        if self.bubble.is_attached() {
            self.bubble.set_visible(self.window.as_mut(), true);
            self.bubble.is_visible()
        } else {
            let params = self.geometry.bubble;
            self.bubble.attach(self.window.as_mut(), &params, true)
        }
    }

    fn transition_allowed(&self, to: OverlayMode) -> bool {
        let allowed = can_transition(self.mode, to);
        if !allowed {
            tracing::warn!(from = ?self.mode, to = ?to, "rejected overlay transition");
        }
        allowed
    }

    fn set_mode(&mut self, to: OverlayMode) {
        tracing::debug!(from = ?self.mode, to = ?to, "overlay mode updated");
        self.mode = to;
    }
}
