use crate::audio::{AudioChannel, AudioLevels, VolumePanel};
use crate::capture::{
    CaptureBackend, CaptureCoordinator, CaptureOutcome, CaptureSession, DisplayGeometry,
    GrantToken, PermissionResult,
};
use crate::overlay::{
    ControllerConfig, HostSignal, OverlayMode, OverlaySurfaceController, PointerSample,
    WindowPlacement,
};
use crate::settings::Settings;
use crate::toast_log::{Notice, Notifier};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Input delivered to the overlay service's UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCommand {
    Start,
    Stop,
    Pointer(PointerSample),
    TapOutsidePanel,
    RequestCapture,
    PermissionResult {
        result_code: i32,
        token: Option<GrantToken>,
    },
    /// Sent by the capture worker; `capture_id` names the capture it ends.
    CaptureFinished {
        capture_id: u64,
        outcome: CaptureOutcome,
    },
    SetVolume {
        channel: AudioChannel,
        value: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFlow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifecycle {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub controller: ControllerConfig,
    pub screenshot_dir: PathBuf,
}

impl ServiceConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            controller: settings.controller_config(),
            screenshot_dir: settings.screenshot_dir(),
        }
    }
}

/// Long-lived host of the floating overlay.
///
/// All surface work happens on the thread that calls [`handle`](Self::handle),
/// [`pump`](Self::pump) or [`run`](Self::run). The capture worker reports back
/// through the same command channel.
pub struct OverlayService {
    controller: OverlaySurfaceController,
    coordinator: CaptureCoordinator,
    panel: VolumePanel,
    notifier: Arc<dyn Notifier>,
    tx: Sender<ServiceCommand>,
    rx: Receiver<ServiceCommand>,
    lifecycle: ServiceLifecycle,
    next_capture_id: u64,
    active_capture: Option<u64>,
}

impl OverlayService {
    pub fn new(
        config: ServiceConfig,
        window: Box<dyn WindowPlacement>,
        backend: Arc<dyn CaptureBackend>,
        audio: Box<dyn AudioLevels>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            controller: OverlaySurfaceController::new(window, config.controller),
            coordinator: CaptureCoordinator::new(backend, config.screenshot_dir),
            panel: VolumePanel::new(audio),
            notifier,
            tx,
            rx,
            lifecycle: ServiceLifecycle::Idle,
            next_capture_id: 0,
            active_capture: None,
        }
    }

    pub fn sender(&self) -> Sender<ServiceCommand> {
        self.tx.clone()
    }

    pub fn lifecycle(&self) -> ServiceLifecycle {
        self.lifecycle
    }

    pub fn controller(&self) -> &OverlaySurfaceController {
        &self.controller
    }

    pub fn panel(&self) -> &VolumePanel {
        &self.panel
    }

    pub fn capture_in_flight(&mut self) -> bool {
        self.coordinator.is_busy()
    }

    pub fn start(&mut self) {
        if self.lifecycle != ServiceLifecycle::Idle {
            return;
        }
        self.controller.start();
        self.lifecycle = ServiceLifecycle::Running;
    }

    /// Abort any capture, then detach every surface.
    pub fn stop(&mut self) {
        if self.lifecycle == ServiceLifecycle::Stopped {
            return;
        }
        self.coordinator.shutdown();
        self.active_capture = None;
        self.controller.teardown();
        self.lifecycle = ServiceLifecycle::Stopped;
        tracing::info!("overlay service stopped");
    }

    pub fn handle(&mut self, command: ServiceCommand) -> ServiceFlow {
        match (&self.lifecycle, &command) {
            (ServiceLifecycle::Stopped, _) => return ServiceFlow::Exit,
            (ServiceLifecycle::Idle, ServiceCommand::Start | ServiceCommand::Stop) => {}
            (ServiceLifecycle::Idle, _) => {
                tracing::debug!(?command, "command before start ignored");
                return ServiceFlow::Continue;
            }
            _ => {}
        }

        match command {
            ServiceCommand::Start => self.start(),
            ServiceCommand::Stop => {
                self.stop();
                return ServiceFlow::Exit;
            }
            ServiceCommand::Pointer(sample) => {
                let was_expanded = self.controller.mode() == OverlayMode::Expanded;
                if self.controller.handle_pointer(sample) == HostSignal::Stop {
                    self.stop();
                    return ServiceFlow::Exit;
                }
                if !was_expanded && self.controller.mode() == OverlayMode::Expanded {
                    self.panel.refresh();
                }
            }
            ServiceCommand::TapOutsidePanel => self.controller.collapse(),
            ServiceCommand::RequestCapture => {
                if self.controller.begin_capture() {
                    tracing::info!("awaiting screen capture permission");
                }
            }
            ServiceCommand::PermissionResult { result_code, token } => {
                self.on_permission_result(PermissionResult::from_activity_result(
                    result_code,
                    token,
                ));
            }
            ServiceCommand::CaptureFinished {
                capture_id,
                outcome,
            } => self.on_capture_finished(capture_id, outcome),
            ServiceCommand::SetVolume { channel, value } => {
                if let Err(err) = self.panel.slider_changed(channel, value) {
                    tracing::warn!(?err, ?channel, value, "failed to set volume");
                }
            }
        }
        ServiceFlow::Continue
    }

    /// Drain every queued command without blocking.
    pub fn pump(&mut self) -> ServiceFlow {
        loop {
            match self.rx.try_recv() {
                Ok(command) => {
                    if self.handle(command) == ServiceFlow::Exit {
                        return ServiceFlow::Exit;
                    }
                }
                Err(TryRecvError::Empty) => return ServiceFlow::Continue,
                Err(TryRecvError::Disconnected) => return ServiceFlow::Exit,
            }
        }
    }

    /// Wait up to `timeout` for a single command. Returns `None` on timeout.
    pub fn pump_one(&mut self, timeout: Duration) -> Option<ServiceFlow> {
        match self.rx.recv_timeout(timeout) {
            Ok(command) => Some(self.handle(command)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(ServiceFlow::Exit),
        }
    }

    /// Start the overlay and process commands until the service stops.
    pub fn run(&mut self) {
        self.start();
        while let Ok(command) = self.rx.recv() {
            if self.handle(command) == ServiceFlow::Exit {
                break;
            }
        }
        self.stop();
    }

    fn on_permission_result(&mut self, result: PermissionResult) {
        if self.controller.mode() != OverlayMode::Hidden(crate::overlay::HiddenReason::Capture) {
            tracing::warn!(mode = ?self.controller.mode(), "unexpected permission result");
            return;
        }
        if self.active_capture.is_some() || self.coordinator.is_busy() {
            tracing::warn!(
                active = ?self.active_capture,
                "permission result ignored while a capture is in flight"
            );
            return;
        }
        let token = match result {
            PermissionResult::Granted(token) => token,
            PermissionResult::Denied => {
                self.controller.finish_capture();
                self.notifier.notify(Notice::PermissionDenied);
                return;
            }
        };

        self.next_capture_id += 1;
        let capture_id = self.next_capture_id;
        let geometry = DisplayGeometry::from(self.controller.display_metrics());
        tracing::info!(
            capture_id,
            dir = %self.coordinator.output_dir().display(),
            "starting screen capture"
        );
        let tx = self.tx.clone();
        let begun = self.coordinator.begin(
            CaptureSession::new(geometry, token),
            Box::new(move |outcome| {
                let _ = tx.send(ServiceCommand::CaptureFinished {
                    capture_id,
                    outcome,
                });
            }),
        );
        match begun {
            Ok(()) => self.active_capture = Some(capture_id),
            Err(err) => {
                tracing::error!(?err, "failed to start screen capture");
                self.controller.finish_capture();
                self.notifier
                    .notify(Notice::CaptureFailed(format!("{err:#}")));
            }
        }
    }

    fn on_capture_finished(&mut self, capture_id: u64, outcome: CaptureOutcome) {
        if self.active_capture != Some(capture_id) {
            tracing::debug!(
                capture_id,
                active = ?self.active_capture,
                "dropping outcome of a stale capture"
            );
            return;
        }
        self.active_capture = None;
        // The worker sends its outcome as its last step; wait for it to exit.
        self.coordinator.shutdown();
        self.controller.finish_capture();
        match outcome {
            CaptureOutcome::Saved(path) => self.notifier.notify(Notice::Saved(path)),
            CaptureOutcome::FrameUnavailable => self
                .notifier
                .notify(Notice::CaptureFailed("no frame available".into())),
            CaptureOutcome::Failed(reason) => self.notifier.notify(Notice::CaptureFailed(reason)),
            CaptureOutcome::Aborted => tracing::info!("screen capture aborted"),
        }
    }
}

impl Drop for OverlayService {
    fn drop(&mut self) {
        self.stop();
    }
}
