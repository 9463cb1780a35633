use crate::capture::backend::{
    CaptureBackend, CaptureSignal, Frame, FrameListener, FrameSource, ProjectionToken,
    VirtualDisplay,
};
use crate::capture::frame::assemble_image;
use crate::capture::save::save_screenshot;
use crate::capture::session::CaptureSession;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved(PathBuf),
    FrameUnavailable,
    Failed(String),
    /// The host stopped before a frame arrived.
    Aborted,
}

/// Invoked on the capture worker once resources have been released.
pub type CaptureDone = Box<dyn FnOnce(CaptureOutcome) + Send>;

/// Native handles of one capture. Each one is released at most once, either
/// through [`release`](Self::release) or when the value is dropped.
#[derive(Default)]
struct CaptureResources {
    frame: Option<Box<dyn Frame>>,
    display: Option<Box<dyn VirtualDisplay>>,
    projection: Option<Box<dyn ProjectionToken>>,
    source: Option<Box<dyn FrameSource>>,
}

impl CaptureResources {
    fn open(backend: &dyn CaptureBackend, session: &CaptureSession) -> Result<Self> {
        let mut resources = Self::default();
        resources.projection = Some(
            backend
                .open_projection(&session.grant)
                .context("open media projection")?,
        );
        resources.source = Some(
            backend
                .open_frame_source(session.geometry)
                .context("open frame source")?,
        );
        if let (Some(projection), Some(source)) = (
            resources.projection.as_deref_mut(),
            resources.source.as_deref_mut(),
        ) {
            let display = backend
                .create_virtual_display(projection, session.geometry, source)
                .context("create virtual display")?;
            resources.display = Some(display);
        }
        Ok(resources)
    }

    fn release(&mut self) {
        if let Some(mut frame) = self.frame.take() {
            frame.close();
        }
        if let Some(mut display) = self.display.take() {
            display.release();
        }
        if let Some(mut projection) = self.projection.take() {
            projection.stop();
        }
        if let Some(mut source) = self.source.take() {
            source.set_frame_listener(None);
            source.close();
        }
    }
}

impl Drop for CaptureResources {
    fn drop(&mut self) {
        self.release();
    }
}

struct InFlight {
    abort_tx: Sender<CaptureSignal>,
    join: JoinHandle<()>,
}

/// Runs one-shot screen captures on a worker thread.
pub struct CaptureCoordinator {
    backend: Arc<dyn CaptureBackend>,
    output_dir: PathBuf,
    in_flight: Option<InFlight>,
}

impl CaptureCoordinator {
    pub fn new(backend: Arc<dyn CaptureBackend>, output_dir: PathBuf) -> Self {
        Self {
            backend,
            output_dir,
            in_flight: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn is_busy(&mut self) -> bool {
        self.reap();
        self.in_flight.is_some()
    }

    /// Open the capture pipeline for `session` and wait for a single frame on
    /// a worker. `done` runs on that worker after every resource is released.
    ///
    /// On error nothing was started and `done` is never called.
    pub fn begin(&mut self, session: CaptureSession, done: CaptureDone) -> Result<()> {
        if self.is_busy() {
            bail!("a screen capture is already in flight");
        }

        let mut resources = CaptureResources::open(self.backend.as_ref(), &session)?;
        let (signal_tx, signal_rx) = mpsc::channel();
        if let Some(source) = resources.source.as_deref_mut() {
            source.set_frame_listener(Some(FrameListener::new(signal_tx.clone())));
        }

        let output_dir = self.output_dir.clone();
        let join = std::thread::Builder::new()
            .name("screen-capture".into())
            .spawn(move || {
                let outcome = run_capture(resources, signal_rx, &output_dir);
                tracing::debug!(?outcome, "capture worker finished");
                done(outcome);
            })
            .context("spawn capture worker")?;

        self.in_flight = Some(InFlight {
            abort_tx: signal_tx,
            join,
        });
        Ok(())
    }

    /// Abort a pending capture and wait for its cleanup.
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            let _ = in_flight.abort_tx.send(CaptureSignal::Abort);
            if in_flight.join.join().is_err() {
                tracing::error!("capture worker panicked during shutdown");
            }
        }
    }

    fn reap(&mut self) {
        let finished = self
            .in_flight
            .as_ref()
            .map(|f| f.join.is_finished())
            .unwrap_or(false);
        if finished {
            if let Some(in_flight) = self.in_flight.take() {
                let _ = in_flight.join.join();
            }
        }
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_capture(
    mut resources: CaptureResources,
    signals: Receiver<CaptureSignal>,
    output_dir: &Path,
) -> CaptureOutcome {
    let outcome = match signals.recv() {
        Ok(CaptureSignal::FrameReady) => {
            if let Some(source) = resources.source.as_deref_mut() {
                source.set_frame_listener(None);
            }
            match panic::catch_unwind(AssertUnwindSafe(|| {
                process_frame(&mut resources, output_dir)
            })) {
                Ok(outcome) => outcome,
                Err(payload) => CaptureOutcome::Failed(panic_message(payload)),
            }
        }
        Ok(CaptureSignal::Abort) | Err(_) => CaptureOutcome::Aborted,
    };
    resources.release();
    outcome
}

fn process_frame(resources: &mut CaptureResources, output_dir: &Path) -> CaptureOutcome {
    let acquired = match resources.source.as_deref_mut() {
        Some(source) => source.acquire_latest_frame(),
        None => Err(anyhow!("frame source already closed")),
    };
    match acquired {
        Ok(Some(frame)) => resources.frame = Some(frame),
        Ok(None) => {
            tracing::warn!("no frame available after frame-ready");
            return CaptureOutcome::FrameUnavailable;
        }
        Err(err) => {
            tracing::error!(?err, "failed to acquire frame");
            return CaptureOutcome::Failed(format!("{err:#}"));
        }
    }

    let Some(frame) = resources.frame.as_deref() else {
        return CaptureOutcome::FrameUnavailable;
    };
    let (width, height) = frame.dimensions();
    let saved = assemble_image(&frame.plane(), width, height)
        .and_then(|image| save_screenshot(&image, output_dir, Local::now()));
    match saved {
        Ok(path) => CaptureOutcome::Saved(path),
        Err(err) => {
            tracing::error!(?err, "screen capture failed");
            CaptureOutcome::Failed(format!("{err:#}"))
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
