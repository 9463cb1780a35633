use crate::capture::frame::PlaneView;
use crate::capture::session::{DisplayGeometry, GrantToken};
use anyhow::{anyhow, bail, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSignal {
    FrameReady,
    Abort,
}

/// Single-shot frame-ready notifier handed to a [`FrameSource`].
///
/// Only the first [`notify`](Self::notify) reaches the capture worker; the
/// listener disarms itself as it fires, so sources that keep producing frames
/// cannot trigger a second processing pass.
#[derive(Clone)]
pub struct FrameListener {
    slot: Arc<Mutex<Option<Sender<CaptureSignal>>>>,
}

impl FrameListener {
    pub fn new(sender: Sender<CaptureSignal>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Returns `true` only for the notification that was delivered.
    pub fn notify(&self) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(sender) => sender.send(CaptureSignal::FrameReady).is_ok(),
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.slot.lock().map(|s| s.is_none()).unwrap_or(true)
    }
}

impl std::fmt::Debug for FrameListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameListener")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Capture right bound to a permission grant.
pub trait ProjectionToken: Send {
    fn stop(&mut self);
}

/// Off-screen display mirroring the screen into a [`FrameSource`].
pub trait VirtualDisplay: Send {
    fn release(&mut self);
}

pub trait Frame: Send {
    fn dimensions(&self) -> (u32, u32);
    fn plane(&self) -> PlaneView<'_>;
    fn close(&mut self);
}

/// Queue of frames produced by a virtual display.
pub trait FrameSource: Send {
    fn set_frame_listener(&mut self, listener: Option<FrameListener>);
    fn acquire_latest_frame(&mut self) -> Result<Option<Box<dyn Frame>>>;
    fn close(&mut self);
}

pub trait CaptureBackend: Send + Sync {
    fn open_projection(&self, grant: &GrantToken) -> Result<Box<dyn ProjectionToken>>;
    fn open_frame_source(&self, geometry: DisplayGeometry) -> Result<Box<dyn FrameSource>>;
    fn create_virtual_display(
        &self,
        projection: &mut dyn ProjectionToken,
        geometry: DisplayGeometry,
        source: &mut dyn FrameSource,
    ) -> Result<Box<dyn VirtualDisplay>>;
}

/// Backend for hosts without any capture facility.
#[derive(Debug, Default)]
pub struct UnsupportedCaptureBackend;

impl CaptureBackend for UnsupportedCaptureBackend {
    fn open_projection(&self, _grant: &GrantToken) -> Result<Box<dyn ProjectionToken>> {
        Err(anyhow!("screen capture is not available on this host"))
    }

    fn open_frame_source(&self, _geometry: DisplayGeometry) -> Result<Box<dyn FrameSource>> {
        Err(anyhow!("screen capture is not available on this host"))
    }

    fn create_virtual_display(
        &self,
        _projection: &mut dyn ProjectionToken,
        _geometry: DisplayGeometry,
        _source: &mut dyn FrameSource,
    ) -> Result<Box<dyn VirtualDisplay>> {
        Err(anyhow!("screen capture is not available on this host"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFrameBehavior {
    /// Deliver a frame whose rows are `row_stride` bytes apart.
    Frame { row_stride: usize },
    Unavailable,
    AcquireError,
    AcquirePanic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCaptureScript {
    pub frame: MockFrameBehavior,
    /// How many times the source fires its listener once one is installed.
    pub fire_count: usize,
    pub fail_frame_source: bool,
    pub fail_virtual_display: bool,
}

impl Default for MockCaptureScript {
    fn default() -> Self {
        Self {
            frame: MockFrameBehavior::Frame { row_stride: 0 },
            fire_count: 1,
            fail_frame_source: false,
            fail_virtual_display: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct CaptureCounters {
    pub projections_opened: AtomicUsize,
    pub projection_stops: AtomicUsize,
    pub sources_opened: AtomicUsize,
    pub source_closes: AtomicUsize,
    pub displays_created: AtomicUsize,
    pub display_releases: AtomicUsize,
    pub acquisitions: AtomicUsize,
    pub frame_closes: AtomicUsize,
    pub listener_fires: AtomicUsize,
}

impl CaptureCounters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Scripted backend that counts every acquire/release so tests can check the
/// cleanup contract.
#[derive(Debug, Default)]
pub struct MockCaptureBackend {
    script: MockCaptureScript,
    counters: Arc<CaptureCounters>,
}

impl MockCaptureBackend {
    pub fn new(script: MockCaptureScript) -> Self {
        Self {
            script,
            counters: Arc::new(CaptureCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<CaptureCounters> {
        Arc::clone(&self.counters)
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn open_projection(&self, grant: &GrantToken) -> Result<Box<dyn ProjectionToken>> {
        if grant.as_str().is_empty() {
            bail!("projection grant is empty");
        }
        bump(&self.counters.projections_opened);
        Ok(Box::new(MockProjection {
            counters: Arc::clone(&self.counters),
        }))
    }

    fn open_frame_source(&self, geometry: DisplayGeometry) -> Result<Box<dyn FrameSource>> {
        if self.script.fail_frame_source {
            bail!("frame source unavailable");
        }
        bump(&self.counters.sources_opened);
        Ok(Box::new(MockFrameSource {
            geometry,
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            listener: None,
        }))
    }

    fn create_virtual_display(
        &self,
        _projection: &mut dyn ProjectionToken,
        _geometry: DisplayGeometry,
        _source: &mut dyn FrameSource,
    ) -> Result<Box<dyn VirtualDisplay>> {
        if self.script.fail_virtual_display {
            bail!("virtual display rejected");
        }
        bump(&self.counters.displays_created);
        Ok(Box::new(MockDisplay {
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockProjection {
    counters: Arc<CaptureCounters>,
}

impl ProjectionToken for MockProjection {
    fn stop(&mut self) {
        bump(&self.counters.projection_stops);
    }
}

struct MockDisplay {
    counters: Arc<CaptureCounters>,
}

impl VirtualDisplay for MockDisplay {
    fn release(&mut self) {
        bump(&self.counters.display_releases);
    }
}

struct MockFrameSource {
    geometry: DisplayGeometry,
    script: MockCaptureScript,
    counters: Arc<CaptureCounters>,
    listener: Option<FrameListener>,
}

impl FrameSource for MockFrameSource {
    fn set_frame_listener(&mut self, listener: Option<FrameListener>) {
        self.listener = listener;
        if let Some(listener) = &self.listener {
            for _ in 0..self.script.fire_count {
                if listener.notify() {
                    bump(&self.counters.listener_fires);
                }
            }
        }
    }

    fn acquire_latest_frame(&mut self) -> Result<Option<Box<dyn Frame>>> {
        bump(&self.counters.acquisitions);
        match self.script.frame {
            MockFrameBehavior::Frame { row_stride } => {
                let DisplayGeometry { width, height, .. } = self.geometry;
                let row_stride = row_stride.max(width as usize * 4);
                let mut data = vec![0u8; row_stride * height as usize];
                for row in data.chunks_exact_mut(row_stride) {
                    for px in row[..width as usize * 4].chunks_exact_mut(4) {
                        px.copy_from_slice(&[0x20, 0x40, 0x80, 0xff]);
                    }
                }
                Ok(Some(Box::new(MockFrame {
                    width,
                    height,
                    row_stride,
                    data,
                    counters: Arc::clone(&self.counters),
                })))
            }
            MockFrameBehavior::Unavailable => Ok(None),
            MockFrameBehavior::AcquireError => Err(anyhow!("image reader has no buffers")),
            MockFrameBehavior::AcquirePanic => panic!("image reader crashed"),
        }
    }

    fn close(&mut self) {
        self.listener = None;
        bump(&self.counters.source_closes);
    }
}

struct MockFrame {
    width: u32,
    height: u32,
    row_stride: usize,
    data: Vec<u8>,
    counters: Arc<CaptureCounters>,
}

impl Frame for MockFrame {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn plane(&self) -> PlaneView<'_> {
        PlaneView {
            data: &self.data,
            pixel_stride: 4,
            row_stride: self.row_stride,
        }
    }

    fn close(&mut self) {
        bump(&self.counters.frame_closes);
    }
}
