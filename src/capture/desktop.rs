use crate::capture::backend::{
    CaptureBackend, Frame, FrameListener, FrameSource, ProjectionToken, VirtualDisplay,
};
use crate::capture::frame::PlaneView;
use crate::capture::session::{DisplayGeometry, GrantToken};
use anyhow::{anyhow, Result};
use image::RgbaImage;
use screenshots::Screen;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Grabs the primary desktop through the `screenshots` crate.
///
/// The permission grant is accepted as-is; desktop platforms gate capture at
/// the OS level instead.
#[derive(Debug, Default)]
pub struct DesktopCaptureBackend;

impl CaptureBackend for DesktopCaptureBackend {
    fn open_projection(&self, _grant: &GrantToken) -> Result<Box<dyn ProjectionToken>> {
        Ok(Box::new(DesktopProjection))
    }

    fn open_frame_source(&self, _geometry: DisplayGeometry) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(DesktopFrameSource::default()))
    }

    fn create_virtual_display(
        &self,
        _projection: &mut dyn ProjectionToken,
        geometry: DisplayGeometry,
        _source: &mut dyn FrameSource,
    ) -> Result<Box<dyn VirtualDisplay>> {
        tracing::debug!(
            width = geometry.width,
            height = geometry.height,
            dpi = geometry.density_dpi,
            "desktop capture display ready"
        );
        Ok(Box::new(DesktopDisplay))
    }
}

struct DesktopProjection;

impl ProjectionToken for DesktopProjection {
    fn stop(&mut self) {
        tracing::debug!("desktop projection stopped");
    }
}

struct DesktopDisplay;

impl VirtualDisplay for DesktopDisplay {
    fn release(&mut self) {
        tracing::debug!("desktop capture display released");
    }
}

type PendingGrab = Arc<Mutex<Option<Result<RgbaImage, String>>>>;
type ListenerSlot = Arc<Mutex<Option<FrameListener>>>;

#[derive(Default)]
struct DesktopFrameSource {
    pending: PendingGrab,
    listener: ListenerSlot,
    grab: Option<JoinHandle<()>>,
}

fn grab_primary_screen() -> Result<RgbaImage> {
    let screen = Screen::from_point(0, 0)?;
    Ok(screen.capture()?)
}

fn take_listener(slot: &ListenerSlot) -> Option<FrameListener> {
    match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

impl FrameSource for DesktopFrameSource {
    fn set_frame_listener(&mut self, listener: Option<FrameListener>) {
        let Some(listener) = listener else {
            take_listener(&self.listener);
            return;
        };
        if let Ok(mut slot) = self.listener.lock() {
            *slot = Some(listener);
        }
        if self.grab.is_some() {
            return;
        }
        let pending = Arc::clone(&self.pending);
        let slot = Arc::clone(&self.listener);
        let spawned = std::thread::Builder::new()
            .name("desktop-grab".into())
            .spawn(move || {
                let grabbed = grab_primary_screen().map_err(|err| format!("{err:#}"));
                if let Ok(mut pending) = pending.lock() {
                    *pending = Some(grabbed);
                }
                match take_listener(&slot) {
                    Some(listener) => {
                        listener.notify();
                    }
                    None => tracing::debug!("desktop grab finished after listener detached"),
                }
            });
        match spawned {
            Ok(handle) => self.grab = Some(handle),
            Err(err) => tracing::error!(?err, "failed to spawn desktop grab"),
        }
    }

    fn acquire_latest_frame(&mut self) -> Result<Option<Box<dyn Frame>>> {
        let grabbed = self
            .pending
            .lock()
            .map_err(|_| anyhow!("desktop grab lock poisoned"))?
            .take();
        match grabbed {
            Some(Ok(image)) => Ok(Some(Box::new(DesktopFrame { image }))),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        take_listener(&self.listener);
        if let Some(handle) = self.grab.take() {
            let _ = handle.join();
        }
    }
}

struct DesktopFrame {
    image: RgbaImage,
}

impl Frame for DesktopFrame {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn plane(&self) -> PlaneView<'_> {
        PlaneView {
            data: self.image.as_raw(),
            pixel_stride: 4,
            row_stride: self.image.width() as usize * 4,
        }
    }

    fn close(&mut self) {}
}
