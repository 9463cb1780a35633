use crate::overlay::geometry::{LayoutParams, ScreenMetrics};
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Bubble,
    Panel,
    RemoveTarget,
}

/// Privileged window-placement capability supplied by the host.
///
/// Implementations mirror a real window manager: attaching a surface twice or
/// detaching one that was never attached is an error.
pub trait WindowPlacement: Send {
    fn attach(&mut self, kind: SurfaceKind, params: &LayoutParams) -> Result<()>;
    fn detach(&mut self, kind: SurfaceKind) -> Result<()>;
    fn update_placement(&mut self, kind: SurfaceKind, params: &LayoutParams) -> Result<()>;
    fn set_visible(&mut self, kind: SurfaceKind, visible: bool) -> Result<()>;
    fn display_metrics(&self) -> ScreenMetrics;
}

/// Local view of one overlay surface. Guards every window call so that a
/// surface is never attached twice and never detached while absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    kind: SurfaceKind,
    attached: bool,
    visible: bool,
}

impl Surface {
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            attached: false,
            visible: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_visible(&self) -> bool {
        self.attached && self.visible
    }

    /// Returns `true` when the surface is attached after the call.
    pub fn attach(
        &mut self,
        window: &mut dyn WindowPlacement,
        params: &LayoutParams,
        visible: bool,
    ) -> bool {
        if self.attached {
            tracing::debug!(kind = ?self.kind, "surface already attached");
            return true;
        }
        if let Err(err) = window.attach(self.kind, params) {
            tracing::warn!(kind = ?self.kind, ?err, "failed to attach surface");
            return false;
        }
        self.attached = true;
        self.visible = true;
        if !visible {
            self.set_visible(window, false);
            if self.visible {
                tracing::error!(kind = ?self.kind, "surface could not be hidden after attach");
                self.detach(window);
                return false;
            }
        }
        true
    }

    pub fn detach(&mut self, window: &mut dyn WindowPlacement) {
        if !self.attached {
            return;
        }
        if let Err(err) = window.detach(self.kind) {
            tracing::warn!(kind = ?self.kind, ?err, "failed to detach surface");
        }
        self.attached = false;
        self.visible = false;
    }

    pub fn set_visible(&mut self, window: &mut dyn WindowPlacement, visible: bool) {
        if !self.attached || self.visible == visible {
            return;
        }
        match window.set_visible(self.kind, visible) {
            Ok(()) => self.visible = visible,
            Err(err) => tracing::warn!(kind = ?self.kind, visible, ?err, "failed to toggle surface"),
        }
    }

    pub fn update_placement(&self, window: &mut dyn WindowPlacement, params: &LayoutParams) {
        if !self.attached {
            return;
        }
        if let Err(err) = window.update_placement(self.kind, params) {
            tracing::warn!(kind = ?self.kind, ?err, "failed to update placement");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Attach(SurfaceKind, LayoutParams),
    Detach(SurfaceKind),
    Update(SurfaceKind, LayoutParams),
    SetVisible(SurfaceKind, bool),
}

#[derive(Debug, Default)]
struct MockWindowState {
    calls: Vec<WindowCall>,
    attached: HashMap<SurfaceKind, LayoutParams>,
    hidden: HashSet<SurfaceKind>,
    failing_attach: HashSet<SurfaceKind>,
    failing_visibility: HashSet<SurfaceKind>,
}

/// In-memory window system that records every call. Clones share state so a
/// test can keep a handle after boxing one into the controller.
#[derive(Debug, Clone, Default)]
pub struct MockWindowPlacement {
    metrics: ScreenMetrics,
    state: Arc<Mutex<MockWindowState>>,
}

impl MockWindowPlacement {
    pub fn with_metrics(metrics: ScreenMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockWindowState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Make every later `attach` of `kind` fail.
    pub fn fail_attach(&self, kind: SurfaceKind, failing: bool) {
        self.with_state(|s| {
            if failing {
                s.failing_attach.insert(kind);
            } else {
                s.failing_attach.remove(&kind);
            }
        })
    }

    /// Make every later `set_visible` of `kind` fail.
    pub fn fail_visibility(&self, kind: SurfaceKind, failing: bool) {
        self.with_state(|s| {
            if failing {
                s.failing_visibility.insert(kind);
            } else {
                s.failing_visibility.remove(&kind);
            }
        })
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn is_attached(&self, kind: SurfaceKind) -> bool {
        self.with_state(|s| s.attached.contains_key(&kind))
    }

    pub fn is_visible(&self, kind: SurfaceKind) -> bool {
        self.with_state(|s| s.attached.contains_key(&kind) && !s.hidden.contains(&kind))
    }

    pub fn placement(&self, kind: SurfaceKind) -> Option<LayoutParams> {
        self.with_state(|s| s.attached.get(&kind).copied())
    }

    pub fn attach_count(&self, kind: SurfaceKind) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, WindowCall::Attach(k, _) if *k == kind))
                .count()
        })
    }

    pub fn detach_count(&self, kind: SurfaceKind) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, WindowCall::Detach(k) if *k == kind))
                .count()
        })
    }
}

impl WindowPlacement for MockWindowPlacement {
    fn attach(&mut self, kind: SurfaceKind, params: &LayoutParams) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(WindowCall::Attach(kind, *params));
            if s.failing_attach.contains(&kind) {
                bail!("window manager refused {kind:?}");
            }
            if s.attached.contains_key(&kind) {
                bail!("{kind:?} has already been added to the window manager");
            }
            s.attached.insert(kind, *params);
            s.hidden.remove(&kind);
            Ok(())
        })
    }

    fn detach(&mut self, kind: SurfaceKind) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(WindowCall::Detach(kind));
            if s.attached.remove(&kind).is_none() {
                bail!("{kind:?} is not attached to the window manager");
            }
            s.hidden.remove(&kind);
            Ok(())
        })
    }

    fn update_placement(&mut self, kind: SurfaceKind, params: &LayoutParams) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(WindowCall::Update(kind, *params));
            match s.attached.get_mut(&kind) {
                Some(current) => {
                    *current = *params;
                    Ok(())
                }
                None => bail!("{kind:?} is not attached to the window manager"),
            }
        })
    }

    fn set_visible(&mut self, kind: SurfaceKind, visible: bool) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(WindowCall::SetVisible(kind, visible));
            if s.failing_visibility.contains(&kind) {
                bail!("window manager cannot toggle {kind:?}");
            }
            if visible {
                s.hidden.remove(&kind);
            } else {
                s.hidden.insert(kind);
            }
            Ok(())
        })
    }

    fn display_metrics(&self) -> ScreenMetrics {
        self.metrics
    }
}

/// Headless window system that only reports what a real one would do.
#[derive(Debug, Default)]
pub struct LoggingWindow {
    metrics: ScreenMetrics,
    attached: HashSet<SurfaceKind>,
}

impl LoggingWindow {
    pub fn new(metrics: ScreenMetrics) -> Self {
        Self {
            metrics,
            attached: HashSet::new(),
        }
    }
}

impl WindowPlacement for LoggingWindow {
    fn attach(&mut self, kind: SurfaceKind, params: &LayoutParams) -> Result<()> {
        if !self.attached.insert(kind) {
            bail!("{kind:?} is already attached");
        }
        tracing::info!(?kind, x = params.x, y = params.y, anchor = ?params.anchor, "attach");
        Ok(())
    }

    fn detach(&mut self, kind: SurfaceKind) -> Result<()> {
        if !self.attached.remove(&kind) {
            bail!("{kind:?} is not attached");
        }
        tracing::info!(?kind, "detach");
        Ok(())
    }

    fn update_placement(&mut self, kind: SurfaceKind, params: &LayoutParams) -> Result<()> {
        tracing::debug!(?kind, x = params.x, y = params.y, "update placement");
        Ok(())
    }

    fn set_visible(&mut self, kind: SurfaceKind, visible: bool) -> Result<()> {
        tracing::info!(?kind, visible, "visibility");
        Ok(())
    }

    fn display_metrics(&self) -> ScreenMetrics {
        self.metrics
    }
}
