use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TOAST_LOG_FILE: &str = "toast.log";

pub fn append_toast_log(path: &Path, msg: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{} - {}", Local::now().to_rfc3339(), msg);
    }
}

/// User-visible message raised by the overlay service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved(PathBuf),
    CaptureFailed(String),
    PermissionDenied,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Saved(_) => "Screenshot Saved!".to_string(),
            Notice::CaptureFailed(reason) => format!("Capture Failed: {reason}"),
            Notice::PermissionDenied => "Screenshot permission denied".to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Logs notices and mirrors them into the toast log when toasts are enabled.
#[derive(Debug, Clone)]
pub struct ToastNotifier {
    enabled: bool,
    log_path: PathBuf,
}

impl ToastNotifier {
    pub fn new(enabled: bool) -> Self {
        Self::with_log_path(enabled, PathBuf::from(TOAST_LOG_FILE))
    }

    pub fn with_log_path(enabled: bool, log_path: PathBuf) -> Self {
        Self { enabled, log_path }
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, notice: Notice) {
        let message = notice.message();
        match &notice {
            Notice::Saved(path) => tracing::info!(path = %path.display(), "{message}"),
            _ => tracing::warn!("{message}"),
        }
        if self.enabled {
            append_toast_log(&self.log_path, &message);
        }
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
