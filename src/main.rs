use std::sync::Arc;
use std::time::{Duration, Instant};

use volume_master::audio::MemoryAudioLevels;
use volume_master::capture::DesktopCaptureBackend;
use volume_master::overlay::{LoggingWindow, ScreenMetrics};
use volume_master::script::load_script;
use volume_master::service::{OverlayService, ServiceConfig, ServiceFlow};
use volume_master::settings::{Settings, SETTINGS_FILE};
use volume_master::toast_log::ToastNotifier;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    volume_master::logging::init(settings.debug_logging, settings.log_path());

    let Some(script_path) = std::env::args().nth(1) else {
        anyhow::bail!("usage: volume_master <script.jsonl>");
    };
    let steps = load_script(&script_path)?;

    let mut service = OverlayService::new(
        ServiceConfig::from_settings(&settings),
        Box::new(LoggingWindow::new(ScreenMetrics::default())),
        Arc::new(DesktopCaptureBackend),
        Box::new(MemoryAudioLevels::new()),
        Arc::new(ToastNotifier::new(settings.enable_toasts)),
    );

    let started = Instant::now();
    for step in &steps {
        let at_ms = started.elapsed().as_millis() as u64;
        let flow = match step.to_command(at_ms) {
            Some(command) => service.handle(command),
            None => {
                if let volume_master::script::ScriptStep::Wait { ms } = step {
                    std::thread::sleep(Duration::from_millis(*ms));
                }
                ServiceFlow::Continue
            }
        };
        if flow == ServiceFlow::Exit || service.pump() == ServiceFlow::Exit {
            tracing::info!("script ended the overlay service");
            return Ok(());
        }
    }

    while service.capture_in_flight() {
        std::thread::sleep(Duration::from_millis(20));
    }
    service.pump();
    service.stop();
    Ok(())
}
