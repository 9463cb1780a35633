use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use volume_master::capture::{
    CaptureCoordinator, CaptureCounters, CaptureOutcome, CaptureSession, DisplayGeometry,
    GrantToken, MockCaptureBackend, MockCaptureScript, MockFrameBehavior,
};

const WAIT: Duration = Duration::from_secs(5);

fn geometry(width: u32, height: u32) -> DisplayGeometry {
    DisplayGeometry {
        width,
        height,
        density_dpi: 420,
    }
}

struct Harness {
    coordinator: CaptureCoordinator,
    counters: Arc<CaptureCounters>,
    dir: TempDir,
}

fn harness(script: MockCaptureScript) -> Harness {
    let backend = MockCaptureBackend::new(script);
    let counters = backend.counters();
    let dir = tempfile::tempdir().unwrap();
    let coordinator = CaptureCoordinator::new(Arc::new(backend), dir.path().join("shots"));
    Harness {
        coordinator,
        counters,
        dir,
    }
}

fn begin(h: &mut Harness, geometry: DisplayGeometry) -> Receiver<CaptureOutcome> {
    let (tx, rx) = mpsc::channel();
    h.coordinator
        .begin(
            CaptureSession::new(geometry, GrantToken::new("grant")),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        )
        .unwrap();
    rx
}

fn assert_released_once(counters: &CaptureCounters) {
    assert_eq!(CaptureCounters::get(&counters.projection_stops), 1);
    assert_eq!(CaptureCounters::get(&counters.display_releases), 1);
    assert_eq!(CaptureCounters::get(&counters.source_closes), 1);
}

#[test]
fn padded_frame_is_saved_at_true_width() {
    let mut h = harness(MockCaptureScript {
        frame: MockFrameBehavior::Frame { row_stride: 4360 },
        ..MockCaptureScript::default()
    });
    let rx = begin(&mut h, geometry(1080, 6));

    let CaptureOutcome::Saved(path) = rx.recv_timeout(WAIT).unwrap() else {
        panic!("expected a saved screenshot");
    };
    assert!(path.starts_with(h.dir.path().join("shots")));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Screenshot_") && name.ends_with(".png"));

    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (1080, 6));
    assert!(image.pixels().all(|p| p.0 == [0x20, 0x40, 0x80, 0xff]));

    assert_released_once(&h.counters);
    assert_eq!(CaptureCounters::get(&h.counters.frame_closes), 1);
}

#[test]
fn acquire_error_still_releases_everything_once() {
    let mut h = harness(MockCaptureScript {
        frame: MockFrameBehavior::AcquireError,
        ..MockCaptureScript::default()
    });
    let rx = begin(&mut h, geometry(4, 4));

    match rx.recv_timeout(WAIT).unwrap() {
        CaptureOutcome::Failed(reason) => assert!(reason.contains("no buffers")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_released_once(&h.counters);
    assert_eq!(CaptureCounters::get(&h.counters.frame_closes), 0);
}

#[test]
fn missing_frame_is_reported_without_retry() {
    let mut h = harness(MockCaptureScript {
        frame: MockFrameBehavior::Unavailable,
        ..MockCaptureScript::default()
    });
    let rx = begin(&mut h, geometry(4, 4));

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        CaptureOutcome::FrameUnavailable
    );
    assert_eq!(CaptureCounters::get(&h.counters.acquisitions), 1);
    assert_released_once(&h.counters);
}

#[test]
fn panic_during_processing_is_reported() {
    let mut h = harness(MockCaptureScript {
        frame: MockFrameBehavior::AcquirePanic,
        ..MockCaptureScript::default()
    });
    let rx = begin(&mut h, geometry(4, 4));

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        CaptureOutcome::Failed("image reader crashed".into())
    );
    assert_released_once(&h.counters);
}

#[test]
fn repeated_frame_ready_processes_once() {
    let mut h = harness(MockCaptureScript {
        fire_count: 3,
        ..MockCaptureScript::default()
    });
    let rx = begin(&mut h, geometry(8, 8));

    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        CaptureOutcome::Saved(_)
    ));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(CaptureCounters::get(&h.counters.listener_fires), 1);
    assert_eq!(CaptureCounters::get(&h.counters.acquisitions), 1);
}

#[test]
fn shutdown_aborts_pending_capture() {
    let mut h = harness(MockCaptureScript {
        fire_count: 0,
        ..MockCaptureScript::default()
    });
    let rx = begin(&mut h, geometry(8, 8));
    assert!(h.coordinator.is_busy());

    h.coordinator.shutdown();

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), CaptureOutcome::Aborted);
    assert!(!h.coordinator.is_busy());
    assert_eq!(CaptureCounters::get(&h.counters.acquisitions), 0);
    assert_released_once(&h.counters);
}

#[test]
fn second_capture_rejected_while_busy() {
    let mut h = harness(MockCaptureScript {
        fire_count: 0,
        ..MockCaptureScript::default()
    });
    let _rx = begin(&mut h, geometry(8, 8));
    let err = h
        .coordinator
        .begin(
            CaptureSession::new(geometry(8, 8), GrantToken::new("again")),
            Box::new(|_| {}),
        )
        .unwrap_err();
    assert!(err.to_string().contains("already in flight"));
    assert_eq!(CaptureCounters::get(&h.counters.projections_opened), 1);
}

#[test]
fn failed_setup_releases_what_was_opened() {
    let mut h = harness(MockCaptureScript {
        fail_virtual_display: true,
        ..MockCaptureScript::default()
    });
    let (tx, rx) = mpsc::channel::<CaptureOutcome>();
    let result = h.coordinator.begin(
        CaptureSession::new(geometry(8, 8), GrantToken::new("grant")),
        Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }),
    );

    assert!(result.is_err());
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(CaptureCounters::get(&h.counters.projection_stops), 1);
    assert_eq!(CaptureCounters::get(&h.counters.source_closes), 1);
    assert_eq!(CaptureCounters::get(&h.counters.display_releases), 0);
    assert!(!h.coordinator.is_busy());
}

#[test]
fn empty_grant_is_rejected_before_anything_opens() {
    let mut h = harness(MockCaptureScript::default());
    let result = h.coordinator.begin(
        CaptureSession::new(geometry(8, 8), GrantToken::new("")),
        Box::new(|_| {}),
    );

    assert!(result.is_err());
    assert_eq!(CaptureCounters::get(&h.counters.projections_opened), 0);
    assert_eq!(CaptureCounters::get(&h.counters.sources_opened), 0);
}
