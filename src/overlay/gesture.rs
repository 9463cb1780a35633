use crate::overlay::geometry::OverlayPosition;

/// Movement in pixels along either axis before a touch counts as a drag.
pub const DEFAULT_DRAG_THRESHOLD_PX: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// The platform aborted the touch stream.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
    pub at_ms: u64,
}

impl PointerSample {
    pub fn new(phase: PointerPhase, x: f32, y: f32, at_ms: u64) -> Self {
        Self { phase, x, y, at_ms }
    }

    pub fn down(x: f32, y: f32, at_ms: u64) -> Self {
        Self::new(PointerPhase::Down, x, y, at_ms)
    }

    pub fn moved(x: f32, y: f32, at_ms: u64) -> Self {
        Self::new(PointerPhase::Move, x, y, at_ms)
    }

    pub fn up(x: f32, y: f32, at_ms: u64) -> Self {
        Self::new(PointerPhase::Up, x, y, at_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GestureSession {
    origin: OverlayPosition,
    anchor_x: f32,
    anchor_y: f32,
    is_dragging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// A touch landed on the affordance; reveal the dismiss zone.
    DragStart,
    /// The affordance should be placed at `position`.
    DragMove {
        position: OverlayPosition,
        raw_x: f32,
        raw_y: f32,
    },
    Tap,
    DragEnd {
        raw_x: f32,
        raw_y: f32,
    },
    Cancelled,
}

/// Splits a single-finger touch stream into taps and drags.
#[derive(Debug)]
pub struct GestureClassifier {
    threshold_px: f32,
    session: Option<GestureSession>,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD_PX)
    }
}

impl GestureClassifier {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            threshold_px: threshold_px.max(0.0),
            session: None,
        }
    }

    pub fn threshold_px(&self) -> f32 {
        self.threshold_px
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.map(|s| s.is_dragging).unwrap_or(false)
    }

    /// Feed one pointer sample. `current` is the affordance's position at the
    /// moment the sample arrives; only the value seen on `Down` is retained.
    pub fn feed(
        &mut self,
        sample: PointerSample,
        current: OverlayPosition,
    ) -> Option<GestureEvent> {
        match sample.phase {
            PointerPhase::Down => {
                if self.session.is_some() {
                    tracing::debug!(at_ms = sample.at_ms, "ignoring down during active gesture");
                    return None;
                }
                self.session = Some(GestureSession {
                    origin: current,
                    anchor_x: sample.x,
                    anchor_y: sample.y,
                    is_dragging: false,
                });
                Some(GestureEvent::DragStart)
            }
            PointerPhase::Move => {
                let threshold = self.threshold_px;
                let session = self.session.as_mut()?;
                let dx = (sample.x - session.anchor_x) as i32;
                let dy = (sample.y - session.anchor_y) as i32;
                let raw_dx = sample.x - session.anchor_x;
                let raw_dy = sample.y - session.anchor_y;

                if !session.is_dragging && (raw_dx.abs() > threshold || raw_dy.abs() > threshold)
                {
                    session.is_dragging = true;
                }
                if !session.is_dragging {
                    return None;
                }

                let origin = session.origin;
                let x = if origin.anchor.is_right_anchored() {
                    origin.x - dx
                } else {
                    origin.x + dx
                };
                Some(GestureEvent::DragMove {
                    position: OverlayPosition {
                        x,
                        y: origin.y + dy,
                        anchor: origin.anchor,
                    },
                    raw_x: sample.x,
                    raw_y: sample.y,
                })
            }
            PointerPhase::Up => {
                let session = self.session.take()?;
                if session.is_dragging {
                    Some(GestureEvent::DragEnd {
                        raw_x: sample.x,
                        raw_y: sample.y,
                    })
                } else {
                    Some(GestureEvent::Tap)
                }
            }
            PointerPhase::Cancel => self.session.take().map(|_| GestureEvent::Cancelled),
        }
    }

    pub fn reset(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::geometry::Anchor;

    fn right_anchored() -> OverlayPosition {
        OverlayPosition {
            x: 30,
            y: 150,
            anchor: Anchor::TopEnd,
        }
    }

    fn run(classifier: &mut GestureClassifier, samples: &[PointerSample]) -> Vec<GestureEvent> {
        samples
            .iter()
            .filter_map(|s| classifier.feed(*s, right_anchored()))
            .collect()
    }

    #[test]
    fn jitter_within_threshold_is_a_tap() {
        let mut classifier = GestureClassifier::default();
        let events = run(
            &mut classifier,
            &[
                PointerSample::down(100.0, 100.0, 0),
                PointerSample::moved(105.0, 96.0, 10),
                PointerSample::moved(95.0, 105.0, 20),
                PointerSample::up(103.0, 102.0, 30),
            ],
        );
        assert_eq!(events, vec![GestureEvent::DragStart, GestureEvent::Tap]);
        assert!(!classifier.is_active());
    }

    #[test]
    fn single_axis_over_threshold_starts_drag() {
        let mut classifier = GestureClassifier::default();
        classifier.feed(PointerSample::down(100.0, 100.0, 0), right_anchored());
        // 4px on each axis: Euclidean would exceed 5, per-axis does not.
        assert_eq!(
            classifier.feed(PointerSample::moved(104.0, 104.0, 5), right_anchored()),
            None
        );
        assert!(!classifier.is_dragging());

        let event = classifier.feed(PointerSample::moved(100.0, 106.0, 10), right_anchored());
        assert!(matches!(event, Some(GestureEvent::DragMove { .. })));
        assert!(classifier.is_dragging());
    }

    #[test]
    fn right_anchor_flips_horizontal_delta() {
        let mut classifier = GestureClassifier::default();
        classifier.feed(PointerSample::down(100.0, 100.0, 0), right_anchored());
        let event = classifier.feed(PointerSample::moved(150.0, 140.0, 10), right_anchored());
        match event {
            Some(GestureEvent::DragMove { position, .. }) => {
                assert_eq!(position.x, 30 - 50);
                assert_eq!(position.y, 150 + 40);
                assert_eq!(position.anchor, Anchor::TopEnd);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn left_anchor_tracks_finger_directly() {
        let origin = OverlayPosition {
            x: 10,
            y: 10,
            anchor: Anchor::TopStart,
        };
        let mut classifier = GestureClassifier::default();
        classifier.feed(PointerSample::down(0.0, 0.0, 0), origin);
        let event = classifier.feed(PointerSample::moved(20.0, -8.0, 10), origin);
        match event {
            Some(GestureEvent::DragMove { position, .. }) => {
                assert_eq!((position.x, position.y), (30, 2));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn drag_does_not_tap_even_when_released_near_origin() {
        let mut classifier = GestureClassifier::default();
        let events = run(
            &mut classifier,
            &[
                PointerSample::down(100.0, 100.0, 0),
                PointerSample::moved(120.0, 100.0, 10),
                PointerSample::moved(101.0, 100.0, 20),
                PointerSample::up(100.0, 100.0, 30),
            ],
        );
        assert!(!events.contains(&GestureEvent::Tap));
        assert_eq!(
            events.last(),
            Some(&GestureEvent::DragEnd {
                raw_x: 100.0,
                raw_y: 100.0
            })
        );
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut classifier = GestureClassifier::default();
        assert_eq!(
            classifier.feed(PointerSample::moved(1.0, 1.0, 0), right_anchored()),
            None
        );
        assert_eq!(
            classifier.feed(PointerSample::up(1.0, 1.0, 0), right_anchored()),
            None
        );

        classifier.feed(PointerSample::down(0.0, 0.0, 0), right_anchored());
        assert_eq!(
            classifier.feed(PointerSample::down(50.0, 50.0, 5), right_anchored()),
            None
        );
        // The first anchor is still in effect.
        let event = classifier.feed(PointerSample::moved(10.0, 0.0, 10), right_anchored());
        assert!(matches!(
            event,
            Some(GestureEvent::DragMove { position, .. }) if position.x == 20
        ));
    }

    #[test]
    fn cancel_clears_session_without_tap() {
        let mut classifier = GestureClassifier::default();
        let events = run(
            &mut classifier,
            &[
                PointerSample::down(0.0, 0.0, 0),
                PointerSample::new(PointerPhase::Cancel, 0.0, 0.0, 5),
                PointerSample::up(0.0, 0.0, 10),
            ],
        );
        assert_eq!(events, vec![GestureEvent::DragStart, GestureEvent::Cancelled]);
    }

    #[test]
    fn every_small_gesture_is_a_tap() {
        for dx in -5..=5 {
            for dy in -5..=5 {
                let mut classifier = GestureClassifier::default();
                let events = run(
                    &mut classifier,
                    &[
                        PointerSample::down(200.0, 200.0, 0),
                        PointerSample::moved(200.0 + dx as f32, 200.0 + dy as f32, 10),
                        PointerSample::up(200.0 + dx as f32, 200.0 + dy as f32, 20),
                    ],
                );
                assert_eq!(events.last(), Some(&GestureEvent::Tap), "dx={dx} dy={dy}");
            }
        }
    }
}
