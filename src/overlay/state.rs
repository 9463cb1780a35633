#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    Capture,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    Collapsed,
    Expanded,
    Hidden(HiddenReason),
}

impl OverlayMode {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Hidden(HiddenReason::Teardown))
    }
}

pub fn can_transition(from: OverlayMode, to: OverlayMode) -> bool {
    use HiddenReason::{Capture, Teardown};
    use OverlayMode::{Collapsed, Expanded, Hidden};

    if from.is_terminal() {
        return from == to;
    }
    matches!(
        (from, to),
        (Collapsed, Expanded)
            | (Expanded, Collapsed)
            | (Collapsed, Hidden(Capture))
            | (Hidden(Capture), Collapsed)
            | (_, Hidden(Teardown))
    ) || from == to
}

#[cfg(test)]
mod tests {
    use super::{can_transition, HiddenReason, OverlayMode};

    #[test]
    fn teardown_is_terminal() {
        let dead = OverlayMode::Hidden(HiddenReason::Teardown);
        assert!(!can_transition(dead, OverlayMode::Collapsed));
        assert!(!can_transition(dead, OverlayMode::Expanded));
        assert!(can_transition(OverlayMode::Expanded, dead));
    }

    #[test]
    fn capture_only_starts_from_collapsed() {
        let capture = OverlayMode::Hidden(HiddenReason::Capture);
        assert!(can_transition(OverlayMode::Collapsed, capture));
        assert!(!can_transition(OverlayMode::Expanded, capture));
        assert!(!can_transition(capture, OverlayMode::Expanded));
        assert!(can_transition(capture, OverlayMode::Collapsed));
    }
}
