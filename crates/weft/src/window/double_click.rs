//! Double-click detection.
//!
//! Two presses of the same button form a double-click when the second comes
//! within [`DoubleClickConfig::timeout`] of the first and no more than
//! [`DoubleClickConfig::jitter`] pixels away on either axis. The tracker is
//! disarmed after a double-click so a third press starts a new pair.

use std::time::Instant;

use weft_core::{DoubleClickConfig, MouseButton};

/// A detected double-click, at the position of the second press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleClick {
    /// The button pressed twice.
    pub button: MouseButton,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

#[derive(Debug, Clone, Copy)]
struct ClickState {
    button: MouseButton,
    x: i32,
    y: i32,
    time: Instant,
}

/// Tracks presses for one window.
#[derive(Debug, Clone, Default)]
pub struct DoubleClickTracker {
    config: DoubleClickConfig,
    last_click: Option<ClickState>,
}

impl DoubleClickTracker {
    /// Create a tracker with the given thresholds.
    pub fn new(config: DoubleClickConfig) -> Self {
        Self {
            config,
            last_click: None,
        }
    }

    /// The thresholds in use.
    pub fn config(&self) -> DoubleClickConfig {
        self.config
    }

    /// Record a press and report whether it completes a double-click.
    pub fn check(&mut self, button: MouseButton, x: i32, y: i32, time: Instant) -> Option<DoubleClick> {
        let jitter = i64::from(self.config.jitter);
        let is_double_click = self.last_click.is_some_and(|last| {
            last.button == button
                && time.saturating_duration_since(last.time) <= self.config.timeout
                && (i64::from(x) - i64::from(last.x)).abs() <= jitter
                && (i64::from(y) - i64::from(last.y)).abs() <= jitter
        });

        if is_double_click {
            self.last_click = None;
            Some(DoubleClick { button, x, y })
        } else {
            self.last_click = Some(ClickState { button, x, y, time });
            None
        }
    }

    /// Forget the last press.
    pub fn reset(&mut self) {
        self.last_click = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn tracker() -> (DoubleClickTracker, Instant) {
        (DoubleClickTracker::new(DoubleClickConfig::default()), Instant::now())
    }

    #[test]
    fn test_double_click_detection() {
        let (mut tracker, t0) = tracker();
        assert_eq!(tracker.check(MouseButton::Left, 10, 10, t0), None);
        assert_eq!(
            tracker.check(MouseButton::Left, 12, 9, t0 + Duration::from_millis(100)),
            Some(DoubleClick {
                button: MouseButton::Left,
                x: 12,
                y: 9
            })
        );
    }

    #[test]
    fn test_third_press_starts_new_pair() {
        let (mut tracker, t0) = tracker();
        let step = Duration::from_millis(50);
        assert!(tracker.check(MouseButton::Left, 0, 0, t0).is_none());
        assert!(tracker.check(MouseButton::Left, 0, 0, t0 + step).is_some());
        assert!(tracker.check(MouseButton::Left, 0, 0, t0 + step * 2).is_none());
        assert!(tracker.check(MouseButton::Left, 0, 0, t0 + step * 3).is_some());
    }

    #[test]
    fn test_double_click_different_buttons() {
        let (mut tracker, t0) = tracker();
        tracker.check(MouseButton::Left, 10, 10, t0);
        assert!(tracker.check(MouseButton::Right, 10, 10, t0).is_none());
    }

    #[test]
    fn test_double_click_too_far_or_too_late() {
        let (mut tracker, t0) = tracker();
        tracker.check(MouseButton::Left, 10, 10, t0);
        assert!(tracker.check(MouseButton::Left, 20, 10, t0).is_none());

        let late = t0 + DoubleClickConfig::default().timeout + Duration::from_millis(1);
        assert!(tracker.check(MouseButton::Left, 20, 10, late).is_none());
    }

    #[test]
    fn test_reset() {
        let (mut tracker, t0) = tracker();
        tracker.check(MouseButton::Left, 10, 10, t0);
        tracker.reset();
        assert!(tracker.check(MouseButton::Left, 10, 10, t0).is_none());
    }
}
