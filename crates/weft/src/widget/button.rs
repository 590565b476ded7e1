//! Press handling shared by every widget.
//!
//! The `Pressed` attribute is set by the window on pointer press and release.
//! Its class-level notification calls `onPress(pressed)`, which interprets
//! the change according to the widget's `Mode`:
//!
//! | Mode     | Press                       | Release inside              |
//! |----------|-----------------------------|-----------------------------|
//! | `button` | -                           | click                       |
//! | `toggle` | -                           | flip `Selected`, then click |
//! | `touch`  | set `Selected`, then click  | -                           |
//! | `inert`  | -                           | -                           |
//!
//! A release outside the widget resets `Pressed` without notification, so
//! it never clicks.

use std::fmt;
use std::str::FromStr;

use weft_core::{MethodError, MethodResult, NotifyMode, ObjectId, SharedObjectRegistry, Value};

use super::attrs;

/// How a widget reacts to being pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonMode {
    /// Clicks on release. `Selected` is never set.
    #[default]
    Button,
    /// Flips `Selected` and clicks on release.
    Toggle,
    /// Sets `Selected` and clicks on press. Never deselects.
    Touch,
    /// Ignores presses.
    Inert,
}

/// A `Mode` attribute naming no known mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown button mode '{0}'")]
pub struct UnknownModeError(pub String);

impl ButtonMode {
    /// The name stored in the `Mode` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            ButtonMode::Button => "button",
            ButtonMode::Toggle => "toggle",
            ButtonMode::Touch => "touch",
            ButtonMode::Inert => "inert",
        }
    }

    /// Read the mode of a widget.
    pub fn of(registry: &SharedObjectRegistry, id: ObjectId) -> Result<ButtonMode, MethodError> {
        let mode = registry.get_value(id, attrs::MODE)?;
        let name = mode.as_str().unwrap_or_default();
        name.parse().map_err(|e: UnknownModeError| MethodError::new(e.to_string()))
    }
}

impl FromStr for ButtonMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "button" => Ok(ButtonMode::Button),
            "toggle" => Ok(ButtonMode::Toggle),
            "touch" => Ok(ButtonMode::Touch),
            "inert" => Ok(ButtonMode::Inert),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

impl fmt::Display for ButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ButtonMode> for Value {
    fn from(mode: ButtonMode) -> Self {
        Value::from(mode.as_str())
    }
}

/// `onPress(pressed)`.
pub(super) fn on_press(registry: &SharedObjectRegistry, id: ObjectId, args: &[Value]) -> MethodResult {
    let pressed = args.first().is_some_and(Value::is_truthy);
    if registry.get_value(id, attrs::DISABLED)?.is_truthy() {
        return Ok(());
    }

    match (ButtonMode::of(registry, id)?, pressed) {
        (ButtonMode::Button, false) => activate(registry, id),
        (ButtonMode::Toggle, false) => {
            let selected = !registry.get_value(id, attrs::SELECTED)?.is_truthy();
            registry.set_value(id, attrs::SELECTED, selected, NotifyMode::Default)?;
            activate(registry, id)
        }
        (ButtonMode::Touch, true) => {
            registry.set_value(id, attrs::SELECTED, true, NotifyMode::Default)?;
            activate(registry, id)
        }
        _ => Ok(()),
    }
}

/// `click()`: a full press and release.
pub(super) fn click(registry: &SharedObjectRegistry, id: ObjectId, _args: &[Value]) -> MethodResult {
    registry.set_value(id, attrs::PRESSED, true, NotifyMode::Default)?;
    registry.set_value(id, attrs::PRESSED, false, NotifyMode::Default)?;
    Ok(())
}

fn activate(registry: &SharedObjectRegistry, id: ObjectId) -> MethodResult {
    let selected = registry.get_value(id, attrs::SELECTED)?;
    tracing::debug!(target: "weft::window", ?id, %selected, "click");
    registry.set_value(id, attrs::CLICK, selected, NotifyMode::Force)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use weft_core::{Action, Callable, Trigger};

    use super::*;
    use crate::widget;

    /// A button plus a log of `Click` values.
    fn button(mode: ButtonMode) -> (SharedObjectRegistry, ObjectId, Rc<RefCell<Vec<Value>>>) {
        let registry = SharedObjectRegistry::new();
        let id = widget::create_button(&registry, "OK").unwrap();
        registry
            .set_value(id, attrs::MODE, mode, NotifyMode::Default)
            .unwrap();

        let clicks = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&clicks);
        let action = Action::builder()
            .target(id)
            .callable(Callable::new(move |_, _, args| {
                log.borrow_mut().push(args[0].clone());
                Ok(())
            }))
            .value()
            .build();
        registry
            .add_notify(id, attrs::CLICK, Trigger::Always, action, None)
            .unwrap();
        (registry, id, clicks)
    }

    fn press(registry: &SharedObjectRegistry, id: ObjectId, pressed: bool) {
        registry
            .set_value(id, attrs::PRESSED, pressed, NotifyMode::Default)
            .unwrap();
    }

    fn selected(registry: &SharedObjectRegistry, id: ObjectId) -> bool {
        registry.get_value(id, attrs::SELECTED).unwrap().is_truthy()
    }

    #[test]
    fn test_mode_names() {
        for mode in [ButtonMode::Button, ButtonMode::Toggle, ButtonMode::Touch, ButtonMode::Inert] {
            assert_eq!(mode.as_str().parse::<ButtonMode>(), Ok(mode));
        }
        assert_eq!(
            "radio".parse::<ButtonMode>(),
            Err(UnknownModeError("radio".to_string()))
        );
    }

    #[test]
    fn test_button_clicks_once_on_release() {
        let (registry, id, clicks) = button(ButtonMode::Button);

        press(&registry, id, true);
        assert!(clicks.borrow().is_empty());
        assert!(!selected(&registry, id));

        press(&registry, id, false);
        assert_eq!(*clicks.borrow(), vec![Value::Bool(false)]);
        assert!(!selected(&registry, id));
    }

    #[test]
    fn test_toggle_flips_selection_per_click() {
        let (registry, id, clicks) = button(ButtonMode::Toggle);

        for _ in 0..2 {
            press(&registry, id, true);
            press(&registry, id, false);
        }
        assert_eq!(*clicks.borrow(), vec![Value::Bool(true), Value::Bool(false)]);
        assert!(!selected(&registry, id));
    }

    #[test]
    fn test_touch_selects_on_press() {
        let (registry, id, clicks) = button(ButtonMode::Touch);

        press(&registry, id, true);
        assert_eq!(*clicks.borrow(), vec![Value::Bool(true)]);
        press(&registry, id, false);
        assert_eq!(clicks.borrow().len(), 1);
        assert!(selected(&registry, id));
    }

    #[test]
    fn test_inert_and_disabled_never_click() {
        let (registry, id, clicks) = button(ButtonMode::Inert);
        press(&registry, id, true);
        press(&registry, id, false);
        assert!(clicks.borrow().is_empty());

        let (registry, id, clicks) = button(ButtonMode::Button);
        registry
            .set_value(id, attrs::DISABLED, true, NotifyMode::Default)
            .unwrap();
        press(&registry, id, true);
        press(&registry, id, false);
        assert!(clicks.borrow().is_empty());
    }

    #[test]
    fn test_suppressed_release_does_not_click() {
        let (registry, id, clicks) = button(ButtonMode::Button);
        press(&registry, id, true);
        registry
            .set_value(id, attrs::PRESSED, false, NotifyMode::Suppress)
            .unwrap();
        assert!(clicks.borrow().is_empty());
        assert_eq!(registry.get_value(id, attrs::PRESSED).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_click_method() {
        let (registry, id, clicks) = button(ButtonMode::Toggle);
        registry.call_method(id, "click", &[]).unwrap();
        assert_eq!(*clicks.borrow(), vec![Value::Bool(true)]);
    }

    #[test]
    fn test_unknown_mode_fails_on_press() {
        let (registry, id, clicks) = button(ButtonMode::Button);
        registry
            .set_value(id, attrs::MODE, "radio", NotifyMode::Default)
            .unwrap();
        let err = registry
            .call_method(id, "onPress", &[Value::Bool(false)])
            .unwrap_err();
        assert_eq!(err.message(), "unknown button mode 'radio'");

        // Through the notification the failure is logged and dropped.
        press(&registry, id, true);
        press(&registry, id, false);
        assert!(clicks.borrow().is_empty());
    }
}
