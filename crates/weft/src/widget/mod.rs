//! Element classes for weft.
//!
//! Elements are ordinary registry objects. Their behavior lives in classes
//! built on [`Class::object`], forming the chain:
//!
//! ```text
//! Object
//! └── Element      Disabled, Visible
//!     ├── Area     Hover (hit testable)
//!     │   └── Widget   Pressed, Selected, Mode, Click
//!     │       └── Button   Text
//!     └── Window   Status, Width, Height, ...
//! ```
//!
//! Widgets react to their own attribute changes through class-level
//! notifications: setting `Pressed` runs the widget's `onPress` method, which
//! applies the [`ButtonMode`] state machine and force-sets `Click` when the
//! widget is activated. Observe clicks with
//! [`add_notify`](weft_core::SharedObjectRegistry::add_notify) on `Click`.
//!
//! # Example
//!
//! ```
//! use weft::widget::{self, attrs};
//! use weft::{NotifyMode, SharedObjectRegistry, Value};
//!
//! let registry = SharedObjectRegistry::new();
//! let button = widget::create_button(&registry, "OK").unwrap();
//!
//! registry.set_value(button, attrs::PRESSED, true, NotifyMode::Default).unwrap();
//! registry.set_value(button, attrs::PRESSED, false, NotifyMode::Default).unwrap();
//! assert_eq!(registry.get_value(button, attrs::SELECTED).unwrap(), Value::Bool(false));
//! ```

mod button;

use std::rc::Rc;

use weft_core::{Action, Class, NotifyMode, ObjectId, ObjectResult, SharedObjectRegistry, Trigger};

pub use button::{ButtonMode, UnknownModeError};

/// Attribute names used by element classes and windows.
pub mod attrs {
    /// Element ignores input when truthy.
    pub const DISABLED: &str = "Disabled";
    /// Hidden elements are skipped by hit testing.
    pub const VISIBLE: &str = "Visible";
    /// The pointer is over the area.
    pub const HOVER: &str = "Hover";
    /// The pointer button went down on the widget and has not been released.
    pub const PRESSED: &str = "Pressed";
    /// Persistent selection, driven by the widget's mode.
    pub const SELECTED: &str = "Selected";
    /// One of the [`ButtonMode`](super::ButtonMode) names.
    pub const MODE: &str = "Mode";
    /// Force-set on activation; the value is the current `Selected`.
    pub const CLICK: &str = "Click";
    /// Button label.
    pub const TEXT: &str = "Text";
}

thread_local! {
    static ELEMENT_CLASS: Rc<Class> = Class::builder("Element")
        .default(attrs::DISABLED, false)
        .default(attrs::VISIBLE, true)
        .build();

    static AREA_CLASS: Rc<Class> = ELEMENT_CLASS.with(|element| {
        Class::builder("Area")
            .extends(element)
            .default(attrs::HOVER, false)
            .build()
    });

    static WIDGET_CLASS: Rc<Class> = AREA_CLASS.with(|area| {
        Class::builder("Widget")
            .extends(area)
            .default(attrs::PRESSED, false)
            .default(attrs::SELECTED, false)
            .default(attrs::MODE, ButtonMode::Inert.as_str())
            .method("onPress", button::on_press)
            .method("click", button::click)
            .notify(
                attrs::PRESSED,
                Trigger::Always,
                Action::builder().this().method("onPress").value().build(),
            )
            .build()
    });

    static BUTTON_CLASS: Rc<Class> = WIDGET_CLASS.with(|widget| {
        Class::builder("Button")
            .extends(widget)
            .default(attrs::MODE, ButtonMode::Button.as_str())
            .default(attrs::TEXT, "")
            .build()
    });
}

/// Base class of everything placed in a window.
pub fn element() -> Rc<Class> {
    ELEMENT_CLASS.with(Rc::clone)
}

/// An element that takes part in hit testing.
pub fn area() -> Rc<Class> {
    AREA_CLASS.with(Rc::clone)
}

/// An area with press handling. Its default mode is `inert`.
pub fn widget() -> Rc<Class> {
    WIDGET_CLASS.with(Rc::clone)
}

/// A widget in `button` mode with a text label.
pub fn button() -> Rc<Class> {
    BUTTON_CLASS.with(Rc::clone)
}

/// Create a button labelled `text`. The object is named after the label.
pub fn create_button(registry: &SharedObjectRegistry, text: &str) -> ObjectResult<ObjectId> {
    let id = registry.create_named(&button(), text);
    registry.set_value(id, attrs::TEXT, text, NotifyMode::Suppress)?;
    Ok(id)
}
