//! Windows: the [`WindowHandler`] that turns routed messages into attribute
//! changes on elements.
//!
//! A [`Window`] is backed by a registry object of class `Window`, so its
//! state is observable with notifications like any element:
//!
//! - `Status` is `"hidden"`, `"shown"` or `"closed"`; the main loop closes
//!   the window once it is no longer `"shown"`. The `close` method sets it.
//! - `Width`, `Height`, `Focused`, `Inside`, `MouseX`, `MouseY` mirror input.
//! - `HoverElement`, `ActiveElement` and `DoubleClick` name elements.
//! - `KeyDown`, `KeyUp`, `Interval` and `User` are force-set on every message
//!   of that kind, so each one notifies.
//!
//! Elements are placed with explicit rectangles; the most recently placed
//! visible area under the pointer wins hit testing.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft::widget;
//! use weft::window::Window;
//! use weft::{Application, ApplicationConfig, Rect};
//!
//! let app = Application::new(ApplicationConfig::default());
//! let mut window = Window::new(&app, "Main", 320, 200);
//! let ok = widget::create_button(app.registry(), "OK").unwrap();
//! window.add(ok, Rect::from_size(10, 10, 80, 24)).unwrap();
//! assert_eq!(window.element_at(20, 20), Some(ok));
//!
//! let id = app.add_window(Rc::new(RefCell::new(window)));
//! app.open_window(id).unwrap();
//! ```

mod double_click;

use std::rc::Rc;
use std::time::Instant;

use weft_core::object::ObjectRegistry;
use weft_core::{
    Application, Class, Message, MessageBody, MouseButton, NotifyMode, ObjectError, ObjectId,
    ObjectResult, Rect, Result, SharedObjectRegistry, Value, WindowHandler, WindowId, WindowStatus,
};

pub use double_click::{DoubleClick, DoubleClickTracker};

use crate::widget::{self, attrs as element_attrs};

/// Attribute names of window objects.
pub mod attrs {
    /// `"hidden"`, `"shown"` or `"closed"`.
    pub const STATUS: &str = "Status";
    /// Window title.
    pub const TITLE: &str = "Title";
    /// Client width.
    pub const WIDTH: &str = "Width";
    /// Client height.
    pub const HEIGHT: &str = "Height";
    /// Keyboard focus.
    pub const FOCUSED: &str = "Focused";
    /// The pointer is inside the window.
    pub const INSIDE: &str = "Inside";
    /// Last pointer position.
    pub const MOUSE_X: &str = "MouseX";
    /// Last pointer position.
    pub const MOUSE_Y: &str = "MouseY";
    /// The area under the pointer.
    pub const HOVER_ELEMENT: &str = "HoverElement";
    /// The widget holding the pointer grab.
    pub const ACTIVE_ELEMENT: &str = "ActiveElement";
    /// The element double-clicked, or the window itself.
    pub const DOUBLE_CLICK: &str = "DoubleClick";
    /// Last key pressed.
    pub const KEY_DOWN: &str = "KeyDown";
    /// Last key released.
    pub const KEY_UP: &str = "KeyUp";
    /// Modifiers of the last key message.
    pub const QUALIFIER: &str = "Qualifier";
    /// Ticks of the window's interval timer.
    pub const INTERVAL: &str = "Interval";
    /// Tag of the last user message.
    pub const USER_KIND: &str = "UserKind";
    /// Data of the last user message. An `Int`, or its decimal `Str` when it
    /// exceeds `i64::MAX`.
    pub const USER: &str = "User";
}

fn user_data(data: u64) -> Value {
    i64::try_from(data).map_or_else(|_| Value::from(data.to_string()), Value::Int)
}

const SHOWN: &str = "shown";
const HIDDEN: &str = "hidden";
const CLOSED: &str = "closed";

thread_local! {
    static WINDOW_CLASS: Rc<Class> = Class::builder("Window")
        .extends(&widget::element())
        .default(attrs::STATUS, HIDDEN)
        .default(attrs::TITLE, "")
        .default(attrs::WIDTH, 0)
        .default(attrs::HEIGHT, 0)
        .default(attrs::FOCUSED, false)
        .default(attrs::INSIDE, false)
        .default(attrs::MOUSE_X, 0)
        .default(attrs::MOUSE_Y, 0)
        .method("close", |registry, id, _args| {
            registry.set_value(id, attrs::STATUS, CLOSED, NotifyMode::Default)?;
            Ok(())
        })
        .build();
}

/// The class of window objects.
pub fn window_class() -> Rc<Class> {
    WINDOW_CLASS.with(Rc::clone)
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    element: ObjectId,
    rect: Rect,
}

/// A window holding placed elements.
#[derive(Debug)]
pub struct Window {
    registry: SharedObjectRegistry,
    object: ObjectId,
    title: String,
    size: (u32, u32),
    elements: Vec<Placement>,
    hover: Option<ObjectId>,
    active: Option<ObjectId>,
    double_click: DoubleClickTracker,
    id: Option<WindowId>,
}

static_assertions::assert_not_impl_any!(Window: Send, Sync);

impl Window {
    /// Create a window and its backing object, named after the title.
    pub fn new(app: &Application, title: impl Into<String>, width: u32, height: u32) -> Self {
        let title = title.into();
        let registry = app.registry().clone();
        let object = registry.create_named(&window_class(), title.as_str());
        Self {
            registry,
            object,
            title,
            size: (width, height),
            elements: Vec::new(),
            hover: None,
            active: None,
            double_click: DoubleClickTracker::new(app.config().double_click),
            id: None,
        }
    }

    /// The backing object.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// The id assigned by the application, once set up.
    pub fn id(&self) -> Option<WindowId> {
        self.id
    }

    /// Place an element, making it a child of the window object.
    ///
    /// Placing an element again moves it to the top.
    pub fn add(&mut self, element: ObjectId, rect: Rect) -> ObjectResult<()> {
        self.registry.set_parent(element, Some(self.object))?;
        self.elements.retain(|p| p.element != element);
        self.elements.push(Placement { element, rect });
        Ok(())
    }

    /// Move a placed element. Returns `false` if it is not placed.
    pub fn place(&mut self, element: ObjectId, rect: Rect) -> bool {
        match self.elements.iter_mut().find(|p| p.element == element) {
            Some(placement) => {
                placement.rect = rect;
                true
            }
            None => false,
        }
    }

    /// Stop hit testing an element. The object is left alive.
    pub fn remove(&mut self, element: ObjectId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|p| p.element != element);
        if self.hover == Some(element) {
            self.hover = None;
        }
        if self.active == Some(element) {
            self.active = None;
        }
        self.elements.len() != before
    }

    /// The rectangle of a placed element.
    pub fn rect(&self, element: ObjectId) -> Option<Rect> {
        self.elements
            .iter()
            .find(|p| p.element == element)
            .map(|p| p.rect)
    }

    /// The topmost visible area containing the point.
    pub fn element_at(&self, x: i32, y: i32) -> Option<ObjectId> {
        self.registry.with_read(|r| {
            self.elements
                .iter()
                .rev()
                .find(|p| p.rect.contains(x, y) && hit_testable(r, p.element))
                .map(|p| p.element)
        })
    }

    /// The area under the pointer.
    pub fn hover(&self) -> Option<ObjectId> {
        self.hover
    }

    /// The widget pressed and not yet released.
    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    fn set(&self, attribute: &str, value: impl Into<Value>, mode: NotifyMode) -> ObjectResult<()> {
        self.registry.set_value(self.object, attribute, value, mode)
    }

    fn dispatch(&mut self, message: &Message) -> ObjectResult<()> {
        match message.body {
            MessageBody::Close => self.set(attrs::STATUS, CLOSED, NotifyMode::Default),
            MessageBody::Focus { focused } => self.set(attrs::FOCUSED, focused, NotifyMode::Default),
            MessageBody::NewSize { width, height } => {
                self.size = (width, height);
                self.set(attrs::WIDTH, width, NotifyMode::Default)?;
                self.set(attrs::HEIGHT, height, NotifyMode::Default)
            }
            MessageBody::Refresh { rect } => {
                tracing::trace!(target: "weft::window", title = %self.title, ?rect, "refresh");
                Ok(())
            }
            MessageBody::MouseOver { inside } => {
                self.set(attrs::INSIDE, inside, NotifyMode::Default)?;
                if !inside {
                    self.set_hover(None)?;
                }
                Ok(())
            }
            MessageBody::MouseMove { x, y } => {
                self.set(attrs::MOUSE_X, x, NotifyMode::Default)?;
                self.set(attrs::MOUSE_Y, y, NotifyMode::Default)?;
                self.set_hover(self.element_at(x, y))
            }
            MessageBody::MouseButton {
                button,
                pressed: true,
                x,
                y,
            } => self.press(button, x, y, message.timestamp),
            MessageBody::MouseButton {
                button,
                pressed: false,
                x,
                y,
            } => self.release(button, x, y),
            MessageBody::KeyDown { code, qualifier } => {
                self.set(attrs::QUALIFIER, qualifier, NotifyMode::Suppress)?;
                self.set(attrs::KEY_DOWN, code, NotifyMode::Force)
            }
            MessageBody::KeyUp { code, qualifier } => {
                self.set(attrs::QUALIFIER, qualifier, NotifyMode::Suppress)?;
                self.set(attrs::KEY_UP, code, NotifyMode::Force)
            }
            MessageBody::Interval => self.set(attrs::INTERVAL, Value::Unset, NotifyMode::Force),
            MessageBody::User { kind, data } => {
                self.set(attrs::USER_KIND, kind, NotifyMode::Suppress)?;
                self.set(attrs::USER, user_data(data), NotifyMode::Force)
            }
        }
    }

    fn set_hover(&mut self, hit: Option<ObjectId>) -> ObjectResult<()> {
        if hit == self.hover {
            return Ok(());
        }
        if let Some(old) = self.hover.take() {
            if self.registry.contains(old) {
                self.registry
                    .set_value(old, element_attrs::HOVER, false, NotifyMode::Default)?;
            }
        }
        if let Some(new) = hit {
            self.registry
                .set_value(new, element_attrs::HOVER, true, NotifyMode::Default)?;
        }
        self.hover = hit;
        self.set(attrs::HOVER_ELEMENT, hit, NotifyMode::Default)
    }

    fn press(&mut self, button: MouseButton, x: i32, y: i32, time: Instant) -> ObjectResult<()> {
        let hit = self.element_at(x, y);
        if self.double_click.check(button, x, y, time).is_some() {
            let target = hit.unwrap_or(self.object);
            tracing::debug!(target: "weft::window", title = %self.title, ?target, "double click");
            self.set(attrs::DOUBLE_CLICK, target, NotifyMode::Force)?;
        }

        if button != MouseButton::Left || self.active.is_some() {
            return Ok(());
        }
        let Some(element) = hit.filter(|&id| self.pressable(id)) else {
            return Ok(());
        };
        self.active = Some(element);
        self.set(attrs::ACTIVE_ELEMENT, element, NotifyMode::Default)?;
        self.registry
            .set_value(element, element_attrs::PRESSED, true, NotifyMode::Default)
    }

    /// Release inside the pressed widget clears `Pressed` with notification,
    /// which is the click. Outside it is cleared silently.
    fn release(&mut self, button: MouseButton, x: i32, y: i32) -> ObjectResult<()> {
        if button != MouseButton::Left {
            return Ok(());
        }
        let Some(element) = self.active.take() else {
            return Ok(());
        };
        self.set(attrs::ACTIVE_ELEMENT, Value::Nil, NotifyMode::Default)?;
        if !self.registry.contains(element) {
            return Ok(());
        }

        let mode = if self.element_at(x, y) == Some(element) {
            NotifyMode::Default
        } else {
            tracing::trace!(target: "weft::window", ?element, "released outside");
            NotifyMode::Suppress
        };
        self.registry
            .set_value(element, element_attrs::PRESSED, false, mode)
    }

    fn pressable(&self, element: ObjectId) -> bool {
        self.registry.with_read(|r| {
            r.class(element).is_ok_and(|class| class.is_a("Widget"))
                && !attribute_truthy(r, element, element_attrs::DISABLED)
        })
    }
}

fn attribute_truthy(r: &ObjectRegistry, id: ObjectId, attribute: &str) -> bool {
    matches!(r.attribute(id, attribute), Ok(Some(value)) if value.is_truthy())
}

fn hit_testable(r: &ObjectRegistry, id: ObjectId) -> bool {
    let visible = match r.attribute(id, element_attrs::VISIBLE) {
        Ok(value) => value.is_none_or(Value::is_truthy),
        Err(_) => return false,
    };
    visible && r.class(id).is_ok_and(|class| class.is_a("Area"))
}

fn status_from(value: &Value) -> WindowStatus {
    match value.as_str() {
        Some(SHOWN) => WindowStatus::Shown,
        Some(CLOSED) => WindowStatus::Closed,
        _ => WindowStatus::Hidden,
    }
}

impl WindowHandler for Window {
    fn title(&self) -> &str {
        &self.title
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn setup(&mut self, _app: &Application, window: WindowId) -> Result<()> {
        self.id = Some(window);
        self.set(attrs::TITLE, self.title.as_str(), NotifyMode::Suppress)?;
        self.set(attrs::WIDTH, self.size.0, NotifyMode::Suppress)?;
        self.set(attrs::HEIGHT, self.size.1, NotifyMode::Suppress)?;
        self.set(attrs::STATUS, SHOWN, NotifyMode::Default)?;
        tracing::debug!(target: "weft::window", title = %self.title, ?window, "window shown");
        Ok(())
    }

    fn handle_message(&mut self, _app: &Application, message: &Message) {
        tracing::trace!(target: "weft::window", title = %self.title, kind = ?message.kind(), "message");
        if let Err(err) = self.dispatch(message) {
            tracing::warn!(
                target: "weft::window",
                title = %self.title,
                kind = ?message.kind(),
                error = %err,
                "message handling failed"
            );
        }
    }

    fn status(&self) -> WindowStatus {
        match self.registry.get_value(self.object, attrs::STATUS) {
            Ok(value) => status_from(&value),
            Err(ObjectError::InvalidObjectId) => WindowStatus::Closed,
            Err(_) => WindowStatus::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use weft_core::{Action, ApplicationConfig, Callable, Trigger};

    use super::*;

    fn app() -> Application {
        Application::new(ApplicationConfig::default())
    }

    fn mouse(window: &mut Window, pressed: bool, x: i32, y: i32) {
        let message = Message::new(
            WindowId::default(),
            MessageBody::MouseButton {
                button: MouseButton::Left,
                pressed,
                x,
                y,
            },
        );
        window.dispatch(&message).unwrap();
    }

    fn count_clicks(registry: &SharedObjectRegistry, id: ObjectId) -> Rc<RefCell<u32>> {
        let clicks = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&clicks);
        let action = Action::builder()
            .target(id)
            .callable(Callable::new(move |_, _, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            }))
            .build();
        registry
            .add_notify(id, element_attrs::CLICK, Trigger::Always, action, None)
            .unwrap();
        clicks
    }

    #[test]
    fn test_hit_testing_prefers_last_placed() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let back = widget::create_button(app.registry(), "back").unwrap();
        let front = widget::create_button(app.registry(), "front").unwrap();
        window.add(back, Rect::new(0, 0, 50, 50)).unwrap();
        window.add(front, Rect::new(25, 25, 75, 75)).unwrap();

        assert_eq!(window.element_at(10, 10), Some(back));
        assert_eq!(window.element_at(30, 30), Some(front));
        assert_eq!(window.element_at(90, 90), None);
        assert_eq!(app.registry().parent(front).unwrap(), Some(window.object()));

        app.registry()
            .set_value(front, element_attrs::VISIBLE, false, NotifyMode::Default)
            .unwrap();
        assert_eq!(window.element_at(30, 30), Some(back));

        assert!(window.place(back, Rect::new(60, 60, 70, 70)));
        assert_eq!(window.element_at(10, 10), None);
        assert!(window.remove(back));
        assert!(!window.remove(back));
    }

    #[test]
    fn test_plain_elements_are_not_hit() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let label = app.registry().create(&widget::element());
        window.add(label, Rect::new(0, 0, 50, 50)).unwrap();
        assert_eq!(window.element_at(10, 10), None);
    }

    #[test]
    fn test_release_inside_clicks() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let ok = widget::create_button(app.registry(), "OK").unwrap();
        window.add(ok, Rect::new(0, 0, 50, 20)).unwrap();
        let clicks = count_clicks(app.registry(), ok);

        mouse(&mut window, true, 10, 10);
        assert_eq!(window.active(), Some(ok));
        assert_eq!(
            app.registry().get_value(ok, element_attrs::PRESSED).unwrap(),
            Value::Bool(true)
        );

        mouse(&mut window, false, 12, 12);
        assert_eq!(*clicks.borrow(), 1);
        assert_eq!(window.active(), None);
    }

    #[test]
    fn test_release_outside_resets_silently() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let ok = widget::create_button(app.registry(), "OK").unwrap();
        window.add(ok, Rect::new(0, 0, 50, 20)).unwrap();
        let clicks = count_clicks(app.registry(), ok);

        mouse(&mut window, true, 10, 10);
        mouse(&mut window, false, 80, 80);
        assert_eq!(*clicks.borrow(), 0);
        assert_eq!(
            app.registry().get_value(ok, element_attrs::PRESSED).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_disabled_widget_is_not_pressed() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let ok = widget::create_button(app.registry(), "OK").unwrap();
        window.add(ok, Rect::new(0, 0, 50, 20)).unwrap();
        app.registry()
            .set_value(ok, element_attrs::DISABLED, true, NotifyMode::Default)
            .unwrap();

        mouse(&mut window, true, 10, 10);
        assert_eq!(window.active(), None);
    }

    #[test]
    fn test_hover_follows_pointer() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let ok = widget::create_button(app.registry(), "OK").unwrap();
        window.add(ok, Rect::new(0, 0, 50, 20)).unwrap();
        let registry = app.registry();

        let over = |x, y| Message::new(WindowId::default(), MessageBody::MouseMove { x, y });
        window.dispatch(&over(5, 5)).unwrap();
        assert_eq!(window.hover(), Some(ok));
        assert_eq!(registry.get_value(ok, element_attrs::HOVER).unwrap(), Value::Bool(true));
        assert_eq!(
            registry.get_value(window.object(), attrs::HOVER_ELEMENT).unwrap(),
            Value::Object(ok)
        );

        window.dispatch(&over(60, 60)).unwrap();
        assert_eq!(window.hover(), None);
        assert_eq!(registry.get_value(ok, element_attrs::HOVER).unwrap(), Value::Bool(false));
        assert_eq!(registry.get_value(window.object(), attrs::MOUSE_X).unwrap(), Value::Int(60));
    }

    #[test]
    fn test_double_click_names_element() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let ok = widget::create_button(app.registry(), "OK").unwrap();
        window.add(ok, Rect::new(0, 0, 50, 20)).unwrap();

        let t0 = Instant::now();
        for (pressed, offset) in [(true, 0), (false, 10), (true, 20), (false, 30)] {
            let mut message = Message::new(
                WindowId::default(),
                MessageBody::MouseButton {
                    button: MouseButton::Left,
                    pressed,
                    x: 10,
                    y: 10,
                },
            );
            message.timestamp = t0 + Duration::from_millis(offset);
            window.dispatch(&message).unwrap();
        }
        assert_eq!(
            app.registry()
                .get_value(window.object(), attrs::DOUBLE_CLICK)
                .unwrap(),
            Value::Object(ok)
        );
    }

    #[test]
    fn test_interval_notifies_every_tick() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        let ticks = count_ticks(&window);

        for _ in 0..3 {
            window
                .dispatch(&Message::new(WindowId::default(), MessageBody::Interval))
                .unwrap();
        }
        assert_eq!(*ticks.borrow(), 3);
    }

    #[test]
    fn test_user_data_is_not_wrapped() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        for (data, expected) in [
            (7, Value::Int(7)),
            (u64::MAX, Value::from(u64::MAX.to_string())),
        ] {
            window
                .dispatch(&Message::new(WindowId::default(), MessageBody::User { kind: 1, data }))
                .unwrap();
            assert_eq!(
                app.registry().get_value(window.object(), attrs::USER).unwrap(),
                expected
            );
        }
    }

    fn count_ticks(window: &Window) -> Rc<RefCell<u32>> {
        let ticks = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&ticks);
        let action = Action::builder()
            .this()
            .callable(Callable::new(move |_, _, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            }))
            .build();
        window
            .registry
            .add_notify(window.object(), attrs::INTERVAL, Trigger::Always, action, None)
            .unwrap();
        ticks
    }

    #[test]
    fn test_status_lifecycle() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        assert_eq!(window.status(), WindowStatus::Hidden);

        window.setup(&app, WindowId::default()).unwrap();
        assert_eq!(window.status(), WindowStatus::Shown);
        assert_eq!(
            app.registry().get_value(window.object(), attrs::TITLE).unwrap(),
            Value::from("Main")
        );

        app.registry()
            .call_method(window.object(), "close", &[])
            .unwrap();
        assert_eq!(window.status(), WindowStatus::Closed);

        app.registry().destroy(window.object()).unwrap();
        assert_eq!(window.status(), WindowStatus::Closed);
    }

    #[test]
    fn test_close_message() {
        let app = app();
        let mut window = Window::new(&app, "Main", 100, 100);
        window.setup(&app, WindowId::default()).unwrap();
        window.handle_message(&app, &Message::new(WindowId::default(), MessageBody::Close));
        assert_eq!(window.status(), WindowStatus::Closed);
    }
}
