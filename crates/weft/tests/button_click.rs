//! End to end: messages routed through the main loop press a button.

use std::cell::RefCell;
use std::rc::Rc;

use weft::prelude::*;
use weft::widget::attrs;

struct Scenario {
    app: Application,
    window: WindowId,
    button: ObjectId,
    clicks: Rc<RefCell<u32>>,
    selected_seen: Rc<RefCell<Vec<Value>>>,
}

fn scenario(mode: ButtonMode) -> Scenario {
    let app = Application::new(ApplicationConfig::default());
    let registry = app.registry().clone();

    let mut window = Window::new(&app, "Main", 200, 100);
    let button = widget::create_button(&registry, "OK").unwrap();
    registry
        .set_value(button, attrs::MODE, mode, NotifyMode::Default)
        .unwrap();
    window.add(button, Rect::new(10, 10, 60, 30)).unwrap();

    let clicks = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&clicks);
    let on_click = Action::builder()
        .target(button)
        .callable(Callable::new(move |_, _, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        }))
        .build();
    registry
        .add_notify(button, attrs::CLICK, Trigger::Always, on_click, None)
        .unwrap();

    // Sample Selected after every press state change.
    let selected_seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&selected_seen);
    let sample = Action::builder()
        .this()
        .callable(Callable::new(move |registry, id, _| {
            log.borrow_mut().push(registry.get_value(id, attrs::SELECTED)?);
            Ok(())
        }))
        .build();
    registry
        .add_notify(button, attrs::PRESSED, Trigger::Always, sample, None)
        .unwrap();

    let window = app.add_window(Rc::new(RefCell::new(window)));
    app.open_window(window).unwrap();
    Scenario {
        app,
        window,
        button,
        clicks,
        selected_seen,
    }
}

fn mouse(pressed: bool, x: i32, y: i32) -> MessageBody {
    MessageBody::MouseButton {
        button: MouseButton::Left,
        pressed,
        x,
        y,
    }
}

#[test]
fn test_button_mode_clicks_once_on_release() {
    let s = scenario(ButtonMode::Button);
    for body in [mouse(true, 20, 20), mouse(false, 20, 20), MessageBody::Close] {
        s.app.post_message(Message::new(s.window, body)).unwrap();
    }

    assert_eq!(s.app.run(), AppStatus::Quit);
    assert_eq!(*s.clicks.borrow(), 1);
    assert_eq!(
        *s.selected_seen.borrow(),
        vec![Value::Bool(false), Value::Bool(false)]
    );
    assert_eq!(
        s.app.registry().get_value(s.button, attrs::SELECTED).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn test_release_outside_does_not_click() {
    let s = scenario(ButtonMode::Button);
    for body in [mouse(true, 20, 20), mouse(false, 150, 80), MessageBody::Close] {
        s.app.post_message(Message::new(s.window, body)).unwrap();
    }

    assert_eq!(s.app.run(), AppStatus::Quit);
    assert_eq!(*s.clicks.borrow(), 0);
    // The silent reset is not observed.
    assert_eq!(s.selected_seen.borrow().len(), 1);
}

#[test]
fn test_toggle_through_input_sender() {
    let s = scenario(ButtonMode::Toggle);
    let input = s.app.input_sender().unwrap();
    for body in [mouse(true, 20, 20), mouse(false, 20, 20), MessageBody::Close] {
        assert!(input.post(s.window, body));
    }

    assert_eq!(s.app.run(), AppStatus::Quit);
    assert_eq!(*s.clicks.borrow(), 1);
    assert_eq!(
        s.app.registry().get_value(s.button, attrs::SELECTED).unwrap(),
        Value::Bool(true)
    );
}
