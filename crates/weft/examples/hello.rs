//! A native window with a counter and a toggle.
//!
//! Run with: cargo run -p weft --features winit --example hello

use std::cell::RefCell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use weft::backend::WinitDisplay;
use weft::prelude::*;
use weft::widget::attrs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("weft=debug".parse()?))
        .init();

    let app = Application::with_display(
        ApplicationConfig::with_name("hello"),
        Box::new(WinitDisplay::new()?),
    );
    let registry = app.registry().clone();

    let mut window = Window::new(&app, "Hello weft", 320, 120);
    let count = widget::create_button(&registry, "Count")?;
    let toggle = widget::create_button(&registry, "Toggle")?;
    registry.set_value(toggle, attrs::MODE, ButtonMode::Toggle, NotifyMode::Default)?;
    window.add(count, Rect::from_size(20, 40, 120, 40))?;
    window.add(toggle, Rect::from_size(180, 40, 120, 40))?;

    // Each click copies the running total into the label.
    let clicks = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&clicks);
    let show = Action::builder()
        .target(count)
        .callable(Callable::new(move |registry, id, _| {
            *counter.borrow_mut() += 1;
            let text = format!("Count: {}", counter.borrow());
            registry.set_value(id, attrs::TEXT, text, NotifyMode::Default)?;
            Ok(())
        }))
        .build();
    registry.add_notify(count, attrs::CLICK, Trigger::Always, show, None)?;

    let report = Action::builder()
        .target(toggle)
        .method("setValue")
        .arg(attrs::TEXT)
        .format("Toggle: {}")
        .build();
    registry.add_notify(toggle, attrs::SELECTED, Trigger::Always, report, None)?;

    let id = app.add_window(Rc::new(RefCell::new(window)));
    app.open_window(id)?;
    let status = app.run();
    println!("finished with {status:?} after {} clicks", clicks.borrow());
    Ok(())
}
