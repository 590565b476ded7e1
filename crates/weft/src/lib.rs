//! weft - a retained-mode GUI toolkit built on attribute notifications.
//!
//! This is the umbrella crate: it re-exports [`weft_core`] and adds the
//! element classes ([`widget`]), the [`Window`](window::Window) handler, and
//! with the `winit` feature a native display backend.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft::prelude::*;
//!
//! let app = Application::new(ApplicationConfig::with_name("hello"));
//! let mut window = Window::new(&app, "Hello", 200, 80);
//! let quit = widget::create_button(app.registry(), "Quit").unwrap();
//! window.add(quit, Rect::from_size(60, 28, 80, 24)).unwrap();
//!
//! // Clicking Quit closes the window, which ends the main loop.
//! let close = Action::builder().target(window.object()).method("close").build();
//! app.registry()
//!     .add_notify(quit, widget::attrs::CLICK, Trigger::Always, close, None)
//!     .unwrap();
//!
//! let id = app.add_window(Rc::new(RefCell::new(window)));
//! app.open_window(id).unwrap();
//! for pressed in [true, false] {
//!     let body = MessageBody::MouseButton { button: MouseButton::Left, pressed, x: 70, y: 30 };
//!     app.post_message(Message::new(id, body)).unwrap();
//! }
//! assert_eq!(app.run(), AppStatus::Quit);
//! ```

pub use weft_core::*;

pub mod prelude;
pub mod widget;
pub mod window;

#[cfg(feature = "winit")]
pub mod backend;
