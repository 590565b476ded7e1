//! The window side of the main loop.

use slotmap::new_key_type;

use crate::application::Application;
use crate::error::Result;
use crate::message::Message;

new_key_type! {
    /// Identifies a window registered with an [`Application`].
    pub struct WindowId;
}

/// Visibility of a window as seen by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowStatus {
    /// Open and receiving messages.
    Shown,
    /// Not yet shown, or hidden.
    #[default]
    Hidden,
    /// Closed for good.
    Closed,
}

/// Implemented by anything the main loop can drive as a window.
///
/// Handlers are called with no loop state borrowed, so they may call any
/// [`Application`] method. Window set changes made from a handler take
/// effect at the start of the next loop iteration.
pub trait WindowHandler {
    /// Title passed to the display when the surface opens.
    fn title(&self) -> &str {
        "weft"
    }

    /// Initial surface size.
    fn size(&self) -> (u32, u32) {
        (640, 480)
    }

    /// Called once before the surface opens.
    fn setup(&mut self, _app: &Application, _window: WindowId) -> Result<()> {
        Ok(())
    }

    /// Handle one routed message.
    fn handle_message(&mut self, app: &Application, message: &Message);

    /// Called after each batch of messages.
    fn update(&mut self, _app: &Application) {}

    /// Windows that are not [`WindowStatus::Shown`] are closed by the loop.
    fn status(&self) -> WindowStatus;
}
