//! Native windows through winit.
//!
//! [`WinitDisplay`] drives winit's event loop with `pump_app_events`, so the
//! weft main loop stays in control: `wait` pumps with the loop's timeout and
//! collects translated messages for the next `drain`. Available on the
//! desktop platforms winit supports pumping on.
//!
//! ```no_run
//! use weft::backend::WinitDisplay;
//! use weft::{Application, ApplicationConfig};
//!
//! let display = WinitDisplay::new().unwrap();
//! let app = Application::with_display(ApplicationConfig::default(), Box::new(display));
//! ```

use std::collections::HashMap;
use std::time::Duration;

use weft_core::{Display, DisplayError, Message, MessageBody, MouseButton, Rect, WindowId};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::ModifiersState;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::platform::scancode::PhysicalKeyExtScancode;
use winit::window::{Window as NativeWindow, WindowAttributes, WindowId as NativeWindowId};

/// Converts a winit mouse button to a weft [`MouseButton`].
pub fn from_winit_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Other(4),
        WinitMouseButton::Forward => MouseButton::Other(5),
        WinitMouseButton::Other(n) => MouseButton::Other(n),
    }
}

struct Surface {
    window: WindowId,
    native: NativeWindow,
    cursor: (i32, i32),
}

/// Event loop side of the display: owns native windows and buffers input.
#[derive(Default)]
struct State {
    opening: Vec<(WindowId, WindowAttributes)>,
    surfaces: HashMap<NativeWindowId, Surface>,
    ids: HashMap<WindowId, NativeWindowId>,
    failures: Vec<(WindowId, String)>,
    modifiers: ModifiersState,
    input: Vec<Message>,
}

impl State {
    fn create_pending(&mut self, event_loop: &ActiveEventLoop) {
        for (window, attributes) in std::mem::take(&mut self.opening) {
            match event_loop.create_window(attributes) {
                Ok(native) => {
                    let native_id = native.id();
                    self.ids.insert(window, native_id);
                    self.surfaces.insert(
                        native_id,
                        Surface {
                            window,
                            native,
                            cursor: (0, 0),
                        },
                    );
                    tracing::debug!(target: "weft::window", ?window, ?native_id, "native window created");
                }
                Err(err) => {
                    tracing::error!(target: "weft::window", ?window, error = %err, "native window creation failed");
                    self.failures.push((window, err.to_string()));
                }
            }
        }
    }

    fn translate(&mut self, native: NativeWindowId, event: WindowEvent) -> Option<Message> {
        if let WindowEvent::ModifiersChanged(modifiers) = &event {
            self.modifiers = modifiers.state();
            return None;
        }

        let qualifier = self.modifiers.bits();
        let surface = self.surfaces.get_mut(&native)?;
        let body = match event {
            WindowEvent::CloseRequested => MessageBody::Close,
            WindowEvent::Focused(focused) => MessageBody::Focus { focused },
            WindowEvent::Resized(size) => MessageBody::NewSize {
                width: size.width,
                height: size.height,
            },
            WindowEvent::RedrawRequested => {
                let size = surface.native.inner_size();
                MessageBody::Refresh {
                    rect: Rect::from_size(0, 0, clamp(size.width), clamp(size.height)),
                }
            }
            WindowEvent::CursorEntered { .. } => MessageBody::MouseOver { inside: true },
            WindowEvent::CursorLeft { .. } => MessageBody::MouseOver { inside: false },
            WindowEvent::CursorMoved { position, .. } => {
                surface.cursor = (position.x as i32, position.y as i32);
                MessageBody::MouseMove {
                    x: surface.cursor.0,
                    y: surface.cursor.1,
                }
            }
            WindowEvent::MouseInput { state, button, .. } => MessageBody::MouseButton {
                button: from_winit_mouse_button(button),
                pressed: state == ElementState::Pressed,
                x: surface.cursor.0,
                y: surface.cursor.1,
            },
            WindowEvent::KeyboardInput { event, .. } => {
                let code = event.physical_key.to_scancode().unwrap_or(0);
                match event.state {
                    ElementState::Pressed => MessageBody::KeyDown { code, qualifier },
                    ElementState::Released => MessageBody::KeyUp { code, qualifier },
                }
            }
            _ => return None,
        };
        Some(Message::new(surface.window, body))
    }
}

fn clamp(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl ApplicationHandler for State {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.create_pending(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: NativeWindowId, event: WindowEvent) {
        if let Some(message) = self.translate(window_id, event) {
            self.input.push(message);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.create_pending(event_loop);
    }
}

/// A [`Display`] backed by native windows.
pub struct WinitDisplay {
    event_loop: EventLoop<()>,
    state: State,
}

impl WinitDisplay {
    /// Create the event loop. Only one may exist per process.
    pub fn new() -> Result<Self, DisplayError> {
        let event_loop = EventLoop::new().map_err(|e| DisplayError::OpenFailed(e.to_string()))?;
        Ok(Self {
            event_loop,
            state: State::default(),
        })
    }

    fn pump(&mut self, timeout: Option<Duration>) -> Result<(), DisplayError> {
        match self.event_loop.pump_app_events(timeout, &mut self.state) {
            PumpStatus::Continue => Ok(()),
            PumpStatus::Exit(code) => {
                tracing::info!(target: "weft_core::event_loop", code, "native event loop exited");
                Err(DisplayError::Disconnected)
            }
        }
    }
}

impl Display for WinitDisplay {
    /// Queue the native window and pump once so it is created. A window the
    /// platform has not created yet is created on a later pump.
    fn open(&mut self, window: WindowId, title: &str, width: u32, height: u32) -> Result<(), DisplayError> {
        let attributes = NativeWindow::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height));
        self.state.opening.push((window, attributes));
        self.pump(Some(Duration::ZERO))?;

        match self.state.failures.iter().position(|(w, _)| *w == window) {
            Some(index) => Err(DisplayError::OpenFailed(self.state.failures.remove(index).1)),
            None => Ok(()),
        }
    }

    fn close(&mut self, window: WindowId) {
        self.state.opening.retain(|(w, _)| *w != window);
        if let Some(native_id) = self.state.ids.remove(&window) {
            self.state.surfaces.remove(&native_id);
            tracing::debug!(target: "weft::window", ?window, "native window destroyed");
        }
    }

    fn wait(&mut self, timeout: Option<Duration>) -> Result<(), DisplayError> {
        self.pump(timeout)
    }

    fn drain(&mut self, out: &mut Vec<Message>) {
        out.append(&mut self.state.input);
    }
}

impl std::fmt::Debug for WinitDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinitDisplay")
            .field("windows", &self.state.surfaces.len())
            .field("pending_input", &self.state.input.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_button_conversion() {
        assert_eq!(from_winit_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(from_winit_mouse_button(WinitMouseButton::Right), MouseButton::Right);
        assert_eq!(from_winit_mouse_button(WinitMouseButton::Middle), MouseButton::Middle);
        assert_eq!(from_winit_mouse_button(WinitMouseButton::Back), MouseButton::Other(4));
        assert_eq!(from_winit_mouse_button(WinitMouseButton::Other(9)), MouseButton::Other(9));
    }

    #[test]
    fn test_size_clamp() {
        assert_eq!(clamp(640), 640);
        assert_eq!(clamp(u32::MAX), i32::MAX);
    }
}
