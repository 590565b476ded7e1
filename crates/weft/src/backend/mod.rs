//! Display backends beyond the headless [`InputQueue`](weft_core::InputQueue).

mod winit;

pub use self::winit::{WinitDisplay, from_winit_mouse_button};
