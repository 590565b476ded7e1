//! Commonly used types:
//!
//! ```ignore
//! use weft::prelude::*;
//! ```

// ============================================================================
// Core Application
// ============================================================================

pub use crate::{AppStatus, Application, ApplicationBuilder, ApplicationConfig};

// ============================================================================
// Objects and Notifications
// ============================================================================

pub use crate::{
    Action, Callable, Class, NotifyMode, ObjectId, SharedObjectRegistry, Trigger, Value,
};

// ============================================================================
// Messages and Windows
// ============================================================================

pub use crate::window::Window;
pub use crate::{Message, MessageBody, MouseButton, Rect, WindowHandler, WindowId, WindowStatus};

// ============================================================================
// Elements
// ============================================================================

pub use crate::widget::{self, ButtonMode};
