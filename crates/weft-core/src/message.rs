//! Window messages.
//!
//! Messages are produced by the display backend, by window timers, and by
//! [`Application::post_message`](crate::Application::post_message). Each one
//! targets a single window. Messages are `Send` so other threads can inject
//! them through an [`InputSender`](crate::InputSender).

use std::time::Instant;

use crate::window::WindowId;

/// An axis-aligned rectangle with inclusive-exclusive corners `(x0, y0)` and `(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    /// Left edge.
    pub x0: i32,
    /// Top edge.
    pub y0: i32,
    /// Right edge.
    pub x1: i32,
    /// Bottom edge.
    pub y1: i32,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Create a rectangle from an origin and a size.
    pub const fn from_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// The smallest rectangle containing both.
    pub fn union(self, other: Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether the point lies inside.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Width.
    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    /// Height.
    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }
}

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
    /// Any other button.
    Other(u16),
}

/// The kind of a message, used as the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Close request from the user.
    Close,
    /// Keyboard focus change.
    Focus,
    /// Window resized.
    NewSize,
    /// Region needs repainting.
    Refresh,
    /// Pointer entered or left the window.
    MouseOver,
    /// Key pressed.
    KeyDown,
    /// Key released.
    KeyUp,
    /// Pointer moved.
    MouseMove,
    /// Pointer button pressed or released.
    MouseButton,
    /// Window interval timer tick.
    Interval,
    /// Application-defined.
    User,
}

impl MessageKind {
    /// Position in [`MessageKind::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Every kind, in declaration order.
    pub const ALL: [MessageKind; 11] = [
        Self::Close,
        Self::Focus,
        Self::NewSize,
        Self::Refresh,
        Self::MouseOver,
        Self::KeyDown,
        Self::KeyUp,
        Self::MouseMove,
        Self::MouseButton,
        Self::Interval,
        Self::User,
    ];
}

/// Kind-specific message fields.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Close request.
    Close,
    /// Focus gained or lost.
    Focus {
        /// Whether the window now has focus.
        focused: bool,
    },
    /// New client size.
    NewSize {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Damaged region.
    Refresh {
        /// The region to repaint.
        rect: Rect,
    },
    /// Pointer crossing.
    MouseOver {
        /// Whether the pointer is now inside the window.
        inside: bool,
    },
    /// Key press.
    KeyDown {
        /// Backend key code.
        code: u32,
        /// Modifier bit set.
        qualifier: u32,
    },
    /// Key release.
    KeyUp {
        /// Backend key code.
        code: u32,
        /// Modifier bit set.
        qualifier: u32,
    },
    /// Pointer position in window coordinates.
    MouseMove {
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
    },
    /// Button press or release.
    MouseButton {
        /// Which button.
        button: MouseButton,
        /// Pressed (`true`) or released.
        pressed: bool,
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
    },
    /// Timer tick.
    Interval,
    /// Application-defined payload.
    User {
        /// Application-defined tag.
        kind: u32,
        /// Application-defined data.
        data: u64,
    },
}

impl MessageBody {
    /// The routing kind.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Close => MessageKind::Close,
            Self::Focus { .. } => MessageKind::Focus,
            Self::NewSize { .. } => MessageKind::NewSize,
            Self::Refresh { .. } => MessageKind::Refresh,
            Self::MouseOver { .. } => MessageKind::MouseOver,
            Self::KeyDown { .. } => MessageKind::KeyDown,
            Self::KeyUp { .. } => MessageKind::KeyUp,
            Self::MouseMove { .. } => MessageKind::MouseMove,
            Self::MouseButton { .. } => MessageKind::MouseButton,
            Self::Interval => MessageKind::Interval,
            Self::User { .. } => MessageKind::User,
        }
    }
}

/// A timestamped message for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// When the message was produced.
    pub timestamp: Instant,
    /// The window it targets.
    pub window: WindowId,
    /// Kind-specific fields.
    pub body: MessageBody,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(window: WindowId, body: MessageBody) -> Self {
        Self {
            timestamp: Instant::now(),
            window,
            body,
        }
    }

    /// The routing kind.
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}

static_assertions::assert_impl_all!(Message: Send);
