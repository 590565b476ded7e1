//! Message routing and coalescing.
//!
//! Every [`MessageKind`] maps to one [`Route`]:
//!
//! | Route | Kinds | Behavior |
//! |-------|-------|----------|
//! | `Pass` | `Close`, `Focus`, `MouseOver`, `User` | delivered immediately |
//! | `Modal` | `KeyDown`, `KeyUp`, `MouseButton` | delivered only to the top modal window, or to any window when no modal is active |
//! | `Coalesce` | `NewSize`, `Refresh`, `MouseMove`, `Interval` | held in [`PendingMessages`], one per kind, flushed once per loop iteration |

use crate::message::{Message, MessageBody, MessageKind};
use crate::window::WindowId;

/// How a message kind is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Deliver immediately.
    Pass,
    /// Deliver unless another window is modal.
    Modal,
    /// Keep only the latest per window; refresh regions merge.
    Coalesce,
}

fn route_for(kind: MessageKind) -> Route {
    match kind {
        MessageKind::Close | MessageKind::Focus | MessageKind::MouseOver | MessageKind::User => {
            Route::Pass
        }
        MessageKind::KeyDown | MessageKind::KeyUp | MessageKind::MouseButton => Route::Modal,
        MessageKind::NewSize
        | MessageKind::Refresh
        | MessageKind::MouseMove
        | MessageKind::Interval => Route::Coalesce,
    }
}

/// What the router did with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Deliver to the window handler now.
    Deliver(Message),
    /// Blocked by a modal window.
    Dropped,
    /// Stored for the next flush.
    Pending,
}

/// The fixed dispatch table, indexed by [`MessageKind::index`].
#[derive(Debug, Clone)]
pub struct Router {
    table: [Route; MessageKind::ALL.len()],
}

impl Router {
    /// Build the table.
    pub fn new() -> Self {
        let table = std::array::from_fn(|i| {
            let kind = MessageKind::ALL[i];
            debug_assert_eq!(kind.index(), i, "MessageKind::ALL out of declaration order");
            route_for(kind)
        });
        Self { table }
    }

    /// The route for a kind.
    pub fn route(&self, kind: MessageKind) -> Route {
        self.table[kind.index()]
    }

    /// Route one message.
    ///
    /// `modal_top` is the top of the modal stack, if any.
    pub fn dispatch(
        &self,
        message: Message,
        modal_top: Option<WindowId>,
        pending: &mut PendingMessages,
    ) -> Dispatch {
        match self.route(message.kind()) {
            Route::Pass => Dispatch::Deliver(message),
            Route::Modal => match modal_top {
                Some(top) if top != message.window => {
                    tracing::trace!(
                        target: "weft_core::router",
                        window = ?message.window,
                        modal = ?top,
                        kind = ?message.kind(),
                        "input blocked by modal window"
                    );
                    Dispatch::Dropped
                }
                _ => Dispatch::Deliver(message),
            },
            Route::Coalesce => {
                pending.coalesce(message);
                Dispatch::Pending
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Coalesced messages awaiting the next flush, for one window.
#[derive(Debug, Clone, Default)]
pub struct PendingMessages {
    new_size: Option<Message>,
    refresh: Option<Message>,
    mouse_move: Option<Message>,
    interval: Option<Message>,
}

impl PendingMessages {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a coalescable message, merging refresh regions.
    ///
    /// Messages of other kinds are ignored.
    pub fn coalesce(&mut self, message: Message) {
        let slot = match message.kind() {
            MessageKind::NewSize => &mut self.new_size,
            MessageKind::MouseMove => &mut self.mouse_move,
            MessageKind::Interval => &mut self.interval,
            MessageKind::Refresh => &mut self.refresh,
            _ => return,
        };

        let merged = match (slot.take(), message) {
            (
                Some(Message {
                    body: MessageBody::Refresh { rect: old },
                    ..
                }),
                Message {
                    timestamp,
                    window,
                    body: MessageBody::Refresh { rect },
                },
            ) => Message {
                timestamp,
                window,
                body: MessageBody::Refresh {
                    rect: old.union(rect),
                },
            },
            (_, message) => message,
        };
        *slot = Some(merged);
    }

    /// Take the pending resize.
    pub fn take_new_size(&mut self) -> Option<Message> {
        self.new_size.take()
    }

    /// Take the remaining records: refresh, then mouse-move, then interval.
    pub fn drain_rest(&mut self) -> impl Iterator<Item = Message> + use<> {
        [
            self.refresh.take(),
            self.mouse_move.take(),
            self.interval.take(),
        ]
        .into_iter()
        .flatten()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.new_size.is_none()
            && self.refresh.is_none()
            && self.mouse_move.is_none()
            && self.interval.is_none()
    }
}
