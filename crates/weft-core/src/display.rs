//! Display backends.
//!
//! The main loop talks to the platform through the [`Display`] trait: it
//! opens and closes a surface per window, blocks for input when idle, and
//! drains whatever input has arrived.
//!
//! [`InputQueue`] is the headless backend. Input is injected through
//! [`InputSender`] handles, which may live on any thread.

use std::collections::HashSet;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::DisplayError;
use crate::message::{Message, MessageBody};
use crate::window::WindowId;

/// The platform side of the main loop.
pub trait Display {
    /// Create the surface for a window.
    fn open(&mut self, window: WindowId, title: &str, width: u32, height: u32) -> Result<(), DisplayError>;

    /// Destroy a window's surface. Unknown windows are ignored.
    fn close(&mut self, window: WindowId);

    /// Block until input is available or `timeout` elapses.
    ///
    /// `None` waits indefinitely.
    fn wait(&mut self, timeout: Option<Duration>) -> Result<(), DisplayError>;

    /// Move all available input into `out` without blocking.
    fn drain(&mut self, out: &mut Vec<Message>);
}

/// A cloneable, thread-safe handle that injects input into an [`InputQueue`].
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: Sender<Message>,
}

static_assertions::assert_impl_all!(InputSender: Send, Sync, Clone);

impl InputSender {
    /// Send a message. Returns `false` once the queue has been dropped.
    pub fn send(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Send a message body stamped with the current time.
    pub fn post(&self, window: WindowId, body: MessageBody) -> bool {
        self.send(Message::new(window, body))
    }
}

/// Headless channel-backed display.
#[derive(Debug)]
pub struct InputQueue {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    /// Received by `wait` but not yet drained.
    buffered: Vec<Message>,
    open: HashSet<WindowId>,
}

impl InputQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            buffered: Vec::new(),
            open: HashSet::new(),
        }
    }

    /// A new sender handle.
    pub fn sender(&self) -> InputSender {
        InputSender {
            tx: self.tx.clone(),
        }
    }

    /// Whether a surface is open for `window`.
    pub fn is_open(&self, window: WindowId) -> bool {
        self.open.contains(&window)
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for InputQueue {
    fn open(&mut self, window: WindowId, title: &str, width: u32, height: u32) -> Result<(), DisplayError> {
        tracing::debug!(target: "weft_core::event_loop", ?window, title, width, height, "headless surface opened");
        self.open.insert(window);
        Ok(())
    }

    fn close(&mut self, window: WindowId) {
        if self.open.remove(&window) {
            tracing::debug!(target: "weft_core::event_loop", ?window, "headless surface closed");
        }
    }

    fn wait(&mut self, timeout: Option<Duration>) -> Result<(), DisplayError> {
        if !self.buffered.is_empty() || !self.rx.is_empty() {
            return Ok(());
        }
        let received = match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return Err(DisplayError::Disconnected),
            },
            None => Some(self.rx.recv().map_err(|_| DisplayError::Disconnected)?),
        };
        self.buffered.extend(received);
        Ok(())
    }

    fn drain(&mut self, out: &mut Vec<Message>) {
        out.append(&mut self.buffered);
        out.extend(self.rx.try_iter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::time::Instant;

    fn window() -> WindowId {
        let mut map: SlotMap<WindowId, ()> = SlotMap::with_key();
        map.insert(())
    }

    #[test]
    fn test_wait_times_out() {
        let mut queue = InputQueue::new();
        let start = Instant::now();
        queue.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));

        let mut out = Vec::new();
        queue.drain(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sender_from_other_thread_wakes_wait() {
        let w = window();
        let mut queue = InputQueue::new();
        let sender = queue.sender();
        let handle = std::thread::spawn(move || sender.post(w, MessageBody::Close));

        queue.wait(Some(Duration::from_secs(5))).unwrap();
        assert!(handle.join().unwrap());

        let mut out = Vec::new();
        queue.drain(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].body, MessageBody::Close);
    }

    #[test]
    fn test_drain_preserves_order() {
        let w = window();
        let mut queue = InputQueue::new();
        let sender = queue.sender();
        sender.post(w, MessageBody::Focus { focused: true });
        sender.post(w, MessageBody::Close);

        queue.wait(None).unwrap();
        let mut out = Vec::new();
        queue.drain(&mut out);
        let bodies: Vec<_> = out.into_iter().map(|m| m.body).collect();
        assert_eq!(
            bodies,
            vec![MessageBody::Focus { focused: true }, MessageBody::Close]
        );
    }

    #[test]
    fn test_open_close_tracking() {
        let w = window();
        let mut queue = InputQueue::new();
        queue.open(w, "main", 320, 200).unwrap();
        assert!(queue.is_open(w));
        queue.close(w);
        assert!(!queue.is_open(w));
    }
}
