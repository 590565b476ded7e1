//! Window interval timers.
//!
//! A window with an active interval timer receives an `Interval` message once
//! per period. Registrations are reference counted per window: each call to
//! [`TimerManager::add_interval`] must be balanced by a call to
//! [`TimerManager::remove_interval`], and the timer stops when the count
//! reaches zero.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::TimerError;
use crate::window::WindowId;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

#[derive(Debug)]
struct TimerData {
    window: WindowId,
    /// When this timer should next fire.
    next_fire: Instant,
    /// Outstanding registrations.
    refs: usize,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Per-window repeating timers sharing one period.
#[derive(Debug)]
pub struct TimerManager {
    timers: SlotMap<TimerId, TimerData>,
    by_window: HashMap<WindowId, TimerId>,
    /// Pending fires. Entries whose fire time no longer matches the timer are stale.
    queue: BinaryHeap<TimerQueueEntry>,
    period: Duration,
}

impl TimerManager {
    /// Create a timer manager firing every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            timers: SlotMap::with_key(),
            by_window: HashMap::new(),
            queue: BinaryHeap::new(),
            period,
        }
    }

    /// The interval period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Register interest in `window`'s interval timer, starting it if needed.
    ///
    /// The first fire occurs one period after the timer starts.
    pub fn add_interval(&mut self, window: WindowId) -> TimerId {
        if let Some(&id) = self.by_window.get(&window) {
            if let Some(timer) = self.timers.get_mut(id) {
                timer.refs += 1;
                return id;
            }
        }

        let next_fire = Instant::now() + self.period;
        let id = self.timers.insert(TimerData {
            window,
            next_fire,
            refs: 1,
        });
        self.by_window.insert(window, id);
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: next_fire,
        });
        tracing::trace!(target: "weft_core::timer", ?window, ?id, "interval timer started");
        id
    }

    /// Drop one registration, stopping the timer when none remain.
    pub fn remove_interval(&mut self, window: WindowId) -> Result<(), TimerError> {
        let id = *self
            .by_window
            .get(&window)
            .ok_or(TimerError::InvalidTimerId)?;
        let timer = self.timers.get_mut(id).ok_or(TimerError::InvalidTimerId)?;
        timer.refs = timer.refs.saturating_sub(1);
        if timer.refs == 0 {
            self.timers.remove(id);
            self.by_window.remove(&window);
            tracing::trace!(target: "weft_core::timer", ?window, ?id, "interval timer stopped");
        }
        Ok(())
    }

    /// Stop a window's timer regardless of outstanding registrations.
    pub fn remove_window(&mut self, window: WindowId) {
        if let Some(id) = self.by_window.remove(&window) {
            self.timers.remove(id);
        }
    }

    /// Outstanding registrations for `window`.
    pub fn interval_refs(&self, window: WindowId) -> usize {
        self.by_window
            .get(&window)
            .and_then(|&id| self.timers.get(id))
            .map_or(0, |t| t.refs)
    }

    /// Time until the next timer fires, or `None` when no timer is active.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        self.discard_stale();
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(Instant::now()))
    }

    fn discard_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            let live = self
                .timers
                .get(entry.id)
                .is_some_and(|t| t.next_fire == entry.fire_time);
            if live {
                break;
            }
            self.queue.pop();
        }
    }

    /// Fire every timer due at `now` and reschedule it.
    ///
    /// Returns the windows whose timer fired, in fire-time order.
    #[tracing::instrument(skip(self), target = "weft_core::timer", level = "trace")]
    pub fn process_expired(&mut self, now: Instant) -> Vec<WindowId> {
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();

            let Some(timer) = self.timers.get_mut(entry.id) else {
                continue;
            };
            if timer.next_fire != entry.fire_time {
                continue;
            }

            tracing::trace!(target: "weft_core::timer", window = ?timer.window, "interval fired");
            fired.push(timer.window);
            timer.next_fire = now + self.period;
            self.queue.push(TimerQueueEntry {
                id: entry.id,
                fire_time: timer.next_fire,
            });
        }

        fired
    }

    /// Number of active timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}
