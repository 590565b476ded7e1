//! Cooperative task scheduler.
//!
//! Tasks are futures driven by the main loop, one poll per loop iteration.
//! A task suspends by awaiting a [`Yield`], which records whether the task
//! still has pending work ("busy") or is waiting on something external
//! ("idle"). The main loop only blocks for input when every queued task is
//! idle.
//!
//! Tasks are polled with a no-op waker: they are resumed by the round-robin
//! schedule, never by wake-ups.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};

/// A unique identifier for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, never polled.
    Ready,
    /// Being polled.
    Running,
    /// Yielded; requeued at the tail.
    Suspended,
    /// Finished successfully.
    Done,
    /// Returned an error or panicked.
    Failed,
}

/// Failure reported by a task body.
///
/// Any [`std::error::Error`] converts into a `TaskError`, so `?` works inside
/// task bodies. A backtrace is captured at conversion time, subject to
/// `RUST_BACKTRACE`.
pub struct TaskError {
    message: String,
    backtrace: Backtrace,
}

impl TaskError {
    /// Create an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backtrace captured when the error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl<E: std::error::Error> From<E> for TaskError {
    fn from(err: E) -> Self {
        Self::msg(err.to_string())
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskError")
            .field("message", &self.message)
            .field("backtrace", &format_args!("{}", self.backtrace))
            .finish()
    }
}

/// Result of a task body.
pub type TaskResult = std::result::Result<(), TaskError>;

type BoxedTask = Pin<Box<dyn Future<Output = TaskResult>>>;

type Hook = Box<dyn FnOnce()>;

struct TaskData {
    id: TaskId,
    future: BoxedTask,
    /// Last yielded busy flag. Fresh tasks count as busy.
    busy: bool,
    state: TaskState,
}

struct SchedulerInner {
    queue: RefCell<VecDeque<TaskData>>,
    /// Written by the [`Yield`] a task is suspending on, read after the poll.
    yield_slot: Rc<Cell<bool>>,
}

/// The FIFO of cooperative tasks.
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Rc<SchedulerInner>,
}

static_assertions::assert_not_impl_any!(TaskScheduler: Send, Sync);

impl TaskScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RefCell::new(VecDeque::new()),
                yield_slot: Rc::new(Cell::new(true)),
            }),
        }
    }

    /// Enqueue a task. It is first polled on the next service step.
    pub fn add<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = TaskResult> + 'static,
    {
        let id = next_task_id();
        self.inner.queue.borrow_mut().push_back(TaskData {
            id,
            future: Box::pin(future),
            busy: true,
            state: TaskState::Ready,
        });
        tracing::trace!(target: "weft_core::task", task = id.as_u64(), "task added");
        id
    }

    /// A suspension point reporting `busy`.
    ///
    /// Awaiting it suspends the task until the next service step that
    /// reaches it.
    pub fn yield_now(&self, busy: bool) -> Yield {
        Yield::new(Rc::clone(&self.inner.yield_slot), busy, None, None)
    }

    /// A suspension point with hooks run on suspension and on resumption.
    pub(crate) fn yield_with(
        &self,
        busy: bool,
        on_suspend: impl FnOnce() + 'static,
        on_resume: impl FnOnce() + 'static,
    ) -> Yield {
        Yield::new(
            Rc::clone(&self.inner.yield_slot),
            busy,
            Some(Box::new(on_suspend)),
            Some(Box::new(on_resume)),
        )
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Whether no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// State of a queued task, or `None` once it has left the queue.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.inner
            .queue
            .borrow()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.state)
    }

    /// Whether every queued task last reported idle.
    ///
    /// A task that has not been polled yet counts as busy.
    pub fn is_idle(&self) -> bool {
        !self.inner.queue.borrow().iter().any(|t| t.busy)
    }

    /// Resume the head task once.
    ///
    /// Suspended tasks go back to the tail. Returns whether the scheduler is
    /// idle afterwards.
    pub fn service(&self) -> bool {
        let Some(mut task) = self.inner.queue.borrow_mut().pop_front() else {
            return true;
        };

        task.state = TaskState::Running;
        self.inner.yield_slot.set(true);
        let mut cx = Context::from_waker(Waker::noop());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.future.as_mut().poll(&mut cx)));

        let id = task.id.as_u64();
        match outcome {
            Ok(Poll::Pending) => {
                task.busy = self.inner.yield_slot.get();
                task.state = TaskState::Suspended;
                self.inner.queue.borrow_mut().push_back(task);
            }
            Ok(Poll::Ready(Ok(()))) => {
                task.state = TaskState::Done;
                tracing::trace!(target: "weft_core::task", task = id, "task finished");
            }
            Ok(Poll::Ready(Err(err))) => {
                task.state = TaskState::Failed;
                tracing::error!(
                    target: "weft_core::task",
                    task = id,
                    error = %err.message,
                    backtrace = %err.backtrace,
                    "task failed"
                );
            }
            Err(payload) => {
                task.state = TaskState::Failed;
                tracing::error!(
                    target: "weft_core::task",
                    task = id,
                    panic = panic_message(payload.as_ref()),
                    "task panicked"
                );
            }
        }

        self.is_idle()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("len", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

/// Future returned by [`TaskScheduler::yield_now`] and
/// [`Application::suspend`](crate::Application::suspend).
///
/// Pending on the first poll, ready on the second.
#[must_use = "a yield does nothing unless awaited"]
pub struct Yield {
    slot: Rc<Cell<bool>>,
    busy: bool,
    suspended: bool,
    on_suspend: Option<Hook>,
    on_resume: Option<Hook>,
}

impl Yield {
    fn new(slot: Rc<Cell<bool>>, busy: bool, on_suspend: Option<Hook>, on_resume: Option<Hook>) -> Self {
        Self {
            slot,
            busy,
            suspended: false,
            on_suspend,
            on_resume,
        }
    }
}

impl Future for Yield {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.suspended {
            if let Some(hook) = this.on_resume.take() {
                hook();
            }
            Poll::Ready(())
        } else {
            this.suspended = true;
            if let Some(hook) = this.on_suspend.take() {
                hook();
            }
            this.slot.set(this.busy);
            Poll::Pending
        }
    }
}
