//! The Application and its main loop.
//!
//! One loop iteration:
//!
//! 1. Apply window requests (open, modal begin/end) queued since the last iteration.
//! 2. Stop when no window is open or a quit was requested.
//! 3. Deliver each open window's pending resize.
//! 4. Route each open window's posted messages, flush its coalesced
//!    messages, then call its `update`.
//! 5. Resume one task.
//! 6. Close windows that are no longer shown.
//! 7. When every task is idle and nothing is queued, block on the display
//!    until input arrives or the next interval timer is due.
//! 8. Turn expired timers into `Interval` messages and route new input.
//!
//! A window's pending resize is always delivered before any other message
//! for that window, so input never arrives with stale geometry.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft_core::{
//!     Application, ApplicationConfig, AppStatus, Message, WindowHandler, WindowStatus,
//! };
//!
//! struct OneShot;
//!
//! impl WindowHandler for OneShot {
//!     fn handle_message(&mut self, _app: &Application, _message: &Message) {}
//!     fn status(&self) -> WindowStatus {
//!         WindowStatus::Closed
//!     }
//! }
//!
//! let app = Application::new(ApplicationConfig::default());
//! let window = app.add_window(Rc::new(RefCell::new(OneShot)));
//! app.open_window(window).unwrap();
//! assert_eq!(app.run(), AppStatus::Quit);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Instant;

use slotmap::SlotMap;

use crate::config::ApplicationConfig;
use crate::display::{Display, InputQueue, InputSender};
use crate::error::{Result, WeftError, WindowError};
use crate::message::{Message, MessageBody};
use crate::object::SharedObjectRegistry;
use crate::router::{Dispatch, PendingMessages, Router};
use crate::task::{TaskId, TaskResult, TaskScheduler, Yield};
use crate::timer::TimerManager;
use crate::window::{WindowHandler, WindowId, WindowStatus};

/// Lifecycle of the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    /// Constructed, `run` not called yet.
    Init,
    /// Inside `run`.
    Run,
    /// `run` returned normally.
    Quit,
    /// Setup failed or the display went away.
    Error,
}

type SharedHandler = Rc<RefCell<dyn WindowHandler>>;
type SetupHook = Box<dyn FnOnce(&Application) -> Result<()>>;

struct WindowEntry {
    handler: SharedHandler,
    /// Messages posted through [`Application::post_message`].
    queue: VecDeque<Message>,
    pending: PendingMessages,
    open: bool,
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Open(WindowId),
    BeginModal(WindowId),
    EndModal(WindowId),
}

#[derive(Default)]
struct AppState {
    windows: SlotMap<WindowId, WindowEntry>,
    /// Open windows in opening order.
    open: Vec<WindowId>,
    /// Last entry is the active modal window.
    modal: Vec<WindowId>,
    requests: VecDeque<Request>,
}

impl AppState {
    fn modal_top(&self) -> Option<WindowId> {
        self.modal.last().copied()
    }

    /// Requests or messages the next iteration will handle without new input.
    fn has_queued_work(&self) -> bool {
        !self.requests.is_empty()
            || self
                .open
                .iter()
                .filter_map(|&w| self.windows.get(w))
                .any(|entry| !entry.queue.is_empty() || !entry.pending.is_empty())
    }
}

struct AppInner {
    config: ApplicationConfig,
    registry: SharedObjectRegistry,
    scheduler: TaskScheduler,
    router: Router,
    state: RefCell<AppState>,
    timers: RefCell<TimerManager>,
    display: RefCell<Box<dyn Display>>,
    input: Option<InputSender>,
    status: Cell<AppStatus>,
    quit_requested: Cell<bool>,
    idle_waits: Cell<u32>,
    reclaim_hook: RefCell<Option<Box<dyn FnMut()>>>,
    setup_hooks: RefCell<Vec<(String, SetupHook)>>,
}

/// The application: windows, tasks, and the main loop that drives them.
///
/// `Application` is a cheap, cloneable handle. It is single threaded; other
/// threads reach it only through an [`InputSender`].
#[derive(Clone)]
pub struct Application {
    inner: Rc<AppInner>,
}

static_assertions::assert_not_impl_any!(Application: Send, Sync);

impl Application {
    /// Create an application with the headless [`InputQueue`] display.
    pub fn new(config: ApplicationConfig) -> Self {
        let queue = InputQueue::new();
        let sender = queue.sender();
        Self::build(config, Box::new(queue), Some(sender))
    }

    /// Create an application with a custom display backend.
    pub fn with_display(config: ApplicationConfig, display: Box<dyn Display>) -> Self {
        Self::build(config, display, None)
    }

    fn build(config: ApplicationConfig, display: Box<dyn Display>, input: Option<InputSender>) -> Self {
        tracing::debug!(target: "weft_core::event_loop", name = %config.name, "application created");
        let timers = TimerManager::new(config.interval);
        Self {
            inner: Rc::new(AppInner {
                config,
                registry: SharedObjectRegistry::new(),
                scheduler: TaskScheduler::new(),
                router: Router::new(),
                state: RefCell::new(AppState::default()),
                timers: RefCell::new(timers),
                display: RefCell::new(display),
                input,
                status: Cell::new(AppStatus::Init),
                quit_requested: Cell::new(false),
                idle_waits: Cell::new(0),
                reclaim_hook: RefCell::new(None),
                setup_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ApplicationConfig {
        &self.inner.config
    }

    /// The object registry shared by all windows and elements.
    pub fn registry(&self) -> &SharedObjectRegistry {
        &self.inner.registry
    }

    /// The task scheduler.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.inner.scheduler
    }

    /// Current loop status.
    pub fn status(&self) -> AppStatus {
        self.inner.status.get()
    }

    /// A thread-safe input handle, when using the headless display.
    pub fn input_sender(&self) -> Option<InputSender> {
        self.inner.input.clone()
    }

    // -------------------------------------------------------------------------
    // Windows
    // -------------------------------------------------------------------------

    /// Register a window. It is not opened until [`open_window`](Self::open_window).
    pub fn add_window<H>(&self, handler: Rc<RefCell<H>>) -> WindowId
    where
        H: WindowHandler + 'static,
    {
        let handler: SharedHandler = handler;
        self.inner.state.borrow_mut().windows.insert(WindowEntry {
            handler,
            queue: VecDeque::new(),
            pending: PendingMessages::new(),
            open: false,
        })
    }

    /// Open a registered window at the start of the next loop iteration.
    pub fn open_window(&self, window: WindowId) -> Result<()> {
        self.request(window, Request::Open(window))
    }

    /// Make `window` the active modal window.
    ///
    /// While a modal window is active, keyboard and pointer button input for
    /// every other window is dropped.
    pub fn begin_modal(&self, window: WindowId) -> Result<()> {
        self.request(window, Request::BeginModal(window))
    }

    /// Remove `window` from the modal stack.
    pub fn end_modal(&self, window: WindowId) -> Result<()> {
        self.request(window, Request::EndModal(window))
    }

    fn request(&self, window: WindowId, request: Request) -> Result<()> {
        let mut state = self.inner.state.borrow_mut();
        if !state.windows.contains_key(window) {
            return Err(WindowError::InvalidWindowId.into());
        }
        state.requests.push_back(request);
        Ok(())
    }

    /// Whether `window` is open.
    pub fn is_open(&self, window: WindowId) -> bool {
        self.inner
            .state
            .borrow()
            .windows
            .get(window)
            .is_some_and(|w| w.open)
    }

    /// Whether `window` is registered (open or not).
    pub fn contains_window(&self, window: WindowId) -> bool {
        self.inner.state.borrow().windows.contains_key(window)
    }

    /// Open windows in opening order.
    pub fn open_windows(&self) -> Vec<WindowId> {
        self.inner.state.borrow().open.clone()
    }

    /// The active modal window.
    pub fn modal_top(&self) -> Option<WindowId> {
        self.inner.state.borrow().modal_top()
    }

    /// Queue a message for its window; it is routed in the next iteration.
    pub fn post_message(&self, message: Message) -> Result<()> {
        let mut state = self.inner.state.borrow_mut();
        let entry = state
            .windows
            .get_mut(message.window)
            .ok_or(WindowError::InvalidWindowId)?;
        entry.queue.push_back(message);
        Ok(())
    }

    /// Stop the loop at the start of the next iteration.
    pub fn quit(&self) {
        tracing::info!(target: "weft_core::event_loop", "quit requested");
        self.inner.quit_requested.set(true);
    }

    // -------------------------------------------------------------------------
    // Hooks
    // -------------------------------------------------------------------------

    /// Run `hook` every `reclaim_interval` idle waits.
    pub fn set_reclaim_hook(&self, hook: impl FnMut() + 'static) {
        *self.inner.reclaim_hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Run `hook` when [`run`](Self::run) starts, before window setup.
    ///
    /// A failing hook aborts startup with [`AppStatus::Error`].
    pub fn add_setup_hook<F>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce(&Application) -> Result<()> + 'static,
    {
        self.inner
            .setup_hooks
            .borrow_mut()
            .push((name.into(), Box::new(hook)));
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    /// Schedule a task. Its body first runs on the next scheduler step, never
    /// during this call.
    pub fn add_task<F>(&self, task: F) -> TaskId
    where
        F: Future<Output = TaskResult> + 'static,
    {
        self.inner.scheduler.add(task)
    }

    /// Yield with an explicit busy flag.
    pub fn yield_now(&self, busy: bool) -> Yield {
        self.inner.scheduler.yield_now(busy)
    }

    /// Suspend the current task.
    ///
    /// Without a window the task yields busy and resumes on the next step.
    /// With a window the task yields idle and holds an interval timer on that
    /// window until it resumes, so the loop keeps waking at the timer rate.
    pub fn suspend(&self, window: Option<WindowId>) -> Yield {
        let Some(window) = window else {
            return self.yield_now(true);
        };

        let on_suspend = {
            let app = Rc::downgrade(&self.inner);
            move || {
                if let Some(app) = Weak::upgrade(&app) {
                    if app.state.borrow().windows.contains_key(window) {
                        app.timers.borrow_mut().add_interval(window);
                    }
                }
            }
        };
        let on_resume = {
            let app = Rc::downgrade(&self.inner);
            move || {
                if let Some(app) = Weak::upgrade(&app) {
                    if app.state.borrow().windows.contains_key(window) {
                        // Already gone if the window closed meanwhile.
                        let _ = app.timers.borrow_mut().remove_interval(window);
                    }
                }
            }
        };
        self.inner.scheduler.yield_with(false, on_suspend, on_resume)
    }

    // -------------------------------------------------------------------------
    // Main loop
    // -------------------------------------------------------------------------

    /// Run the main loop until no window is open or [`quit`](Self::quit) is called.
    ///
    /// Setup hooks and the setup of every window opened before `run` execute
    /// first; if any fails the loop is not entered and the status is
    /// [`AppStatus::Error`].
    #[tracing::instrument(skip(self), target = "weft_core::event_loop", level = "debug")]
    pub fn run(&self) -> AppStatus {
        if let Err(err) = self.start() {
            tracing::error!(target: "weft_core::event_loop", error = %err, "startup failed");
            if !matches!(err, WeftError::AlreadyStarted) {
                self.inner.status.set(AppStatus::Error);
            }
            return self.status();
        }

        tracing::info!(target: "weft_core::event_loop", "starting main loop");
        while self.iterate() {}
        tracing::info!(target: "weft_core::event_loop", status = ?self.status(), "main loop finished");
        self.status()
    }

    fn start(&self) -> Result<()> {
        if self.status() != AppStatus::Init {
            return Err(WeftError::AlreadyStarted);
        }
        self.inner.status.set(AppStatus::Run);

        let hooks = std::mem::take(&mut *self.inner.setup_hooks.borrow_mut());
        for (name, hook) in hooks {
            hook(self).map_err(|err| WeftError::setup(name, err.to_string()))?;
        }
        self.apply_requests(true)
    }

    /// One loop iteration. Returns `false` when the loop should stop.
    fn iterate(&self) -> bool {
        if let Err(err) = self.apply_requests(false) {
            tracing::error!(target: "weft_core::event_loop", error = %err, "window request failed");
        }

        let open = self.open_windows();
        if self.inner.quit_requested.get() || open.is_empty() {
            self.inner.status.set(AppStatus::Quit);
            return false;
        }

        for &window in &open {
            self.deliver_resize(window);
        }

        for &window in &open {
            self.drain_queue(window);
            let rest: Vec<Message> = self
                .with_entry(window, |entry| entry.pending.drain_rest().collect())
                .unwrap_or_default();
            for message in &rest {
                self.deliver(window, message);
            }
            self.update(window);
        }

        let idle = self.inner.scheduler.service();

        self.purge_closed();

        let blocked = idle
            && !self.inner.quit_requested.get()
            && !self.open_windows().is_empty()
            && !self.inner.state.borrow().has_queued_work();
        if blocked {
            self.reclaim();
            let timeout = self.inner.timers.borrow_mut().time_until_next();
            tracing::trace!(target: "weft_core::event_loop", ?timeout, "waiting for input");
            if let Err(err) = self.inner.display.borrow_mut().wait(timeout) {
                tracing::error!(target: "weft_core::event_loop", error = %err, "display failed");
                self.inner.status.set(AppStatus::Error);
                return false;
            }
        }

        self.route_input();
        true
    }

    fn with_entry<R>(&self, window: WindowId, f: impl FnOnce(&mut WindowEntry) -> R) -> Option<R> {
        self.inner.state.borrow_mut().windows.get_mut(window).map(f)
    }

    fn handler(&self, window: WindowId) -> Option<SharedHandler> {
        self.inner
            .state
            .borrow()
            .windows
            .get(window)
            .map(|entry| Rc::clone(&entry.handler))
    }

    fn deliver(&self, window: WindowId, message: &Message) {
        let Some(handler) = self.handler(window) else {
            return;
        };
        match handler.try_borrow_mut() {
            Ok(mut handler) => handler.handle_message(self, message),
            Err(_) => tracing::warn!(
                target: "weft_core::event_loop",
                ?window,
                kind = ?message.kind(),
                "window handler busy, message dropped"
            ),
        }
    }

    /// Deliver the pending resize, if any, then `update`.
    fn deliver_resize(&self, window: WindowId) {
        let resize = self
            .with_entry(window, |entry| entry.pending.take_new_size())
            .flatten();
        if let Some(message) = resize {
            self.deliver(window, &message);
            self.update(window);
        }
    }

    /// Deliver a routed message after any resize still pending for its window.
    fn deliver_routed(&self, window: WindowId, message: &Message) {
        self.deliver_resize(window);
        self.deliver(window, message);
    }

    fn update(&self, window: WindowId) {
        if let Some(handler) = self.handler(window) {
            if let Ok(mut handler) = handler.try_borrow_mut() {
                handler.update(self);
            }
        }
    }

    /// Route posted messages, including ones posted while draining.
    fn drain_queue(&self, window: WindowId) {
        loop {
            let dispatch = {
                let mut state = self.inner.state.borrow_mut();
                let modal_top = state.modal_top();
                let Some(entry) = state.windows.get_mut(window) else {
                    return;
                };
                let Some(message) = entry.queue.pop_front() else {
                    return;
                };
                self.inner
                    .router
                    .dispatch(message, modal_top, &mut entry.pending)
            };
            if let Dispatch::Deliver(message) = dispatch {
                self.deliver_routed(window, &message);
            }
        }
    }

    /// Expired timers and display input.
    fn route_input(&self) {
        let fired = self
            .inner
            .timers
            .borrow_mut()
            .process_expired(Instant::now());
        let mut input: Vec<Message> = fired
            .into_iter()
            .map(|window| Message::new(window, MessageBody::Interval))
            .collect();
        self.inner.display.borrow_mut().drain(&mut input);

        for message in input {
            let window = message.window;
            let dispatch = {
                let mut state = self.inner.state.borrow_mut();
                let modal_top = state.modal_top();
                match state.windows.get_mut(window) {
                    Some(entry) if entry.open => {
                        self.inner
                            .router
                            .dispatch(message, modal_top, &mut entry.pending)
                    }
                    _ => {
                        tracing::trace!(target: "weft_core::event_loop", ?window, "input for unknown window");
                        continue;
                    }
                }
            };
            if let Dispatch::Deliver(message) = dispatch {
                self.deliver_routed(window, &message);
            }
        }
    }

    fn apply_requests(&self, fatal: bool) -> Result<()> {
        loop {
            let Some(request) = self.inner.state.borrow_mut().requests.pop_front() else {
                return Ok(());
            };
            match request {
                Request::Open(window) => {
                    if let Err(err) = self.open_now(window) {
                        if fatal {
                            return Err(err);
                        }
                        tracing::error!(target: "weft_core::event_loop", ?window, error = %err, "failed to open window");
                    }
                }
                Request::BeginModal(window) => {
                    let mut state = self.inner.state.borrow_mut();
                    if state.windows.get(window).is_some_and(|w| w.open) {
                        state.modal.retain(|&w| w != window);
                        state.modal.push(window);
                        tracing::debug!(target: "weft_core::event_loop", ?window, "modal begin");
                    }
                }
                Request::EndModal(window) => {
                    let mut state = self.inner.state.borrow_mut();
                    state.modal.retain(|&w| w != window);
                    tracing::debug!(target: "weft_core::event_loop", ?window, "modal end");
                }
            }
        }
    }

    fn open_now(&self, window: WindowId) -> Result<()> {
        if self.is_open(window) {
            return Ok(());
        }
        let handler = self.handler(window).ok_or(WindowError::InvalidWindowId)?;
        let (title, (width, height)) = {
            let mut handler = handler
                .try_borrow_mut()
                .map_err(|_| WeftError::setup(format!("{window:?}"), "handler is borrowed"))?;
            handler
                .setup(self, window)
                .map_err(|err| WeftError::setup(handler.title().to_string(), err.to_string()))?;
            (handler.title().to_string(), handler.size())
        };

        self.inner
            .display
            .borrow_mut()
            .open(window, &title, width, height)?;

        let mut state = self.inner.state.borrow_mut();
        if let Some(entry) = state.windows.get_mut(window) {
            entry.open = true;
        }
        state.open.push(window);
        tracing::debug!(target: "weft_core::event_loop", ?window, %title, "window opened");
        Ok(())
    }

    fn purge_closed(&self) {
        let open = self.open_windows();
        for window in open {
            let status = self.window_status(window);
            if matches!(status, Some(WindowStatus::Shown)) {
                continue;
            }

            {
                let mut state = self.inner.state.borrow_mut();
                state.open.retain(|&w| w != window);
                state.modal.retain(|&w| w != window);
                state.windows.remove(window);
            }
            self.inner.timers.borrow_mut().remove_window(window);
            self.inner.display.borrow_mut().close(window);
            tracing::debug!(target: "weft_core::event_loop", ?window, ?status, "window closed");
        }
    }

    fn window_status(&self, window: WindowId) -> Option<WindowStatus> {
        let handler = self.handler(window)?;
        let status = handler.try_borrow().ok().map(|h| h.status());
        status
    }

    fn reclaim(&self) {
        let Some(every) = self.inner.config.reclaim_interval.filter(|&n| n > 0) else {
            return;
        };
        let waits = self.inner.idle_waits.get() + 1;
        if waits < every {
            self.inner.idle_waits.set(waits);
            return;
        }
        self.inner.idle_waits.set(0);
        if let Some(hook) = self.inner.reclaim_hook.borrow_mut().as_mut() {
            tracing::trace!(target: "weft_core::event_loop", "running reclaim hook");
            hook();
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.inner.config.name)
            .field("status", &self.status())
            .field("open_windows", &self.open_windows().len())
            .field("tasks", &self.inner.scheduler.len())
            .finish()
    }
}
