//! Core systems for weft.
//!
//! This crate provides the foundation of the weft GUI toolkit:
//!
//! - **Values and objects**: dynamically typed attributes on registry-owned
//!   objects, with classes providing methods and defaults
//! - **Notifications**: `set_value` / `add_notify` / `rem_notify`, with
//!   action templates resolved when an attribute changes
//! - **Tasks**: a cooperative, single-threaded scheduler of futures
//! - **Routing**: per-kind dispatch with modal gating and coalescing of
//!   high-frequency messages
//! - **Application**: the main loop tying windows, tasks, timers and the
//!   display together
//!
//! # Notification Example
//!
//! ```
//! use weft_core::{Action, Class, NotifyMode, SharedObjectRegistry, Trigger, Value};
//!
//! let registry = SharedObjectRegistry::new();
//! let switch = Class::builder("Switch").default("On", false).build();
//! let lamp = Class::builder("Lamp").default("Lit", false).build();
//! let switch = registry.create(&switch);
//! let lamp = registry.create(&lamp);
//!
//! // lamp.setValue("Lit", <value>) whenever On changes
//! let action = Action::builder()
//!     .target(lamp)
//!     .method("setValue")
//!     .arg("Lit")
//!     .value()
//!     .build();
//! registry.add_notify(switch, "On", Trigger::Always, action, None).unwrap();
//!
//! registry.set_value(switch, "On", true, NotifyMode::Default).unwrap();
//! assert_eq!(registry.get_value(lamp, "Lit").unwrap(), Value::Bool(true));
//! ```
//!
//! # Task Example
//!
//! ```
//! use weft_core::{Application, ApplicationConfig};
//!
//! let app = Application::new(ApplicationConfig::default());
//! let handle = app.clone();
//! app.add_task(async move {
//!     // Runs on a later loop iteration, one step at a time.
//!     handle.yield_now(true).await;
//!     Ok(())
//! });
//! assert_eq!(app.scheduler().len(), 1);
//! ```

mod action;
mod application;
mod config;
mod display;
mod error;
pub mod logging;
mod message;
mod notify;
pub mod object;
mod router;
mod task;
mod timer;
mod value;
mod window;

pub use action::{Action, ActionBuilder, ActionItem, Placeholder};
pub use application::{AppStatus, Application};
pub use config::{
    ApplicationBuilder, ApplicationConfig, DEFAULT_INTERVAL, DEFAULT_RECLAIM_INTERVAL,
    DoubleClickConfig,
};
pub use display::{Display, InputQueue, InputSender};
pub use error::{DisplayError, Result, TimerError, WeftError, WindowError};
pub use logging::{ObjectTreeDebug, TreeFormatOptions, TreeStyle};
pub use message::{Message, MessageBody, MessageKind, MouseButton, Rect};
pub use notify::{NotifyError, NotifyMode, Trigger};
pub use object::{Class, ClassBuilder, ObjectError, ObjectId, ObjectRegistry, ObjectResult, SharedObjectRegistry};
pub use router::{Dispatch, PendingMessages, Route, Router};
pub use task::{TaskError, TaskId, TaskResult, TaskScheduler, TaskState, Yield};
pub use timer::{TimerId, TimerManager};
pub use value::{Callable, MethodError, MethodResult, Value};
pub use window::{WindowHandler, WindowId, WindowStatus};
