//! Attribute-change notifications.
//!
//! Every object owns a table mapping an attribute name to triggers, and each
//! trigger to an ordered list of [`Action`]s. [`SharedObjectRegistry::set_value`]
//! assigns the attribute and then fires the [`Trigger::Always`] list followed
//! by the list registered for the new value.
//!
//! Firing never holds a registry borrow, so handlers may read and write any
//! attribute, including the one that triggered them. A list that is already
//! firing does not fire again; the nested change is still stored.
//!
//! # Example
//!
//! ```
//! use weft_core::{Action, Class, NotifyMode, SharedObjectRegistry, Trigger, Value};
//!
//! let registry = SharedObjectRegistry::new();
//! let class = Class::builder("Label").build();
//! let source = registry.create(&class);
//! let label = registry.create(&class);
//!
//! // label.setValue("Text", "Count: <value>") whenever Count changes
//! let action = Action::builder()
//!     .target(label)
//!     .method("setValue")
//!     .arg("Text")
//!     .format("Count: {}")
//!     .build();
//! registry.add_notify(source, "Count", Trigger::Always, action, None).unwrap();
//!
//! registry.set_value(source, "Count", 3, NotifyMode::Default).unwrap();
//! assert_eq!(registry.get_value(label, "Text").unwrap(), Value::from("Count: 3"));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::action::{Action, FireContext, Invocation, MethodRef};
use crate::object::{ObjectError, ObjectId, ObjectResult, SharedObjectRegistry};
use crate::value::Value;

/// Which changes a notification list reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Any change.
    Always,
    /// Changes to exactly this value.
    Value(Value),
}

impl Trigger {
    /// Trigger on a specific value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }
}

/// How [`SharedObjectRegistry::set_value`] treats notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyMode {
    /// Fire when the value changes.
    #[default]
    Default,
    /// Fire even when the value is unchanged.
    Force,
    /// Never fire.
    Suppress,
}

/// Errors raised while wiring notifications.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The action's target is missing, nil, or not an object.
    #[error("Notification on '{attribute}' has no valid destination object")]
    InvalidDestination {
        /// The attribute being subscribed to.
        attribute: String,
    },
    /// The action names a method the target's class does not have.
    #[error("Class '{class}' has no method '{method}'")]
    UnknownMethod {
        /// The target's class.
        class: &'static str,
        /// The missing method.
        method: String,
    },
    /// Insert position outside `1..=len + 1`.
    #[error("Position {position} is out of range for a list of {len} actions")]
    InvalidPosition {
        /// The requested 1-based position.
        position: usize,
        /// The current list length.
        len: usize,
    },
    /// The object does not exist.
    #[error(transparent)]
    Object(#[from] ObjectError),
}

/// One ordered action list with its in-progress flag.
#[derive(Default)]
pub(crate) struct NotifyList {
    actions: RefCell<Vec<Action>>,
    firing: Cell<bool>,
}

impl NotifyList {
    fn snapshot(&self) -> Vec<Action> {
        self.actions.borrow().clone()
    }
}

/// Clears a list's firing flag when dropped, also on unwind.
struct FiringGuard<'a> {
    list: &'a NotifyList,
}

impl<'a> FiringGuard<'a> {
    fn enter(list: &'a NotifyList) -> Option<Self> {
        if list.firing.replace(true) {
            None
        } else {
            Some(Self { list })
        }
    }
}

impl Drop for FiringGuard<'_> {
    fn drop(&mut self) {
        self.list.firing.set(false);
    }
}

/// A notification table: attribute -> trigger -> list.
#[derive(Default)]
pub(crate) struct Notifications {
    table: HashMap<String, HashMap<Trigger, Rc<NotifyList>>>,
}

impl Notifications {
    fn has_attribute(&self, attribute: &str) -> bool {
        self.table.contains_key(attribute)
    }

    fn list(&self, attribute: &str, trigger: &Trigger) -> Option<Rc<NotifyList>> {
        self.table.get(attribute)?.get(trigger).cloned()
    }

    fn list_or_insert(&mut self, attribute: &str, trigger: Trigger) -> Rc<NotifyList> {
        Rc::clone(
            self.table
                .entry(attribute.to_string())
                .or_default()
                .entry(trigger)
                .or_default(),
        )
    }

    /// Append an action to a list, creating it if needed.
    pub(crate) fn push(&mut self, attribute: &str, trigger: Trigger, action: Action) {
        self.list_or_insert(attribute, trigger)
            .actions
            .borrow_mut()
            .push(action);
    }

    /// Append every list of `template` into this table as fresh lists.
    pub(crate) fn extend_from(&mut self, template: &Notifications) {
        for (attribute, triggers) in &template.table {
            for (trigger, list) in triggers {
                let target = self.list_or_insert(attribute, trigger.clone());
                target
                    .actions
                    .borrow_mut()
                    .extend(list.actions.borrow().iter().cloned());
            }
        }
    }

    /// Number of actions in a list.
    pub(crate) fn len(&self, attribute: &str, trigger: &Trigger) -> usize {
        self.list(attribute, trigger)
            .map_or(0, |list| list.actions.borrow().len())
    }
}

/// Lists captured while the registry was borrowed, fired after release.
struct Firing {
    old: Value,
    new: Value,
    always: Option<Rc<NotifyList>>,
    specific: Option<Rc<NotifyList>>,
}

impl SharedObjectRegistry {
    /// Set an attribute and fire its notifications.
    ///
    /// [`Value::Unset`] keeps the current value, which combined with
    /// [`NotifyMode::Force`] re-fires the notifications for it.
    #[tracing::instrument(skip(self, value), target = "weft_core::notify", level = "trace")]
    pub fn set_value(
        &self,
        id: ObjectId,
        attribute: &str,
        value: impl Into<Value>,
        mode: NotifyMode,
    ) -> ObjectResult<()> {
        let value = value.into();
        let firing = self.with_write(|registry| -> ObjectResult<Option<Firing>> {
            let data = registry.data_mut(id)?;
            let old = data.attributes.get(attribute).cloned().unwrap_or(Value::Nil);
            let new = if value.is_unset() { old.clone() } else { value };

            let fire = mode != NotifyMode::Suppress
                && data.notifications.has_attribute(attribute)
                && (mode == NotifyMode::Force || new != old);
            if !fire {
                data.attributes.insert(attribute.to_string(), new);
                return Ok(None);
            }

            data.attributes.insert(attribute.to_string(), new.clone());
            let always = data.notifications.list(attribute, &Trigger::Always);
            let specific = data
                .notifications
                .list(attribute, &Trigger::Value(new.clone()));
            Ok(Some(Firing {
                old,
                new,
                always,
                specific,
            }))
        })?;

        if let Some(firing) = firing {
            let ctx = FireContext {
                owner: id,
                value: &firing.new,
                old: &firing.old,
            };
            for list in [firing.always, firing.specific].into_iter().flatten() {
                self.fire(&list, &ctx, attribute);
            }
        }
        Ok(())
    }

    fn fire(&self, list: &NotifyList, ctx: &FireContext<'_>, attribute: &str) {
        let Some(_guard) = FiringGuard::enter(list) else {
            tracing::trace!(
                target: "weft_core::notify",
                owner = ?ctx.owner,
                attribute,
                "list already firing, nested notification dropped"
            );
            return;
        };

        for action in list.snapshot() {
            match action.resolve(ctx) {
                Some(call) => self.invoke(call, attribute),
                None => tracing::trace!(
                    target: "weft_core::notify",
                    owner = ?ctx.owner,
                    attribute,
                    ?action,
                    "action did not resolve"
                ),
            }
        }
    }

    fn invoke(&self, call: Invocation, attribute: &str) {
        let method = match call.method {
            MethodRef::Callable(callable) => Some(callable),
            MethodRef::Named(name) => self
                .class(call.target)
                .ok()
                .and_then(|class| class.method(&name)),
        };
        let Some(method) = method else {
            tracing::trace!(
                target: "weft_core::notify",
                target_object = ?call.target,
                attribute,
                "notification target or method missing"
            );
            return;
        };

        if let Err(err) = method.call(self, call.target, &call.args) {
            tracing::debug!(
                target: "weft_core::notify",
                target_object = ?call.target,
                attribute,
                error = %err,
                "notification handler failed"
            );
        }
    }

    /// Subscribe `action` to changes of `attribute` on `id`.
    ///
    /// `position` is 1-based; `None` appends.
    pub fn add_notify(
        &self,
        id: ObjectId,
        attribute: &str,
        trigger: Trigger,
        action: Action,
        position: Option<usize>,
    ) -> Result<(), NotifyError> {
        if !self.contains(id) {
            return Err(ObjectError::InvalidObjectId.into());
        }
        action.validate(self, id, attribute)?;

        self.with_write(|registry| {
            let data = registry.data_mut(id)?;
            let list = data.notifications.list_or_insert(attribute, trigger);
            let mut actions = list.actions.borrow_mut();
            match position {
                None => actions.push(action),
                Some(p) if (1..=actions.len() + 1).contains(&p) => actions.insert(p - 1, action),
                Some(p) => {
                    return Err(NotifyError::InvalidPosition {
                        position: p,
                        len: actions.len(),
                    });
                }
            }
            tracing::trace!(
                target: "weft_core::notify",
                ?id,
                attribute,
                len = actions.len(),
                "notification added"
            );
            Ok(())
        })
    }

    /// Remove the first entry identical to `action`.
    ///
    /// Returns whether an entry was removed. Emptied lists are kept.
    pub fn rem_notify(
        &self,
        id: ObjectId,
        attribute: &str,
        trigger: &Trigger,
        action: &Action,
    ) -> ObjectResult<bool> {
        let removed = self.with_read(|registry| -> ObjectResult<bool> {
            let data = registry.data(id)?;
            let Some(list) = data.notifications.list(attribute, trigger) else {
                return Ok(false);
            };
            let mut actions = list.actions.borrow_mut();
            match actions.iter().position(|a| a.ptr_eq(action)) {
                Some(index) => {
                    actions.remove(index);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        if !removed {
            tracing::warn!(
                target: "weft_core::notify",
                ?id,
                attribute,
                ?trigger,
                "rem_notify found no matching action"
            );
        }
        Ok(removed)
    }

    /// Number of actions subscribed to `attribute` under `trigger`.
    pub fn notify_count(&self, id: ObjectId, attribute: &str, trigger: &Trigger) -> ObjectResult<usize> {
        self.with_read(|registry| Ok(registry.data(id)?.notifications.len(attribute, trigger)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Class;
    use std::cell::Cell;

    fn setup() -> (SharedObjectRegistry, ObjectId) {
        let registry = SharedObjectRegistry::new();
        let class = Class::builder("Thing").build();
        let id = registry.create(&class);
        (registry, id)
    }

    fn recorder(log: &Rc<RefCell<Vec<Vec<Value>>>>) -> Action {
        let log = Rc::clone(log);
        Action::builder()
            .this()
            .callable(crate::Callable::new(move |_, _, args| {
                log.borrow_mut().push(args.to_vec());
                Ok(())
            }))
            .old_value()
            .value()
            .build()
    }

    #[test]
    fn test_always_fires_once_with_old_and_new() {
        let (registry, id) = setup();
        registry.set_value(id, "X", 1, NotifyMode::Default).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        registry
            .add_notify(id, "X", Trigger::Always, recorder(&log), None)
            .unwrap();
        registry.set_value(id, "X", 2, NotifyMode::Default).unwrap();

        assert_eq!(*log.borrow(), vec![vec![Value::Int(1), Value::Int(2)]]);
    }

    #[test]
    fn test_unchanged_value_does_not_fire_unless_forced() {
        let (registry, id) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        registry
            .add_notify(id, "X", Trigger::Always, recorder(&log), None)
            .unwrap();

        registry.set_value(id, "X", 5, NotifyMode::Default).unwrap();
        registry.set_value(id, "X", 5, NotifyMode::Default).unwrap();
        assert_eq!(log.borrow().len(), 1);

        registry.set_value(id, "X", Value::Unset, NotifyMode::Force).unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log.borrow()[1], vec![Value::Int(5), Value::Int(5)]);

        registry.set_value(id, "X", 6, NotifyMode::Suppress).unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(registry.get_value(id, "X").unwrap(), Value::Int(6));
    }

    #[test]
    fn test_value_trigger_fires_after_always() {
        let (registry, id) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        let push = |tag: &'static str| {
            let order = Rc::clone(&order);
            Action::builder()
                .this()
                .callable(crate::Callable::new(move |_, _, _| {
                    order.borrow_mut().push(tag);
                    Ok(())
                }))
                .build()
        };

        registry
            .add_notify(id, "On", Trigger::value(true), push("on"), None)
            .unwrap();
        registry
            .add_notify(id, "On", Trigger::Always, push("always"), None)
            .unwrap();

        registry.set_value(id, "On", true, NotifyMode::Default).unwrap();
        registry.set_value(id, "On", false, NotifyMode::Default).unwrap();
        assert_eq!(*order.borrow(), vec!["always", "on", "always"]);
    }

    #[test]
    fn test_reentrant_firing_is_dropped_but_value_stored() {
        let (registry, id) = setup();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let action = Action::builder()
            .this()
            .callable(crate::Callable::new(move |registry, target, _| {
                counter.set(counter.get() + 1);
                registry.set_value(target, "X", 100, NotifyMode::Default)?;
                Ok(())
            }))
            .build();
        registry
            .add_notify(id, "X", Trigger::Always, action, None)
            .unwrap();

        registry.set_value(id, "X", 1, NotifyMode::Default).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(registry.get_value(id, "X").unwrap(), Value::Int(100));

        // The flag was released, so the next change fires again.
        registry.set_value(id, "X", 2, NotifyMode::Default).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_positional_insert_and_range() {
        let (registry, id) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        let push = |tag: i64| {
            let order = Rc::clone(&order);
            Action::builder()
                .this()
                .callable(crate::Callable::new(move |_, _, _| {
                    order.borrow_mut().push(tag);
                    Ok(())
                }))
                .build()
        };

        registry.add_notify(id, "X", Trigger::Always, push(2), None).unwrap();
        registry.add_notify(id, "X", Trigger::Always, push(1), Some(1)).unwrap();
        registry.add_notify(id, "X", Trigger::Always, push(3), Some(3)).unwrap();
        assert_eq!(
            registry.add_notify(id, "X", Trigger::Always, push(9), Some(5)),
            Err(NotifyError::InvalidPosition { position: 5, len: 3 })
        );
        assert_eq!(
            registry.add_notify(id, "X", Trigger::Always, push(9), Some(0)),
            Err(NotifyError::InvalidPosition { position: 0, len: 3 })
        );

        registry.set_value(id, "X", true, NotifyMode::Default).unwrap();
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rem_notify_removes_one_identical_entry() {
        let (registry, id) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let action = recorder(&log);
        registry
            .add_notify(id, "X", Trigger::Always, action.clone(), None)
            .unwrap();
        registry
            .add_notify(id, "X", Trigger::Always, action.clone(), None)
            .unwrap();

        assert!(registry.rem_notify(id, "X", &Trigger::Always, &action).unwrap());
        assert_eq!(registry.notify_count(id, "X", &Trigger::Always).unwrap(), 1);

        let lookalike = recorder(&log);
        assert!(!registry.rem_notify(id, "X", &Trigger::Always, &lookalike).unwrap());
        assert!(registry.rem_notify(id, "X", &Trigger::Always, &action).unwrap());
        assert!(!registry.rem_notify(id, "X", &Trigger::Always, &action).unwrap());
        assert_eq!(registry.notify_count(id, "X", &Trigger::Always).unwrap(), 0);
    }

    #[test]
    fn test_failing_handler_does_not_stop_the_list() {
        let (registry, id) = setup();
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);

        let failing = Action::builder()
            .this()
            .callable(crate::Callable::new(|_, _, _| Err("boom".into())))
            .build();
        let after = Action::builder()
            .this()
            .callable(crate::Callable::new(move |_, _, _| {
                flag.set(true);
                Ok(())
            }))
            .build();
        registry.add_notify(id, "X", Trigger::Always, failing, None).unwrap();
        registry.add_notify(id, "X", Trigger::Always, after, None).unwrap();

        registry.set_value(id, "X", 1, NotifyMode::Default).unwrap();
        assert!(reached.get());
    }

    #[test]
    fn test_destroyed_object() {
        let (registry, id) = setup();
        registry.destroy(id).unwrap();
        assert_eq!(
            registry.set_value(id, "X", 1, NotifyMode::Default),
            Err(ObjectError::InvalidObjectId)
        );
        let action = Action::builder().this().method("setValue").build();
        assert_eq!(
            registry.add_notify(id, "X", Trigger::Always, action, None),
            Err(NotifyError::Object(ObjectError::InvalidObjectId))
        );
    }
}
