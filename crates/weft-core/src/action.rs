//! Action templates and their interpreter.
//!
//! An [`Action`] is an ordered list of literal values and [`Placeholder`]s.
//! When a notification fires, the template is resolved against the firing
//! context: the first resolved element is the target object, the second is
//! the method (a name looked up on the target's class, or a callable), and
//! the rest are positional arguments.
//!
//! ```
//! use weft_core::{Action, Placeholder};
//!
//! // target.setValue("Text", "Count: <value>")
//! let action = Action::builder()
//!     .this()
//!     .method("setValue")
//!     .arg("Text")
//!     .format("Count: {}")
//!     .build();
//! assert_eq!(action.len(), 5);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::notify::NotifyError;
use crate::object::{ObjectId, SharedObjectRegistry};
use crate::value::{Callable, Value};

/// A value resolved when the action fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// The object whose attribute changed.
    SelfRef,
    /// The new attribute value.
    Value,
    /// The attribute value before the change.
    OldValue,
    /// `Bool(!value.is_truthy())`.
    Toggle,
    /// The new value formatted with the following literal string; consumes it.
    Format,
    /// The following literal callable; consumes it.
    Function,
}

impl Placeholder {
    /// Number of template slots this placeholder consumes, itself included.
    pub fn width(self) -> usize {
        match self {
            Self::Format | Self::Function => 2,
            _ => 1,
        }
    }
}

/// One element of an action template.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionItem {
    /// Appended verbatim.
    Literal(Value),
    /// Resolved at fire time.
    Placeholder(Placeholder),
}

/// An immutable action template with reference identity.
///
/// Cloning shares identity, which is what
/// [`SharedObjectRegistry::rem_notify`] matches on.
#[derive(Clone)]
pub struct Action {
    items: Rc<[ActionItem]>,
}

impl Action {
    /// Create an action from raw items.
    pub fn new(items: impl Into<Vec<ActionItem>>) -> Self {
        Self {
            items: Rc::from(items.into()),
        }
    }

    /// Start building an action.
    pub fn builder() -> ActionBuilder {
        ActionBuilder::default()
    }

    /// The template items.
    pub fn items(&self) -> &[ActionItem] {
        &self.items
    }

    /// Number of template items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the template is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether two handles refer to the same template.
    pub fn ptr_eq(&self, other: &Action) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    /// Resolve the template against a firing context.
    ///
    /// Returns `None` when the target or method cannot be resolved, or when a
    /// two-slot placeholder is missing its literal.
    pub(crate) fn resolve(&self, ctx: &FireContext<'_>) -> Option<Invocation> {
        let mut resolved = Vec::with_capacity(self.items.len());
        let mut items = self.items.iter();
        while let Some(item) = items.next() {
            match item {
                ActionItem::Literal(v) => resolved.push(v.clone()),
                ActionItem::Placeholder(p) => match p {
                    Placeholder::SelfRef => resolved.push(Value::Object(ctx.owner)),
                    Placeholder::Value => resolved.push(ctx.value.clone()),
                    Placeholder::OldValue => resolved.push(ctx.old.clone()),
                    Placeholder::Toggle => resolved.push(Value::Bool(!ctx.value.is_truthy())),
                    Placeholder::Format => match items.next() {
                        Some(ActionItem::Literal(Value::Str(template))) => {
                            resolved.push(Value::from(ctx.value.format_with(template)));
                        }
                        _ => return None,
                    },
                    Placeholder::Function => match items.next() {
                        Some(ActionItem::Literal(v @ Value::Callable(_))) => {
                            resolved.push(v.clone());
                        }
                        _ => return None,
                    },
                },
            }
        }

        let mut resolved = resolved.into_iter();
        let target = resolved.next()?.as_object()?;
        let method = match resolved.next()? {
            Value::Str(name) => MethodRef::Named(name),
            Value::Callable(callable) => MethodRef::Callable(callable),
            _ => return None,
        };
        Some(Invocation {
            target,
            method,
            args: resolved.collect(),
        })
    }

    /// Check the destination and, where it is known, the method.
    pub(crate) fn validate(
        &self,
        registry: &SharedObjectRegistry,
        owner: ObjectId,
        attribute: &str,
    ) -> Result<(), NotifyError> {
        let invalid = || NotifyError::InvalidDestination {
            attribute: attribute.to_string(),
        };

        let target = match self.items.first() {
            Some(ActionItem::Literal(Value::Object(id))) if registry.contains(*id) => Some(*id),
            Some(ActionItem::Placeholder(Placeholder::SelfRef)) => Some(owner),
            // Only known once the notification fires.
            Some(ActionItem::Placeholder(Placeholder::Value | Placeholder::OldValue)) => None,
            _ => return Err(invalid()),
        };

        if let (Some(target), Some(ActionItem::Literal(Value::Str(name)))) =
            (target, self.items.get(1))
        {
            let class = registry.class(target)?;
            if class.method(name).is_none() {
                return Err(NotifyError::UnknownMethod {
                    class: class.name(),
                    method: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

/// Builder for [`Action`].
#[derive(Default)]
pub struct ActionBuilder {
    items: Vec<ActionItem>,
}

impl ActionBuilder {
    /// Literal target object.
    pub fn target(self, id: ObjectId) -> Self {
        self.arg(id)
    }

    /// The object whose attribute changed.
    pub fn this(self) -> Self {
        self.placeholder(Placeholder::SelfRef)
    }

    /// Method name, looked up on the target's class when the action fires.
    pub fn method(self, name: &str) -> Self {
        self.arg(name)
    }

    /// A callable in method position or as an argument.
    pub fn callable(self, callable: Callable) -> Self {
        self.arg(callable)
    }

    /// A callable wrapped in [`Placeholder::Function`].
    pub fn function(self, callable: Callable) -> Self {
        self.placeholder(Placeholder::Function).arg(callable)
    }

    /// A literal value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.items.push(ActionItem::Literal(value.into()));
        self
    }

    /// A placeholder.
    pub fn placeholder(mut self, placeholder: Placeholder) -> Self {
        self.items.push(ActionItem::Placeholder(placeholder));
        self
    }

    /// The new value.
    pub fn value(self) -> Self {
        self.placeholder(Placeholder::Value)
    }

    /// The old value.
    pub fn old_value(self) -> Self {
        self.placeholder(Placeholder::OldValue)
    }

    /// The negated truthiness of the new value.
    pub fn toggle(self) -> Self {
        self.placeholder(Placeholder::Toggle)
    }

    /// The new value formatted with `template`.
    pub fn format(self, template: &str) -> Self {
        self.placeholder(Placeholder::Format).arg(template)
    }

    /// Finish the action.
    pub fn build(self) -> Action {
        Action::new(self.items)
    }
}

/// Values available to placeholders while a notification fires.
pub(crate) struct FireContext<'a> {
    pub(crate) owner: ObjectId,
    pub(crate) value: &'a Value,
    pub(crate) old: &'a Value,
}

pub(crate) enum MethodRef {
    Named(Rc<str>),
    Callable(Callable),
}

/// A fully resolved call.
pub(crate) struct Invocation {
    pub(crate) target: ObjectId,
    pub(crate) method: MethodRef,
    pub(crate) args: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Class;

    fn fire(action: &Action, owner: ObjectId, value: Value, old: Value) -> Option<Invocation> {
        action.resolve(&FireContext {
            owner,
            value: &value,
            old: &old,
        })
    }

    fn owner() -> (SharedObjectRegistry, ObjectId) {
        let registry = SharedObjectRegistry::new();
        let class = Class::builder("Thing").method("poke", |_, _, _| Ok(())).build();
        let id = registry.create(&class);
        (registry, id)
    }

    #[test]
    fn test_resolve_placeholders() {
        let (_registry, id) = owner();
        let action = Action::builder()
            .this()
            .method("poke")
            .value()
            .old_value()
            .toggle()
            .format("<{}>")
            .build();

        let call = fire(&action, id, Value::from(3), Value::from(2)).unwrap();
        assert_eq!(call.target, id);
        assert!(matches!(&call.method, MethodRef::Named(name) if &**name == "poke"));
        assert_eq!(
            call.args,
            vec![
                Value::Int(3),
                Value::Int(2),
                Value::Bool(false),
                Value::from("<3>"),
            ]
        );
    }

    #[test]
    fn test_function_placeholder_in_method_position() {
        let (_registry, id) = owner();
        let callable = Callable::new(|_, _, _| Ok(()));
        let action = Action::builder().this().function(callable.clone()).build();

        let call = fire(&action, id, Value::Nil, Value::Nil).unwrap();
        assert!(matches!(&call.method, MethodRef::Callable(c) if c.ptr_eq(&callable)));
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_unresolvable_target_degrades_to_nothing() {
        let (_registry, id) = owner();
        let action = Action::builder().value().method("poke").build();
        assert!(fire(&action, id, Value::from("not an object"), Value::Nil).is_none());

        let truncated = Action::new(vec![
            ActionItem::Placeholder(Placeholder::SelfRef),
            ActionItem::Literal(Value::from("poke")),
            ActionItem::Placeholder(Placeholder::Format),
        ]);
        assert!(fire(&truncated, id, Value::Nil, Value::Nil).is_none());

        let no_method = Action::builder().this().build();
        assert!(fire(&no_method, id, Value::Nil, Value::Nil).is_none());
    }

    #[test]
    fn test_validate_destination() {
        let (registry, id) = owner();

        let empty = Action::builder().build();
        assert!(matches!(
            empty.validate(&registry, id, "A"),
            Err(NotifyError::InvalidDestination { .. })
        ));

        let nil = Action::builder().arg(Value::Nil).method("poke").build();
        assert!(matches!(
            nil.validate(&registry, id, "A"),
            Err(NotifyError::InvalidDestination { .. })
        ));

        let literal = Action::builder().arg(5).method("poke").build();
        assert!(literal.validate(&registry, id, "A").is_err());

        let deferred = Action::builder().value().method("anything").build();
        assert!(deferred.validate(&registry, id, "A").is_ok());

        let good = Action::builder().target(id).method("poke").build();
        assert!(good.validate(&registry, id, "A").is_ok());
    }

    #[test]
    fn test_validate_unknown_method() {
        let (registry, id) = owner();
        let action = Action::builder().this().method("missing").build();
        assert!(matches!(
            action.validate(&registry, id, "A"),
            Err(NotifyError::UnknownMethod { class: "Thing", .. })
        ));
    }

    #[test]
    fn test_identity() {
        let a = Action::builder().this().method("poke").build();
        let b = Action::builder().this().method("poke").build();
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
