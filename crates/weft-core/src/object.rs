//! Object model for weft.
//!
//! Provides the base object system with:
//! - Unique object identifiers via arena-based storage
//! - Parent-child ownership relationships with cascading destruction
//! - Classes carrying method tables, attribute defaults and notification templates
//! - Named attribute storage, mutated through [`SharedObjectRegistry::set_value`]
//!
//! # Key Types
//!
//! - [`ObjectId`] - Unique stable identifier for each object
//! - [`Class`] - Method table, defaults and class-level notifications
//! - [`ObjectRegistry`] - Central arena managing all objects
//! - [`SharedObjectRegistry`] - Cloneable single-threaded handle around [`ObjectRegistry`]
//!
//! # Example
//!
//! ```
//! use weft_core::{Class, NotifyMode, SharedObjectRegistry, Value};
//!
//! let registry = SharedObjectRegistry::new();
//! let class = Class::builder("Counter").default("Count", 0).build();
//! let counter = registry.create(&class);
//!
//! assert_eq!(registry.get_value(counter, "Count").unwrap(), Value::Int(0));
//! registry.set_value(counter, "Count", 5, NotifyMode::Default).unwrap();
//! assert_eq!(registry.get_value(counter, "Count").unwrap(), Value::Int(5));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::action::Action;
use crate::notify::{Notifications, NotifyMode, Trigger};
use crate::value::{Callable, MethodError, MethodResult, Value};

new_key_type! {
    /// A unique identifier for an object in the registry.
    ///
    /// `ObjectId`s are stable handles that remain valid even as the object tree changes.
    /// They become invalid when the object is destroyed.
    pub struct ObjectId;
}

impl ObjectId {
    /// Convert the ObjectId to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

/// Errors that can occur during object operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    /// The object ID is invalid or has been destroyed.
    #[error("Invalid or destroyed object ID")]
    InvalidObjectId,
    /// Attempted to set an object as its own parent/ancestor.
    #[error("Cannot set an object as its own parent or ancestor")]
    CircularParentage,
    /// The class has no method with this name.
    #[error("Class '{class}' has no method '{method}'")]
    UnknownMethod {
        /// The class that was searched.
        class: &'static str,
        /// The method name that was not found.
        method: String,
    },
}

/// Result type for object operations.
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;

/// A class: the shared description of a kind of object.
///
/// Classes form a single-inheritance chain. Methods and attribute defaults are
/// looked up along the chain, nearest class first. The class-level
/// notification template is copied into each new instance, parent class
/// first, so instances never share notification lists.
pub struct Class {
    name: &'static str,
    parent: Option<Rc<Class>>,
    methods: HashMap<&'static str, Callable>,
    defaults: Vec<(&'static str, Value)>,
    template: Notifications,
}

thread_local! {
    static OBJECT_CLASS: Rc<Class> = Class::base();
}

impl Class {
    /// The root class every other class extends.
    ///
    /// It provides the `setValue` method: `setValue(attribute, value[, notify])`
    /// where `notify` is `true` to force notification and `false` to suppress it.
    pub fn object() -> Rc<Class> {
        OBJECT_CLASS.with(Rc::clone)
    }

    fn base() -> Rc<Class> {
        let mut methods = HashMap::new();
        methods.insert("setValue", Callable::new(set_value_method));
        Rc::new(Class {
            name: "Object",
            parent: None,
            methods,
            defaults: Vec::new(),
            template: Notifications::default(),
        })
    }

    /// Start building a class that extends [`Class::object`].
    pub fn builder(name: &'static str) -> ClassBuilder {
        ClassBuilder {
            name,
            parent: Class::object(),
            methods: HashMap::new(),
            defaults: Vec::new(),
            template: Notifications::default(),
        }
    }

    /// The class name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parent class, if any.
    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    /// Whether this class is, or descends from, the class called `name`.
    pub fn is_a(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.name == name {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }

    /// Look up a method along the inheritance chain.
    pub fn method(&self, name: &str) -> Option<Callable> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(method) = class.methods.get(name) {
                return Some(method.clone());
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Default attribute values, ancestors first so subclasses override them.
    fn collect_defaults(&self, out: &mut HashMap<String, Value>) {
        if let Some(parent) = &self.parent {
            parent.collect_defaults(out);
        }
        for (name, value) in &self.defaults {
            out.insert((*name).to_string(), value.clone());
        }
    }

    /// Copy class notifications into a fresh instance table, ancestors first.
    fn instantiate_template(&self, out: &mut Notifications) {
        if let Some(parent) = &self.parent {
            parent.instantiate_template(out);
        }
        out.extend_from(&self.template);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name))
            .field("methods", &methods)
            .finish()
    }
}

fn set_value_method(registry: &SharedObjectRegistry, target: ObjectId, args: &[Value]) -> MethodResult {
    let attribute = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| MethodError::new("setValue expects an attribute name"))?;
    let value = args.get(1).cloned().unwrap_or(Value::Nil);
    let mode = match args.get(2) {
        Some(Value::Bool(true)) => NotifyMode::Force,
        Some(Value::Bool(false)) => NotifyMode::Suppress,
        _ => NotifyMode::Default,
    };
    registry.set_value(target, attribute, value, mode)?;
    Ok(())
}

/// Builder for [`Class`].
pub struct ClassBuilder {
    name: &'static str,
    parent: Rc<Class>,
    methods: HashMap<&'static str, Callable>,
    defaults: Vec<(&'static str, Value)>,
    template: Notifications,
}

impl ClassBuilder {
    /// Extend `parent` instead of the root class.
    pub fn extends(mut self, parent: &Rc<Class>) -> Self {
        self.parent = Rc::clone(parent);
        self
    }

    /// Add or override a method.
    pub fn method<F>(mut self, name: &'static str, func: F) -> Self
    where
        F: Fn(&SharedObjectRegistry, ObjectId, &[Value]) -> MethodResult + 'static,
    {
        self.methods.insert(name, Callable::new(func));
        self
    }

    /// Set an attribute default.
    pub fn default(mut self, attribute: &'static str, value: impl Into<Value>) -> Self {
        self.defaults.push((attribute, value.into()));
        self
    }

    /// Add a class-level notification, copied into every instance.
    ///
    /// The action is not validated here because its target usually is the
    /// instance itself ([`Placeholder::SelfRef`](crate::Placeholder::SelfRef)).
    pub fn notify(mut self, attribute: &str, trigger: Trigger, action: Action) -> Self {
        self.template.push(attribute, trigger, action);
        self
    }

    /// Finish the class.
    pub fn build(self) -> Rc<Class> {
        Rc::new(Class {
            name: self.name,
            parent: Some(self.parent),
            methods: self.methods,
            defaults: self.defaults,
            template: self.template,
        })
    }
}

/// Internal data stored in the registry for each object.
pub(crate) struct ObjectData {
    /// The object's class.
    pub(crate) class: Rc<Class>,
    /// Human-readable name for debugging and lookup.
    name: String,
    /// Current attribute values.
    pub(crate) attributes: HashMap<String, Value>,
    /// Per-instance notification table.
    pub(crate) notifications: Notifications,
    /// Parent object (if any).
    parent: Option<ObjectId>,
    /// Child objects (owned).
    children: Vec<ObjectId>,
}

/// The central registry that manages all objects and their relationships.
///
/// Uses arena-based storage via SlotMap for stable object IDs and efficient
/// parent-child relationship management.
pub struct ObjectRegistry {
    objects: SlotMap<ObjectId, ObjectData>,
}

impl ObjectRegistry {
    /// Create a new empty object registry.
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
        }
    }

    /// Create an instance of `class` and return its ID.
    ///
    /// The instance starts with the class defaults and a private copy of the
    /// class notification template.
    pub fn create(&mut self, class: &Rc<Class>) -> ObjectId {
        let mut attributes = HashMap::new();
        class.collect_defaults(&mut attributes);
        let mut notifications = Notifications::default();
        class.instantiate_template(&mut notifications);

        let id = self.objects.insert(ObjectData {
            class: Rc::clone(class),
            name: String::new(),
            attributes,
            notifications,
            parent: None,
            children: Vec::new(),
        });
        tracing::trace!(target: "weft_core::object", ?id, class = class.name(), "created object");
        id
    }

    /// Remove an object and all its children from the registry.
    #[tracing::instrument(skip(self), target = "weft_core::object", level = "trace")]
    pub fn destroy(&mut self, id: ObjectId) -> ObjectResult<()> {
        let descendants = self.collect_descendants(id)?;
        tracing::trace!(target: "weft_core::object", ?id, descendant_count = descendants.len(), "destroying object tree");

        if let Some(parent_id) = self.objects.get(id).and_then(|d| d.parent) {
            if let Some(parent_data) = self.objects.get_mut(parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }

        for child_id in descendants {
            self.objects.remove(child_id);
        }
        self.objects.remove(id);

        Ok(())
    }

    /// Collect all descendant IDs in depth-first order (children before parents).
    fn collect_descendants(&self, id: ObjectId) -> ObjectResult<Vec<ObjectId>> {
        let mut result = Vec::new();
        self.collect_descendants_recursive(id, &mut result)?;
        Ok(result)
    }

    fn collect_descendants_recursive(
        &self,
        id: ObjectId,
        result: &mut Vec<ObjectId>,
    ) -> ObjectResult<()> {
        let data = self.data(id)?;
        for &child_id in &data.children {
            self.collect_descendants_recursive(child_id, result)?;
            result.push(child_id);
        }
        Ok(())
    }

    pub(crate) fn data(&self, id: ObjectId) -> ObjectResult<&ObjectData> {
        self.objects.get(id).ok_or(ObjectError::InvalidObjectId)
    }

    pub(crate) fn data_mut(&mut self, id: ObjectId) -> ObjectResult<&mut ObjectData> {
        self.objects.get_mut(id).ok_or(ObjectError::InvalidObjectId)
    }

    /// Check if an object exists in the registry.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Set the parent of an object.
    ///
    /// Passing `None` makes the object a root object.
    pub fn set_parent(&mut self, id: ObjectId, new_parent: Option<ObjectId>) -> ObjectResult<()> {
        if !self.objects.contains_key(id) {
            return Err(ObjectError::InvalidObjectId);
        }

        if let Some(parent_id) = new_parent {
            if !self.objects.contains_key(parent_id) {
                return Err(ObjectError::InvalidObjectId);
            }
            if self.is_ancestor_of(id, parent_id) {
                return Err(ObjectError::CircularParentage);
            }
        }

        let old_parent = self.objects.get(id).and_then(|d| d.parent);
        if let Some(old_parent_id) = old_parent {
            if let Some(parent_data) = self.objects.get_mut(old_parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }

        if let Some(data) = self.objects.get_mut(id) {
            data.parent = new_parent;
        }

        if let Some(parent_id) = new_parent {
            if let Some(parent_data) = self.objects.get_mut(parent_id) {
                parent_data.children.push(id);
            }
        }

        Ok(())
    }

    /// Check if `potential_ancestor` is `id` or one of its ancestors.
    fn is_ancestor_of(&self, potential_ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.objects.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Get the parent of an object.
    pub fn parent(&self, id: ObjectId) -> ObjectResult<Option<ObjectId>> {
        self.data(id).map(|d| d.parent)
    }

    /// Get the children of an object.
    pub fn children(&self, id: ObjectId) -> ObjectResult<&[ObjectId]> {
        self.data(id).map(|d| d.children.as_slice())
    }

    /// Get the object's name.
    pub fn object_name(&self, id: ObjectId) -> ObjectResult<&str> {
        self.data(id).map(|d| d.name.as_str())
    }

    /// Set the object's name.
    pub fn set_object_name(&mut self, id: ObjectId, name: String) -> ObjectResult<()> {
        self.data_mut(id).map(|d| d.name = name)
    }

    /// Get the object's class.
    pub fn class(&self, id: ObjectId) -> ObjectResult<&Rc<Class>> {
        self.data(id).map(|d| &d.class)
    }

    /// Read an attribute without cloning. Missing attributes read as `None`.
    pub fn attribute(&self, id: ObjectId, name: &str) -> ObjectResult<Option<&Value>> {
        self.data(id).map(|d| d.attributes.get(name))
    }

    /// Names of all attributes currently set on an object, sorted.
    pub fn attribute_names(&self, id: ObjectId) -> ObjectResult<Vec<&str>> {
        let data = self.data(id)?;
        let mut names: Vec<&str> = data.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Find a direct child by name.
    pub fn find_child_by_name(&self, id: ObjectId, name: &str) -> ObjectResult<Option<ObjectId>> {
        let data = self.data(id)?;
        Ok(data
            .children
            .iter()
            .copied()
            .find(|&child| self.objects.get(child).is_some_and(|c| c.name == name)))
    }

    /// Get the total number of objects in the registry.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Get all root objects (objects without a parent).
    pub fn root_objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| id)
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable handle around [`ObjectRegistry`].
///
/// The registry is single threaded: clones share one `Rc<RefCell<_>>`.
/// Every method takes a short borrow and releases it before running any
/// notification handler, so handlers may freely re-enter the registry.
#[derive(Clone, Default)]
pub struct SharedObjectRegistry {
    inner: Rc<RefCell<ObjectRegistry>>,
}

static_assertions::assert_not_impl_any!(SharedObjectRegistry: Send, Sync);

impl SharedObjectRegistry {
    /// Create a new shared object registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an instance of `class`.
    pub fn create(&self, class: &Rc<Class>) -> ObjectId {
        self.inner.borrow_mut().create(class)
    }

    /// Create a named instance of `class`.
    pub fn create_named(&self, class: &Rc<Class>, name: impl Into<String>) -> ObjectId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.create(class);
        if let Some(data) = inner.objects.get_mut(id) {
            data.name = name.into();
        }
        id
    }

    /// Destroy an object and its children.
    pub fn destroy(&self, id: ObjectId) -> ObjectResult<()> {
        self.inner.borrow_mut().destroy(id)
    }

    /// Check if an object exists.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.borrow().contains(id)
    }

    /// Set an object's parent.
    pub fn set_parent(&self, id: ObjectId, parent: Option<ObjectId>) -> ObjectResult<()> {
        self.inner.borrow_mut().set_parent(id, parent)
    }

    /// Get an object's parent.
    pub fn parent(&self, id: ObjectId) -> ObjectResult<Option<ObjectId>> {
        self.inner.borrow().parent(id)
    }

    /// Get an object's children (cloned).
    pub fn children(&self, id: ObjectId) -> ObjectResult<Vec<ObjectId>> {
        self.inner.borrow().children(id).map(<[ObjectId]>::to_vec)
    }

    /// Get an object's name (cloned).
    pub fn object_name(&self, id: ObjectId) -> ObjectResult<String> {
        self.inner.borrow().object_name(id).map(str::to_string)
    }

    /// Set an object's name.
    pub fn set_object_name(&self, id: ObjectId, name: impl Into<String>) -> ObjectResult<()> {
        self.inner.borrow_mut().set_object_name(id, name.into())
    }

    /// Get an object's class.
    pub fn class(&self, id: ObjectId) -> ObjectResult<Rc<Class>> {
        self.inner.borrow().class(id).map(Rc::clone)
    }

    /// Read an attribute. Attributes that were never set read as [`Value::Nil`].
    pub fn get_value(&self, id: ObjectId, attribute: &str) -> ObjectResult<Value> {
        self.inner
            .borrow()
            .attribute(id, attribute)
            .map(|v| v.cloned().unwrap_or(Value::Nil))
    }

    /// Find a direct child by name.
    pub fn find_child_by_name(&self, id: ObjectId, name: &str) -> ObjectResult<Option<ObjectId>> {
        self.inner.borrow().find_child_by_name(id, name)
    }

    /// Get the total number of objects.
    pub fn object_count(&self) -> usize {
        self.inner.borrow().object_count()
    }

    /// Get all root objects.
    pub fn root_objects(&self) -> Vec<ObjectId> {
        self.inner.borrow().root_objects().collect()
    }

    /// Invoke a class method on an object.
    ///
    /// Unlike notification firing, a missing object or method is reported.
    pub fn call_method(&self, id: ObjectId, name: &str, args: &[Value]) -> MethodResult {
        let method = {
            let inner = self.inner.borrow();
            let class = inner.class(id)?;
            class.method(name).ok_or_else(|| ObjectError::UnknownMethod {
                class: class.name(),
                method: name.to_string(),
            })?
        };
        method.call(self, id, args)
    }

    /// Access the registry with a shared borrow for complex operations.
    ///
    /// The closure must not call back into this handle's mutating methods.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ObjectRegistry) -> R,
    {
        f(&self.inner.borrow())
    }

    /// Access the registry with an exclusive borrow for complex operations.
    ///
    /// The closure must not call back into this handle.
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ObjectRegistry) -> R,
    {
        f(&mut self.inner.borrow_mut())
    }
}

impl fmt::Debug for SharedObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObjectRegistry")
            .field("object_count", &self.object_count())
            .finish()
    }
}
