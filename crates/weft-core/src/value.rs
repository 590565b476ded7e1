//! Dynamically typed attribute values.
//!
//! Every attribute stored on an object is a [`Value`]. Values double as
//! notification triggers, so they implement `Eq` and `Hash`: floats compare
//! by their bit pattern and callables compare by identity.
//!
//! # Example
//!
//! ```
//! use weft_core::Value;
//!
//! let v = Value::from("hello");
//! assert_eq!(v.as_str(), Some("hello"));
//! assert!(v.is_truthy());
//! assert!(!Value::Nil.is_truthy());
//! assert_eq!(Value::from(7).format_with("count: {}"), "count: 7");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::object::{ObjectError, ObjectId, SharedObjectRegistry};

/// Result type returned by methods and callables.
pub type MethodResult = std::result::Result<(), MethodError>;

/// The error a method handler reports.
///
/// Errors raised by notification handlers never propagate back to the object
/// whose attribute changed; they are logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MethodError {
    message: String,
}

impl MethodError {
    /// Create a method error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ObjectError> for MethodError {
    fn from(err: ObjectError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<&str> for MethodError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for MethodError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

type MethodFn = dyn Fn(&SharedObjectRegistry, ObjectId, &[Value]) -> MethodResult;

/// A callable invoked with the registry, a target object and positional arguments.
///
/// Callables are used both as entries in a class's method table and as literal
/// values inside action templates. Clones share identity.
#[derive(Clone)]
pub struct Callable {
    func: Rc<MethodFn>,
}

impl Callable {
    /// Wrap a closure.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&SharedObjectRegistry, ObjectId, &[Value]) -> MethodResult + 'static,
    {
        Self {
            func: Rc::new(func),
        }
    }

    /// Invoke the callable.
    pub fn call(
        &self,
        registry: &SharedObjectRegistry,
        target: ObjectId,
        args: &[Value],
    ) -> MethodResult {
        (self.func)(registry, target, args)
    }

    /// Whether two handles refer to the same callable.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.func) as *const ()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({:p})", self.addr())
    }
}

/// A dynamically typed attribute value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Sentinel meaning "keep the current value". Never stored.
    Unset,
    /// No value.
    #[default]
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// An immutable string.
    Str(Rc<str>),
    /// A reference to an object in the registry.
    Object(ObjectId),
    /// A callable.
    Callable(Callable),
}

impl Value {
    /// Whether this is the [`Value::Unset`] sentinel.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Whether this is [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Truthiness: `Unset`, `Nil` and `false` are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Unset | Self::Nil | Self::Bool(false))
    }

    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The number as a float, accepting both `Int` and `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The string slice, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The object reference, if this is an `Object`.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// The callable, if this is a `Callable`.
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// A short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Callable(_) => "callable",
        }
    }

    /// Substitute this value for every `{}` in `template`.
    pub fn format_with(&self, template: &str) -> String {
        template.replace("{}", &self.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unset, Self::Unset) | (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Unset | Self::Nil => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Str(s) => s.hash(state),
            Self::Object(id) => id.hash(state),
            Self::Callable(c) => c.addr().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "<unset>"),
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Object(id) => write!(f, "{id:?}"),
            Self::Callable(c) => write!(f, "{c:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Self::Callable(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Nil, Into::into)
    }
}
