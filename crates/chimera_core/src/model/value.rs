//! # Values, Methods and Members
//!
//! A member is whatever a name resolves to: either a field holding a
//! [`Value`] or a shared [`Method`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use crate::error::ModelResult;

/// A dynamically typed field value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float. Integers are widened.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// The signature every method body has: explicit receiver, then arguments.
type MethodBody = dyn Fn(&mut Entity, &[Value]) -> ModelResult<Value> + Send + Sync;

/// A shared behavior.
///
/// Cloning a method clones a reference, never the body. Every entity that
/// reaches a method through the same template therefore runs the same
/// allocation.
///
/// The receiver is passed explicitly: there is no hidden `self` binding.
/// State a method captures in its closure stays private to the method and is
/// never visible as a member.
#[derive(Clone)]
pub struct Method {
    body: Arc<MethodBody>,
}

impl Method {
    /// Wraps a closure as a method.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Entity, &[Value]) -> ModelResult<Value> + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
        }
    }

    /// Runs the method with `receiver` as its entity.
    ///
    /// # Errors
    ///
    /// Whatever the method body returns.
    #[inline]
    pub fn call(&self, receiver: &mut Entity, args: &[Value]) -> ModelResult<Value> {
        (self.body)(receiver, args)
    }

    /// Returns true if both handles point at the same body.
    #[inline]
    #[must_use]
    pub fn same_body(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.body).cast::<u8>() == Arc::as_ptr(&other.body).cast::<u8>()
    }

    /// Number of live references to this body.
    #[must_use]
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.body)
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.same_body(other)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Method(..)")
    }
}

/// What a member name resolves to.
#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    /// A data field.
    Field(Value),
    /// A shared behavior.
    Method(Method),
}

impl Member {
    /// Returns the field value, if this is a field.
    #[inline]
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Field(v) => Some(v),
            Self::Method(_) => None,
        }
    }

    /// Returns the method, if this is a method.
    #[inline]
    #[must_use]
    pub const fn as_method(&self) -> Option<&Method> {
        match self {
            Self::Method(m) => Some(m),
            Self::Field(_) => None,
        }
    }

    /// Returns true if this member is a method.
    #[inline]
    #[must_use]
    pub const fn is_method(&self) -> bool {
        matches!(self, Self::Method(_))
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Self::Field(value)
    }
}

impl From<Method> for Member {
    fn from(method: Method) -> Self {
        Self::Method(method)
    }
}
