//! # Entities
//!
//! An entity is per-instance state plus at most one delegation link:
//! - An own member table, freely readable and writable by its owner
//! - An optional link to a template revision
//!
//! Writing to an entity only ever touches its own table. A write that hits a
//! name the template also defines shadows it; removing the own entry makes
//! the template's member visible again.

use std::collections::HashMap;

use super::resolver::{self, Lookup};
use super::template::TemplateHandle;
use super::value::{Member, Method, Value};
use crate::error::{ModelError, ModelResult};

/// Name-to-member table used by entities and templates.
pub type MemberTable = HashMap<String, Member>;

/// Unique identifier for an entity, assigned by its factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

/// A unit of per-instance state with an optional delegation link.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    own: MemberTable,
    link: Option<TemplateHandle>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, own: MemberTable, link: Option<TemplateHandle>) -> Self {
        Self { id, own, link }
    }

    /// The entity's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The template this entity delegates to, if any.
    #[inline]
    #[must_use]
    pub const fn template(&self) -> Option<&TemplateHandle> {
        self.link.as_ref()
    }

    /// Returns true if the entity has no delegation link.
    #[inline]
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.link.is_none()
    }

    /// Looks up a member in the own table only.
    #[inline]
    #[must_use]
    pub fn own(&self, name: &str) -> Option<&Member> {
        self.own.get(name)
    }

    /// Iterates over the own table.
    pub fn own_members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.own.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries in the own table.
    #[inline]
    #[must_use]
    pub fn own_len(&self) -> usize {
        self.own.len()
    }

    /// Resolves `name` through the own table and then the delegation chain.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Lookup<'_> {
        resolver::resolve(self, name)
    }

    /// Resolves `name` to a field value. Methods and misses give `None`.
    #[inline]
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).value()
    }

    /// Resolves `name` to a cloned field value, or [`Value::Null`].
    #[must_use]
    pub fn value_or_null(&self, name: &str) -> Value {
        self.value(name).cloned().unwrap_or_default()
    }

    /// Resolves `name` to an integer.
    ///
    /// # Errors
    ///
    /// [`ModelError::MemberNotFound`] on a miss, [`ModelError::TypeMismatch`]
    /// if the member is not an integer field.
    pub fn int(&self, name: &str) -> ModelResult<i64> {
        self.typed(name, "an integer", Value::as_int)
    }

    /// Resolves `name` to text.
    ///
    /// # Errors
    ///
    /// [`ModelError::MemberNotFound`] on a miss, [`ModelError::TypeMismatch`]
    /// if the member is not a text field.
    pub fn text(&self, name: &str) -> ModelResult<&str> {
        self.typed(name, "text", Value::as_str)
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> ModelResult<T> {
        match self.get(name).member() {
            None => Err(ModelError::MemberNotFound(name.to_string())),
            Some(member) => member
                .as_value()
                .and_then(extract)
                .ok_or_else(|| ModelError::TypeMismatch {
                    member: name.to_string(),
                    expected,
                }),
        }
    }

    /// Writes a field into the own table, shadowing any template member.
    ///
    /// Returns the previous own entry, if there was one. The template is
    /// never touched.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Member> {
        self.own.insert(name.into(), Member::Field(value.into()))
    }

    /// Writes a method into the own table, shadowing any template member.
    pub fn set_method(&mut self, name: impl Into<String>, method: Method) -> Option<Member> {
        self.own.insert(name.into(), Member::Method(method))
    }

    /// Removes an own entry, revealing the template's member again if any.
    pub fn remove(&mut self, name: &str) -> Option<Member> {
        self.own.remove(name)
    }

    /// Resolves `name` to a method and runs it with this entity as receiver.
    ///
    /// # Errors
    ///
    /// - [`ModelError::MemberNotFound`] if nothing resolves
    /// - [`ModelError::NotCallable`] if the member is a field
    /// - whatever the method itself returns
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> ModelResult<Value> {
        let method = match self.get(name).member() {
            None => return Err(ModelError::MemberNotFound(name.to_string())),
            Some(Member::Field(_)) => return Err(ModelError::NotCallable(name.to_string())),
            Some(Member::Method(method)) => method.clone(),
        };
        method.call(self, args)
    }
}
