//! # Template Registry
//!
//! Owns the name → current revision table.
//!
//! ## Guarantees
//!
//! 1. **Unique names**: defining a name twice fails
//! 2. **Published parents only**: a child may only delegate to a template that
//!    has already left the draft state
//! 3. **Guarded writes**: the write path is the only way to change a template,
//!    and it asks the mutability guard before registering a new revision
//!
//! The name table sits behind a `RwLock`. Only define, lookup-by-name and
//! writes touch it; resolution walks the handles entities already hold.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::entity::MemberTable;
use super::guard::{self, SealLevel, TemplateState};
use super::template::{Template, TemplateHandle, TemplateSpec};
use super::value::Member;
use crate::error::{ModelError, ModelResult};

/// Registry of named templates.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    /// Latest revision of every template, by name.
    templates: RwLock<HashMap<String, TemplateHandle>>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a new template in the draft state.
    ///
    /// # Errors
    ///
    /// - `DuplicateTemplateName` if `name` is taken
    /// - `UnknownParent` if `spec` names a parent that is not registered or
    ///   is still a draft
    pub fn define(
        &self,
        name: impl Into<String>,
        spec: TemplateSpec,
    ) -> ModelResult<TemplateHandle> {
        let name = name.into();
        let mut templates = self.templates.write();

        if templates.contains_key(&name) {
            return Err(ModelError::DuplicateTemplateName(name));
        }

        let parent = match spec.parent {
            Some(parent_name) => {
                let parent = templates
                    .get(&parent_name)
                    .filter(|parent| parent.state().is_published())
                    .cloned();
                match parent {
                    Some(parent) => Some(parent),
                    None => {
                        return Err(ModelError::UnknownParent {
                            template: name,
                            parent: parent_name,
                        })
                    }
                }
            }
            None => None,
        };

        let members: MemberTable = spec.members.into_iter().collect();

        tracing::debug!(
            "Template defined: `{}` (parent: {:?}, {} members)",
            name,
            parent.as_ref().map(|p| p.name()),
            members.len()
        );

        let handle = Template::registered(name.clone(), parent, members);
        templates.insert(name, handle.clone());
        Ok(handle)
    }

    /// Gets the current revision of a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TemplateHandle> {
        self.templates.read().get(name).cloned()
    }

    /// Gets the current revision of a template by name.
    ///
    /// # Errors
    ///
    /// `UnknownTemplate` if no template has that name.
    pub fn require(&self, name: &str) -> ModelResult<TemplateHandle> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownTemplate(name.to_string()))
    }

    /// Returns true if a template with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.read().contains_key(name)
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Latest revision of the template `handle` refers to.
    ///
    /// Private (composer-built) templates have a single revision and are
    /// returned as is, as are handles this registry did not issue.
    #[must_use]
    pub fn current(&self, handle: &TemplateHandle) -> TemplateHandle {
        if handle.is_private() {
            return handle.clone();
        }
        self.get(handle.name())
            .filter(|latest| latest.same_template(handle))
            .unwrap_or_else(|| handle.clone())
    }

    /// Publishes a template at `level` (no-op if already at least that strict).
    pub fn publish(&self, handle: &TemplateHandle, level: SealLevel) -> TemplateState {
        guard::publish(handle, level)
    }

    /// Freezes a template. See [`guard::freeze`].
    pub fn freeze(&self, handle: &TemplateHandle) -> TemplateState {
        guard::freeze(handle)
    }

    /// Seals a template. See [`guard::seal`].
    pub fn seal(&self, handle: &TemplateHandle) -> TemplateState {
        guard::seal(handle)
    }

    /// Writes a member to a template's own table.
    ///
    /// On success a new revision is registered and returned. Entities and
    /// child templates created earlier keep the revision they hold.
    ///
    /// # Errors
    ///
    /// - `WriteToFrozenTemplate` if the template is frozen, or sealed and
    ///   `key` is new
    /// - `UnknownTemplate` if this registry does not hold the template
    pub fn write_member(
        &self,
        handle: &TemplateHandle,
        key: impl Into<String>,
        member: impl Into<Member>,
    ) -> ModelResult<TemplateHandle> {
        let key = key.into();
        let member = member.into();
        self.revise(handle, |current| {
            current
                .guard()
                .check_write(current.name(), &key, !current.defines(&key))?;
            Ok(current.revise(|members| {
                members.insert(key, member);
            }))
        })
    }

    /// Removes a member from a template's own table.
    ///
    /// # Errors
    ///
    /// - `WriteToFrozenTemplate` if the template is sealed or frozen
    /// - `MemberNotFound` if the template's own table lacks `key`
    /// - `UnknownTemplate` if this registry does not hold the template
    pub fn remove_member(&self, handle: &TemplateHandle, key: &str) -> ModelResult<TemplateHandle> {
        self.revise(handle, |current| {
            current.guard().check_remove(current.name(), key)?;
            if !current.defines(key) {
                return Err(ModelError::MemberNotFound(key.to_string()));
            }
            Ok(current.revise(|members| {
                members.remove(key);
            }))
        })
    }

    /// Runs `edit` against the current revision under the write lock and
    /// registers the revision it returns.
    fn revise(
        &self,
        handle: &TemplateHandle,
        edit: impl FnOnce(&TemplateHandle) -> ModelResult<TemplateHandle>,
    ) -> ModelResult<TemplateHandle> {
        if handle.is_private() {
            // Private chains are frozen from birth; the guard rejects any edit
            return edit(handle);
        }

        let mut templates = self.templates.write();
        let current = templates
            .get(handle.name())
            .filter(|latest| latest.same_template(handle))
            .cloned()
            .ok_or_else(|| ModelError::UnknownTemplate(handle.name().to_string()))?;

        let next = edit(&current)?;
        tracing::debug!(
            "Template `{}` revised: revision {} -> {}",
            next.name(),
            current.revision(),
            next.revision()
        );
        templates.insert(next.name().to_string(), next.clone());
        Ok(next)
    }
}
