//! # Templates
//!
//! A template is a named, immutable bundle of default fields and methods,
//! optionally linked to one parent template.
//!
//! Nothing on [`Template`] or [`TemplateHandle`] can change a member table.
//! The only way to change a template is the registry's write path, which asks
//! the [guard](super::guard) first and then registers a *new revision*; the
//! old revision, and every entity holding it, stays exactly as it was.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::entity::MemberTable;
use super::guard::{Guard, SealLevel, TemplateState};
use super::value::{Member, Method, Value};

/// Source of template ids. Every revision gets a fresh one.
static NEXT_TEMPLATE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one template revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TemplateId(u64);

impl TemplateId {
    fn next() -> Self {
        Self(NEXT_TEMPLATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Input to [`TemplateRegistry::define`](super::TemplateRegistry::define).
///
/// # Example
///
/// ```rust,ignore
/// let spec = TemplateSpec::new()
///     .field("name", "default")
///     .field("age", 0)
///     .method("getName", get_name)
///     .parent("being");
/// ```
#[derive(Clone, Debug, Default)]
pub struct TemplateSpec {
    pub(crate) members: Vec<(String, Member)>,
    pub(crate) parent: Option<String>,
}

impl TemplateSpec {
    /// Creates an empty spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default field value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push((name.into(), Member::Field(value.into())));
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.members.push((name.into(), Member::Method(method)));
        self
    }

    /// Adds an already-built member.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, member: impl Into<Member>) -> Self {
        self.members.push((name.into(), member.into()));
        self
    }

    /// Names the parent template to delegate to.
    #[must_use]
    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent = Some(name.into());
        self
    }

    /// Returns the parent name, if any.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// One immutable revision of a template.
pub struct Template {
    id: TemplateId,
    name: String,
    revision: u32,
    parent: Option<TemplateHandle>,
    members: MemberTable,
    /// Shared by every revision of the same template.
    guard: Arc<Guard>,
    /// Built by the composer, never registered by name.
    private: bool,
    /// Set once the deep-chain warning has been logged for this revision.
    depth_warned: AtomicBool,
}

impl Template {
    /// First revision of a registered template, in draft state.
    pub(crate) fn registered(
        name: String,
        parent: Option<TemplateHandle>,
        members: MemberTable,
    ) -> TemplateHandle {
        TemplateHandle(Arc::new(Self {
            id: TemplateId::next(),
            name,
            revision: 0,
            parent,
            members,
            guard: Arc::new(Guard::draft()),
            private: false,
            depth_warned: AtomicBool::new(false),
        }))
    }

    /// A private, frozen template built for one composition recipe.
    pub(crate) fn private(
        name: String,
        parent: Option<TemplateHandle>,
        members: MemberTable,
    ) -> TemplateHandle {
        TemplateHandle(Arc::new(Self {
            id: TemplateId::next(),
            name,
            revision: 0,
            parent,
            members,
            guard: Arc::new(Guard::published(SealLevel::Frozen)),
            private: true,
            depth_warned: AtomicBool::new(false),
        }))
    }

    /// Next revision with `edit` applied to a copy of the member table.
    pub(crate) fn revise(&self, edit: impl FnOnce(&mut MemberTable)) -> TemplateHandle {
        let mut members = self.members.clone();
        edit(&mut members);
        TemplateHandle(Arc::new(Self {
            id: TemplateId::next(),
            name: self.name.clone(),
            revision: self.revision + 1,
            parent: self.parent.clone(),
            members,
            guard: Arc::clone(&self.guard),
            private: self.private,
            depth_warned: AtomicBool::new(false),
        }))
    }

    #[inline]
    pub(crate) fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Marks the deep-chain warning as logged. True only for the first call.
    #[inline]
    pub(crate) fn claim_depth_warning(&self) -> bool {
        !self.depth_warned.swap(true, Ordering::Relaxed)
    }

    /// Returns true if both are revisions of one template.
    #[inline]
    #[must_use]
    pub fn same_template(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.guard, &other.guard)
    }

    /// Unique id of this revision.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TemplateId {
        self.id
    }

    /// Template name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Revision number, starting at 0.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// The parent template, if any.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<&TemplateHandle> {
        self.parent.as_ref()
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> TemplateState {
        self.guard.state()
    }

    /// Returns true for templates built by the composer.
    #[inline]
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.private
    }

    /// Looks up a member in this template's own table only.
    #[inline]
    #[must_use]
    pub fn own(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Returns true if this template's own table defines `name`.
    #[inline]
    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Iterates over this template's own members.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of members in the own table.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the own table is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates this template and its ancestors, nearest first.
    #[must_use]
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of templates in the chain starting here (1 for a root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Every member visible from this template, nearest definition first
    /// wins, collected into a fresh table.
    pub(crate) fn flattened(&self) -> MemberTable {
        let templates: Vec<&Template> = self.chain().collect();
        let mut table = MemberTable::new();
        for template in templates.into_iter().rev() {
            for (key, member) in &template.members {
                table.insert(key.clone(), member.clone());
            }
        }
        table
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.members.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Template")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("revision", &self.revision)
            .field("state", &self.state())
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("members", &keys)
            .finish()
    }
}

/// Iterator over a delegation chain, nearest template first.
#[derive(Clone, Debug)]
pub struct Chain<'a> {
    next: Option<&'a Template>,
}

impl<'a> Chain<'a> {
    pub(crate) const fn starting_at(template: Option<&'a Template>) -> Self {
        Self { next: template }
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Template;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// Opaque, read-only, cheaply clonable reference to a template revision.
#[derive(Clone, Debug)]
pub struct TemplateHandle(Arc<Template>);

impl TemplateHandle {
    /// Returns true if both handles refer to the same revision.
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Number of live handles to this revision (entities, children, caller
    /// copies and the registry entry all count).
    #[must_use]
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Deref for TemplateHandle {
    type Target = Template;

    #[inline]
    fn deref(&self) -> &Template {
        &self.0
    }
}
