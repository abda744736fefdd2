//! # Delegation Resolver
//!
//! Answers "what does this name mean for this entity?".
//!
//! ## Lookup Order
//!
//! 1. The entity's own table. Shadowing always wins.
//! 2. The delegation chain, nearest template first.
//! 3. Otherwise [`Lookup::NotFound`].
//!
//! This is the hot path behind every field read and method dispatch. It walks
//! immutable data through shared references: no locks, no allocation, no side
//! effects.

use std::collections::HashMap;

use super::entity::Entity;
use super::template::{Chain, Template};
use super::value::{Member, Method, Value};

/// Outcome of resolving a member name.
#[derive(Clone, Copy, Debug)]
pub enum Lookup<'a> {
    /// Found in the entity's own table.
    Own(&'a Member),
    /// Found on the delegation chain.
    Delegated {
        /// The member.
        member: &'a Member,
        /// The template revision that defines it.
        template: &'a Template,
        /// Distance from the entity: 1 for its own template, 2 for that
        /// template's parent, and so on.
        depth: usize,
    },
    /// Nothing on the entity or its chain defines the name.
    NotFound,
}

impl<'a> Lookup<'a> {
    /// The resolved member, if any.
    #[inline]
    #[must_use]
    pub const fn member(&self) -> Option<&'a Member> {
        match *self {
            Self::Own(member) | Self::Delegated { member, .. } => Some(member),
            Self::NotFound => None,
        }
    }

    /// The resolved field value. `None` for methods and misses.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&'a Value> {
        self.member().and_then(Member::as_value)
    }

    /// The resolved method. `None` for fields and misses.
    #[inline]
    #[must_use]
    pub fn method(&self) -> Option<&'a Method> {
        self.member().and_then(Member::as_method)
    }

    /// Returns true unless this is [`Lookup::NotFound`].
    #[inline]
    #[must_use]
    pub const fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// Returns true if the member came from the entity's own table.
    #[inline]
    #[must_use]
    pub const fn is_own(&self) -> bool {
        matches!(self, Self::Own(_))
    }

    /// The template that supplied the member, if it was delegated.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> Option<&'a Template> {
        match *self {
            Self::Delegated { template, .. } => Some(template),
            _ => None,
        }
    }
}

/// Resolves `name` on `entity`.
///
/// The entity's own value wins over any template; a nearer template wins over
/// a farther ancestor.
#[must_use]
pub fn resolve<'a>(entity: &'a Entity, name: &str) -> Lookup<'a> {
    if let Some(member) = entity.own(name) {
        return Lookup::Own(member);
    }

    for (index, template) in chain(entity).enumerate() {
        if let Some(member) = template.own(name) {
            return Lookup::Delegated {
                member,
                template,
                depth: index + 1,
            };
        }
    }

    Lookup::NotFound
}

/// Iterates the entity's delegation chain, nearest template first.
///
/// Empty for detached entities.
#[inline]
#[must_use]
pub fn chain(entity: &Entity) -> Chain<'_> {
    Chain::starting_at(entity.template().map(|handle| &**handle))
}

/// Length of the entity's delegation chain.
#[must_use]
pub fn chain_len(entity: &Entity) -> usize {
    chain(entity).count()
}

/// Every name visible on `entity`, each mapped to the member it resolves to.
///
/// Equivalent to calling [`resolve`] for every name defined anywhere on the
/// entity or its chain.
#[must_use]
pub fn visible_members(entity: &Entity) -> HashMap<&str, &Member> {
    let templates: Vec<&Template> = chain(entity).collect();
    let mut visible = HashMap::new();

    // Farthest first so nearer definitions overwrite
    for template in templates.into_iter().rev() {
        visible.extend(template.members());
    }
    visible.extend(entity.own_members());

    visible
}
