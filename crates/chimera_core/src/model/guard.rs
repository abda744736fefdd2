//! # Mutability Guard
//!
//! Tracks the lifecycle of a template and decides which writes to its own
//! table are allowed.
//!
//! ```text
//!   Draft ──publish──▶ Open ──seal──▶ Sealed ──freeze──▶ Frozen
//!     │                                  ▲                  ▲
//!     └──────────────seal────────────────┘                  │
//!     └──────────────freeze─────────────────────────────────┘
//! ```
//!
//! Transitions only ever move right. The state is a single atomic byte whose
//! encoding is ordered the same way, so every transition is one `fetch_max`
//! and a write check is one load. No locks.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use super::template::TemplateHandle;
use crate::error::{ModelError, ModelResult};

/// How strictly a published template rejects writes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SealLevel {
    /// Writes create new revisions freely.
    #[default]
    Open,
    /// Existing keys may be overwritten; new keys and removals are rejected.
    Sealed,
    /// Every write is rejected.
    Frozen,
}

impl fmt::Display for SealLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Sealed => "sealed",
            Self::Frozen => "frozen",
        })
    }
}

/// Lifecycle state of a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateState {
    /// Defined but not yet handed to any entity or child template.
    Draft,
    /// Handed out; the seal level says which writes are still accepted.
    Published(SealLevel),
}

impl TemplateState {
    const DRAFT: u8 = 0;
    const OPEN: u8 = 1;
    const SEALED: u8 = 2;
    const FROZEN: u8 = 3;

    /// Returns true once the template has left the draft state.
    #[inline]
    #[must_use]
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Published(_))
    }

    /// Returns the seal level, or `None` for drafts.
    #[inline]
    #[must_use]
    pub const fn seal_level(self) -> Option<SealLevel> {
        match self {
            Self::Draft => None,
            Self::Published(level) => Some(level),
        }
    }

    const fn encode(self) -> u8 {
        match self {
            Self::Draft => Self::DRAFT,
            Self::Published(SealLevel::Open) => Self::OPEN,
            Self::Published(SealLevel::Sealed) => Self::SEALED,
            Self::Published(SealLevel::Frozen) => Self::FROZEN,
        }
    }

    const fn decode(raw: u8) -> Self {
        match raw {
            Self::DRAFT => Self::Draft,
            Self::OPEN => Self::Published(SealLevel::Open),
            Self::SEALED => Self::Published(SealLevel::Sealed),
            _ => Self::Published(SealLevel::Frozen),
        }
    }
}

impl fmt::Display for TemplateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => f.write_str("draft"),
            Self::Published(level) => write!(f, "published ({level})"),
        }
    }
}

/// Lifecycle flag shared by every revision of one template.
#[derive(Debug)]
pub(crate) struct Guard {
    state: AtomicU8,
}

impl Guard {
    /// A guard in the draft state.
    pub(crate) const fn draft() -> Self {
        Self {
            state: AtomicU8::new(TemplateState::DRAFT),
        }
    }

    /// A guard that starts out published at `level`.
    pub(crate) const fn published(level: SealLevel) -> Self {
        Self {
            state: AtomicU8::new(TemplateState::Published(level).encode()),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> TemplateState {
        TemplateState::decode(self.state.load(Ordering::Acquire))
    }

    /// Moves to `Published(level)` unless already at least that strict.
    ///
    /// Returns the state before and after.
    pub(crate) fn publish(&self, level: SealLevel) -> (TemplateState, TemplateState) {
        let target = TemplateState::Published(level).encode();
        let before = self.state.fetch_max(target, Ordering::AcqRel);
        (TemplateState::decode(before), TemplateState::decode(before.max(target)))
    }

    /// Moves a draft to `Published(level)`. A published guard is left alone.
    pub(crate) fn publish_draft(&self, level: SealLevel) -> (TemplateState, TemplateState) {
        let target = TemplateState::Published(level).encode();
        match self.state.compare_exchange(
            TemplateState::DRAFT,
            target,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(before) => (TemplateState::decode(before), TemplateState::decode(target)),
            Err(current) => {
                let current = TemplateState::decode(current);
                (current, current)
            }
        }
    }

    /// Checks a write of `key` to the guarded table.
    pub(crate) fn check_write(
        &self,
        template: &str,
        key: &str,
        is_new_key: bool,
    ) -> ModelResult<()> {
        match self.state() {
            TemplateState::Published(level @ SealLevel::Frozen) => {
                Err(rejected(template, key, level))
            }
            TemplateState::Published(level @ SealLevel::Sealed) if is_new_key => {
                Err(rejected(template, key, level))
            }
            _ => Ok(()),
        }
    }

    /// Checks the removal of `key` from the guarded table.
    pub(crate) fn check_remove(&self, template: &str, key: &str) -> ModelResult<()> {
        match self.state() {
            TemplateState::Published(level @ (SealLevel::Sealed | SealLevel::Frozen)) => {
                Err(rejected(template, key, level))
            }
            _ => Ok(()),
        }
    }
}

fn rejected(template: &str, key: &str, level: SealLevel) -> ModelError {
    tracing::warn!(
        "Rejected write of `{}` to {} template `{}`",
        key,
        level,
        template
    );
    ModelError::WriteToFrozenTemplate {
        template: template.to_string(),
        key: key.to_string(),
        level,
    }
}

/// Publishes `template` at `level`, logging the transition if one happened.
pub(crate) fn publish(template: &TemplateHandle, level: SealLevel) -> TemplateState {
    log_transition(template, template.guard().publish(level))
}

/// Publishes `template` at `level` only if it is still a draft.
pub(crate) fn publish_draft(template: &TemplateHandle, level: SealLevel) -> TemplateState {
    log_transition(template, template.guard().publish_draft(level))
}

fn log_transition(
    template: &TemplateHandle,
    (before, after): (TemplateState, TemplateState),
) -> TemplateState {
    if before != after {
        tracing::debug!(
            "Template `{}` state transition: {} -> {}",
            template.name(),
            before,
            after
        );
    }
    after
}

/// Freezes a template: no new keys, no overwrites, no removals.
///
/// Idempotent. Applies to every revision of the template, including ones
/// created later. Entities delegating to it are unaffected and can still
/// shadow any member in their own table.
pub fn freeze(template: &TemplateHandle) -> TemplateState {
    publish(template, SealLevel::Frozen)
}

/// Seals a template: existing keys may still be overwritten, but no key may
/// be added or removed.
///
/// Sealing a frozen template leaves it frozen.
pub fn seal(template: &TemplateHandle) -> TemplateState {
    publish(template, SealLevel::Sealed)
}
