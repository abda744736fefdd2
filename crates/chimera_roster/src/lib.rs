//! # CHIMERA Roster
//!
//! Templates and traits described in TOML instead of code.
//!
//! A roster file lists `[[template]]` and `[[trait]]` recipes. Fields are
//! plain values; methods name a behavior from a [`BehaviorCatalog`] and the
//! argument to build it with. [`Roster::load`] turns the recipes into
//! templates and fragments on a [`chimera_core::Realm`].
//!
//! ```rust,ignore
//! use chimera_roster::{BehaviorCatalog, Roster, RosterConfig};
//!
//! let config = RosterConfig::from_file("data/characters.toml")?;
//! let roster = Roster::new(&config, &BehaviorCatalog::with_builtins())?;
//!
//! let base = roster.spawn("character", [("name", "paladin1")])?;
//! let mut paladin = roster.assemble(&base, &["fighter", "mage"])?;
//! paladin.invoke("fight", &[])?;
//! paladin.invoke("cast", &[])?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod recipe;
pub mod roster;

pub use catalog::{BehaviorCatalog, BehaviorFactory};
pub use error::{RosterError, RosterResult};
pub use recipe::{MethodRecipe, RosterConfig, TemplateRecipe, TraitRecipe};
pub use roster::{Roster, TRAIT_TEMPLATE_PREFIX};
