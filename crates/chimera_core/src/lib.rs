//! # CHIMERA Core
//!
//! Entities built from shared templates and composable traits, without a
//! class hierarchy.
//!
//! ## Architecture Rules
//!
//! 1. **Share, don't copy** - Methods live on templates and are reached by delegation
//! 2. **Single chain** - A template has at most one parent, never a diamond
//! 3. **Published means immutable** - A template value never changes once handed out
//! 4. **Explicit receiver** - Every method gets the entity it runs on as its first argument
//!
//! ## Example
//!
//! ```rust,ignore
//! use chimera_core::{Method, Realm, TemplateSpec, Value};
//!
//! let realm = Realm::default();
//! let person = realm.define_template(
//!     "person",
//!     TemplateSpec::new()
//!         .field("name", "default")
//!         .field("age", 0)
//!         .method("getName", Method::new(|me, _| Ok(me.value_or_null("name")))),
//! )?;
//!
//! let mut maud = realm.create_entity(
//!     &person,
//!     [("name", Value::from("maud")), ("age", Value::from(26))],
//! )?;
//! assert_eq!(maud.invoke("getName", &[])?, Value::from("maud"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod model;

pub use config::ModelConfig;
pub use error::{ModelError, ModelResult};
pub use model::{
    freeze, resolve, seal, Chain, ChainedRecipe, Entity, EntityFactory, EntityId, Fragment, Lookup,
    Member, MemberTable, Method, Realm, SealLevel, Template, TemplateHandle, TemplateId,
    TemplateRegistry, TemplateSpec, TemplateState, TraitComposer, Value,
};
