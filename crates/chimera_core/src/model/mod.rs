//! # Composable Entity Model
//!
//! Entities built from shared templates and composable traits.
//!
//! ## Design Philosophy
//!
//! - Templates are named bundles of default fields and methods, linked into a
//!   single-parent chain
//! - Entities own their fields and delegate everything else to one template
//! - Traits are plain fragments; they are either flattened into an entity or
//!   turned into a private template chain
//! - Lookups walk immutable data and never lock

mod composer;
mod entity;
mod factory;
mod fragment;
mod guard;
mod realm;
mod registry;
pub mod resolver;
mod template;
mod value;

pub use composer::{ChainedRecipe, TraitComposer};
pub use entity::{Entity, EntityId, MemberTable};
pub use factory::EntityFactory;
pub use fragment::Fragment;
pub use guard::{freeze, seal, SealLevel, TemplateState};
pub use realm::Realm;
pub use registry::TemplateRegistry;
pub use resolver::{resolve, Lookup};
pub use template::{Chain, Template, TemplateHandle, TemplateId, TemplateSpec};
pub use value::{Member, Method, Value};
