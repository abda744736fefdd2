//! # Realm
//!
//! One registry, one factory and one composer wired together. This is the
//! library surface most callers want: everything is a method on [`Realm`].

use std::sync::Arc;

use super::composer::{ChainedRecipe, TraitComposer};
use super::entity::Entity;
use super::factory::EntityFactory;
use super::fragment::Fragment;
use super::guard::{self, SealLevel, TemplateState};
use super::registry::TemplateRegistry;
use super::resolver::{self, Lookup};
use super::template::{TemplateHandle, TemplateSpec};
use super::value::{Member, Value};
use crate::config::ModelConfig;
use crate::error::ModelResult;

/// The composable entity model behind a single handle.
///
/// # Example
///
/// ```rust,ignore
/// let realm = Realm::new(ModelConfig::default());
/// let person = realm.define_template("person", TemplateSpec::new().field("age", 0))?;
/// let maud = realm.create_entity(&person, [("age", 26)])?;
/// realm.freeze(&person);
/// ```
#[derive(Debug)]
pub struct Realm {
    registry: Arc<TemplateRegistry>,
    factory: Arc<EntityFactory>,
    composer: TraitComposer,
}

impl Realm {
    /// Creates an empty realm.
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        let registry = Arc::new(TemplateRegistry::new());
        let factory = Arc::new(EntityFactory::new(Arc::clone(&registry), config));
        let composer = TraitComposer::new(Arc::clone(&factory));
        Self {
            registry,
            factory,
            composer,
        }
    }

    /// The template registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// The entity factory.
    #[inline]
    #[must_use]
    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }

    /// The trait composer.
    #[inline]
    #[must_use]
    pub const fn composer(&self) -> &TraitComposer {
        &self.composer
    }

    /// The configuration this realm was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        self.factory.config()
    }

    /// Defines a template. See [`TemplateRegistry::define`].
    ///
    /// # Errors
    ///
    /// `DuplicateTemplateName` or `UnknownParent`.
    pub fn define_template(
        &self,
        name: impl Into<String>,
        spec: TemplateSpec,
    ) -> ModelResult<TemplateHandle> {
        self.registry.define(name, spec)
    }

    /// Creates an entity delegating to `template`. See [`EntityFactory::create`].
    ///
    /// # Errors
    ///
    /// `InvalidOverrideKey` in strict mode.
    pub fn create_entity<I, K, V>(
        &self,
        template: &TemplateHandle,
        overrides: I,
    ) -> ModelResult<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.factory.create(template, overrides)
    }

    /// Creates an entity with no delegation link.
    pub fn create_detached_entity<I, K, M>(&self, spec: I) -> Entity
    where
        I: IntoIterator<Item = (K, M)>,
        K: Into<String>,
        M: Into<Member>,
    {
        self.factory.create_detached(spec)
    }

    /// Flattening composition. See [`TraitComposer::compose`].
    pub fn compose<'f, I>(&self, base: &Entity, fragments: I) -> Entity
    where
        I: IntoIterator<Item = &'f Fragment>,
    {
        self.composer.compose(base, fragments)
    }

    /// Chained composition. See [`TraitComposer::compose_chained`].
    pub fn compose_chained<'t, I>(&self, base: &Entity, fragments: I) -> Entity
    where
        I: IntoIterator<Item = &'t TemplateHandle>,
    {
        self.composer.compose_chained(base, fragments)
    }

    /// The reusable recipe behind chained composition.
    pub fn recipe<'t, I>(&self, base: Option<&TemplateHandle>, fragments: I) -> ChainedRecipe
    where
        I: IntoIterator<Item = &'t TemplateHandle>,
    {
        self.composer.recipe(base, fragments)
    }

    /// Resolves a member on an entity.
    #[must_use]
    pub fn resolve<'a>(&self, entity: &'a Entity, member: &str) -> Lookup<'a> {
        resolver::resolve(entity, member)
    }

    /// Publishes a template explicitly.
    pub fn publish(&self, template: &TemplateHandle, level: SealLevel) -> TemplateState {
        self.registry.publish(template, level)
    }

    /// Freezes a template.
    pub fn freeze(&self, template: &TemplateHandle) -> TemplateState {
        guard::freeze(template)
    }

    /// Seals a template.
    pub fn seal(&self, template: &TemplateHandle) -> TemplateState {
        guard::seal(template)
    }

    /// Writes a member to a template. See [`TemplateRegistry::write_member`].
    ///
    /// # Errors
    ///
    /// `WriteToFrozenTemplate` or `UnknownTemplate`.
    pub fn write_template_member(
        &self,
        template: &TemplateHandle,
        key: impl Into<String>,
        member: impl Into<Member>,
    ) -> ModelResult<TemplateHandle> {
        self.registry.write_member(template, key, member)
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}
