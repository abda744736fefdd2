//! # Entity Factory
//!
//! Builds entities in two modes:
//!
//! - **Delegating** ([`EntityFactory::create`]): overrides go into the own
//!   table, everything else (every method in particular) stays on the
//!   template and is reached by delegation. One method body serves every
//!   entity of the template.
//! - **Detached** ([`EntityFactory::create_detached`]): every member is
//!   copied into the own table and there is no delegation link.
//!
//! Creation is atomic: overrides are validated before anything is built.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::entity::{Entity, EntityId, MemberTable};
use super::guard;
use super::registry::TemplateRegistry;
use super::template::{Template, TemplateHandle};
use super::value::{Member, Value};
use crate::config::ModelConfig;
use crate::error::{ModelError, ModelResult};

/// Creates entities from templates or from plain member sets.
#[derive(Debug)]
pub struct EntityFactory {
    registry: Arc<TemplateRegistry>,
    config: ModelConfig,
    next_id: AtomicU64,
}

impl EntityFactory {
    /// Creates a factory bound to `registry`.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>, config: ModelConfig) -> Self {
        Self {
            registry,
            config,
            next_id: AtomicU64::new(0),
        }
    }

    /// The registry templates are resolved against.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// The factory configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Creates an entity delegating to the current revision of `template`.
    ///
    /// A draft template is published at the configured seal level first. An
    /// already published template keeps its level.
    ///
    /// # Errors
    ///
    /// In strict mode, `InvalidOverrideKey` if an override names a member that
    /// no template on the chain defines. Nothing is published or allocated in
    /// that case.
    pub fn create<I, K, V>(&self, template: &TemplateHandle, overrides: I) -> ModelResult<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let template = self.registry.current(template);
        let overrides: Vec<(String, Value)> = overrides
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        if self.config.strict_overrides {
            if let Some((key, _)) = overrides
                .iter()
                .find(|(key, _)| !template.chain().any(|t| t.defines(key)))
            {
                return Err(ModelError::InvalidOverrideKey {
                    template: template.name().to_string(),
                    key: key.clone(),
                });
            }
        }

        guard::publish_draft(&template, self.config.publish_seal);

        let own: MemberTable = overrides
            .into_iter()
            .map(|(k, v)| (k, Member::Field(v)))
            .collect();

        Ok(self.assemble(own, Some(template)))
    }

    /// Creates an entity with no delegation link whose own table is exactly
    /// `spec` (later duplicates win).
    pub fn create_detached<I, K, M>(&self, spec: I) -> Entity
    where
        I: IntoIterator<Item = (K, M)>,
        K: Into<String>,
        M: Into<Member>,
    {
        let own: MemberTable = spec
            .into_iter()
            .map(|(k, m)| (k.into(), m.into()))
            .collect();
        self.assemble(own, None)
    }

    /// Builds an entity from a ready own table and link.
    pub(crate) fn assemble(&self, own: MemberTable, link: Option<TemplateHandle>) -> Entity {
        if let Some(template) = &link {
            self.check_depth(template);
        }
        Entity::new(self.next_id(), own, link)
    }

    /// Logs chains longer than the recommended depth, once per revision.
    ///
    /// Returns true if this call logged.
    pub(crate) fn check_depth(&self, template: &Template) -> bool {
        let depth = template.depth();
        if depth <= self.config.recommended_chain_depth || !template.claim_depth_warning() {
            return false;
        }
        tracing::warn!(
            "Delegation chain of `{}` is {} levels deep (recommended: {})",
            template.name(),
            depth,
            self.config.recommended_chain_depth
        );
        true
    }

    fn next_id(&self) -> EntityId {
        EntityId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SealLevel, TemplateSpec, TemplateState};

    fn factory(config: ModelConfig) -> EntityFactory {
        EntityFactory::new(Arc::new(TemplateRegistry::new()), config)
    }

    #[test]
    fn test_create_copies_overrides_only() {
        let factory = factory(ModelConfig::default());
        let person = factory
            .registry()
            .define("person", TemplateSpec::new().field("name", "default").field("age", 0))
            .unwrap();

        let maud = factory.create(&person, [("name", "maud")]).unwrap();
        assert_eq!(maud.own_len(), 1);
        assert_eq!(maud.value("name"), Some(&Value::from("maud")));
        assert_eq!(maud.value("age"), Some(&Value::from(0)));
        assert_eq!(person.state(), TemplateState::Published(SealLevel::Open));
    }

    #[test]
    fn test_ids_are_unique() {
        let factory = factory(ModelConfig::default());
        let a = factory.create_detached(Vec::<(String, Value)>::new());
        let b = factory.create_detached(Vec::<(String, Value)>::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_strict_mode_rejects_unknown_keys_atomically() {
        let factory = factory(ModelConfig::default().strict());
        let person = factory
            .registry()
            .define("person", TemplateSpec::new().field("name", "default"))
            .unwrap();

        let err = factory
            .create(&person, [("name", Value::from("maud")), ("nickname", Value::from("mo"))])
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidOverrideKey {
                template: "person".to_string(),
                key: "nickname".to_string(),
            }
        );
        assert_eq!(person.state(), TemplateState::Draft);
    }

    #[test]
    fn test_default_mode_allows_new_keys() {
        let factory = factory(ModelConfig::default());
        let person = factory.registry().define("person", TemplateSpec::new()).unwrap();
        let entity = factory.create(&person, [("nickname", "mo")]).unwrap();
        assert_eq!(entity.value("nickname"), Some(&Value::from("mo")));
    }

    #[test]
    fn test_publish_seal_applies_on_create() {
        let factory = factory(ModelConfig::default().with_publish_seal(SealLevel::Frozen));
        let person = factory.registry().define("person", TemplateSpec::new()).unwrap();
        factory.create(&person, Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(person.state(), TemplateState::Published(SealLevel::Frozen));
    }

    #[test]
    fn test_create_keeps_explicit_seal() {
        let factory = factory(ModelConfig::default().with_publish_seal(SealLevel::Frozen));
        let person = factory.registry().define("person", TemplateSpec::new()).unwrap();
        factory.registry().publish(&person, SealLevel::Open);

        factory.create(&person, Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(person.state(), TemplateState::Published(SealLevel::Open));
    }

    #[test]
    fn test_create_uses_current_revision() {
        let factory = factory(ModelConfig::default());
        let v0 = factory
            .registry()
            .define("person", TemplateSpec::new().field("age", 0))
            .unwrap();
        factory.registry().write_member(&v0, "age", Value::from(18)).unwrap();

        let entity = factory.create(&v0, Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(entity.int("age").unwrap(), 18);
        assert_eq!(entity.template().map(|t| t.revision()), Some(1));
    }

    #[test]
    fn test_deep_chain_warns_once() {
        let factory = factory(ModelConfig::default().with_recommended_chain_depth(1));
        let registry = factory.registry();
        let being = registry.define("being", TemplateSpec::new()).unwrap();
        registry.publish(&being, SealLevel::Open);
        let person = registry
            .define("person", TemplateSpec::new().parent("being"))
            .unwrap();

        assert!(!factory.check_depth(&being));
        assert!(factory.check_depth(&person));
        factory.create(&person, Vec::<(String, Value)>::new()).unwrap();
        assert!(!factory.check_depth(&person));

        let revised = registry.write_member(&person, "age", Value::from(0)).unwrap();
        assert!(factory.check_depth(&revised));
    }
}
