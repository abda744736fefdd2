//! # Trait Composer
//!
//! Layers capabilities onto an entity. Two strategies, chosen by the caller:
//!
//! ```text
//!  FLATTENING  compose(base, [f1, f2])
//!
//!    base view ─┐
//!    f1 ────────┼──▶ own table of a new, detached entity
//!    f2 ────────┘    (later wins, no shared storage)
//!
//!  CHAINING    compose_chained(base, [t1, t2])
//!
//!    entity ──▶ [base+t1+t2] ──▶ [base+t1] ──▶ base template ──▶ ...
//!               (private, frozen, cached per recipe)
//! ```
//!
//! Flattening gives independent entities at the cost of one member copy per
//! entity. Chaining builds the private chain once per distinct recipe; every
//! entity composed from the same recipe delegates to the same chain.
//!
//! Both strategies are last-write-wins, left to right.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::entity::{Entity, MemberTable};
use super::factory::EntityFactory;
use super::fragment::Fragment;
use super::guard;
use super::registry::TemplateRegistry;
use super::resolver;
use super::template::{Template, TemplateHandle, TemplateId};
use super::value::Value;
use crate::error::{ModelError, ModelResult};

/// Label of recipes without a base template.
const DETACHED_LABEL: &str = "<detached>";

/// Identity of a chained recipe: base revision plus fragment revisions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct RecipeKey {
    base: Option<TemplateId>,
    fragments: Vec<TemplateId>,
}

/// A cached recipe and the revisions it was built from.
#[derive(Debug)]
struct CachedRecipe {
    inputs: Vec<TemplateHandle>,
    recipe: ChainedRecipe,
}

impl CachedRecipe {
    /// True while every input is still its template's latest revision.
    fn is_current(&self, registry: &TemplateRegistry) -> bool {
        self.inputs
            .iter()
            .all(|input| TemplateHandle::ptr_eq(&registry.current(input), input))
    }
}

/// Composes entities from fragments and fragment templates.
///
/// The recipe cache holds one entry per combination of current input
/// revisions. Building a recipe evicts entries whose inputs have since been
/// revised.
#[derive(Debug)]
pub struct TraitComposer {
    factory: Arc<EntityFactory>,
    /// Private chain built for each recipe.
    recipes: Mutex<HashMap<RecipeKey, CachedRecipe>>,
}

impl TraitComposer {
    /// Creates a composer that builds entities through `factory`.
    #[must_use]
    pub fn new(factory: Arc<EntityFactory>) -> Self {
        Self {
            factory,
            recipes: Mutex::new(HashMap::new()),
        }
    }

    /// Flattens `base` and `fragments` into a new detached entity.
    ///
    /// The base contributes everything visible on it (its chain, then its own
    /// table), so the result is self-contained. Fragments are applied left to
    /// right; a later key replaces an earlier one.
    pub fn compose<'f, I>(&self, base: &Entity, fragments: I) -> Entity
    where
        I: IntoIterator<Item = &'f Fragment>,
    {
        let mut own: MemberTable = resolver::visible_members(base)
            .into_iter()
            .map(|(key, member)| (key.to_string(), member.clone()))
            .collect();

        for fragment in fragments {
            for (key, member) in fragment.members() {
                if let Some(previous) = own.insert(key.to_string(), member.clone()) {
                    if previous != *member {
                        tracing::debug!(
                            "Fragment {:?} overrides `{}`",
                            fragment.name().unwrap_or("<unnamed>"),
                            key
                        );
                    }
                }
            }
        }

        self.factory.assemble(own, None)
    }

    /// Composes `base` with `fragments` by delegation.
    ///
    /// The new entity copies `base`'s own table and delegates to a private
    /// chain: `base`'s template, then one frozen node per fragment template,
    /// the last fragment nearest. Entities composed from the same base
    /// template and fragment templates share that chain.
    pub fn compose_chained<'t, I>(&self, base: &Entity, fragments: I) -> Entity
    where
        I: IntoIterator<Item = &'t TemplateHandle>,
    {
        let recipe = self.recipe(base.template(), fragments);
        let own: MemberTable = base
            .own_members()
            .map(|(key, member)| (key.to_string(), member.clone()))
            .collect();
        self.factory.assemble(own, recipe.head)
    }

    /// Returns the chained recipe for `base` followed by `fragments`,
    /// building and caching it on first use.
    ///
    /// Draft inputs are published at the configured seal level: once a
    /// template feeds a recipe, it is shared.
    pub fn recipe<'t, I>(&self, base: Option<&TemplateHandle>, fragments: I) -> ChainedRecipe
    where
        I: IntoIterator<Item = &'t TemplateHandle>,
    {
        let registry = self.factory.registry();
        let base = base.map(|b| registry.current(b));
        let fragments: Vec<TemplateHandle> =
            fragments.into_iter().map(|f| registry.current(f)).collect();

        let key = RecipeKey {
            base: base.as_ref().map(|b| b.id()),
            fragments: fragments.iter().map(|f| f.id()).collect(),
        };

        let mut recipes = self.recipes.lock();
        if let Some(cached) = recipes.get(&key) {
            return cached.recipe.clone();
        }

        let cached = recipes.len();
        recipes.retain(|_, entry| entry.is_current(registry));
        let dropped = cached - recipes.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} recipes built from old revisions", dropped);
        }

        let seal = self.factory.config().publish_seal;
        for input in base.iter().chain(fragments.iter()) {
            guard::publish_draft(input, seal);
        }

        let mut label = base
            .as_ref()
            .map_or_else(|| DETACHED_LABEL.to_string(), |b| b.name().to_string());
        let inputs: Vec<TemplateHandle> = base.iter().chain(fragments.iter()).cloned().collect();
        let mut head = base;
        for fragment in &fragments {
            label.push('+');
            label.push_str(fragment.name());
            head = Some(Template::private(label.clone(), head, fragment.flattened()));
        }

        if let Some(head) = &head {
            self.factory.check_depth(head);
        }
        tracing::debug!(
            "Chained recipe built: `{}` ({} fragments)",
            label,
            fragments.len()
        );

        let recipe = ChainedRecipe {
            head,
            label,
            factory: Arc::clone(&self.factory),
        };
        recipes.insert(
            key,
            CachedRecipe {
                inputs,
                recipe: recipe.clone(),
            },
        );
        recipe
    }

    /// Number of cached recipes.
    #[must_use]
    pub fn recipe_count(&self) -> usize {
        self.recipes.lock().len()
    }

    /// Drops every cached recipe. Entities already built keep their chains.
    pub fn clear_recipes(&self) {
        self.recipes.lock().clear();
    }
}

/// A reusable chained composition: the head of a private template chain.
#[derive(Clone, Debug)]
pub struct ChainedRecipe {
    head: Option<TemplateHandle>,
    label: String,
    factory: Arc<EntityFactory>,
}

impl ChainedRecipe {
    /// The nearest template of the private chain. `None` when the recipe had
    /// neither a base template nor fragments.
    #[must_use]
    pub const fn head(&self) -> Option<&TemplateHandle> {
        self.head.as_ref()
    }

    /// Base name followed by every fragment name, joined by `+`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Length of the chain entities of this recipe delegate to.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.head.as_ref().map_or(0, |head| head.depth())
    }

    /// Stamps a new entity delegating to this recipe's chain.
    ///
    /// # Errors
    ///
    /// In strict mode, `InvalidOverrideKey` for keys the chain lacks. A recipe
    /// without a chain has no keys, so every override is rejected.
    pub fn instantiate<I, K, V>(&self, overrides: I) -> ModelResult<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let Some(head) = &self.head else {
            let overrides: Vec<(String, Value)> = overrides
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            if self.factory.config().strict_overrides {
                if let Some((key, _)) = overrides.first() {
                    return Err(ModelError::InvalidOverrideKey {
                        template: self.label.clone(),
                        key: key.clone(),
                    });
                }
            }
            return Ok(self.factory.create_detached(overrides));
        };
        self.factory.create(head, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::model::{Member, Method, TemplateRegistry, TemplateSpec};

    fn composer() -> TraitComposer {
        let registry = Arc::new(TemplateRegistry::new());
        TraitComposer::new(Arc::new(EntityFactory::new(registry, ModelConfig::default())))
    }

    fn registry(composer: &TraitComposer) -> &TemplateRegistry {
        composer.factory.registry()
    }

    #[test]
    fn test_compose_last_fragment_wins() {
        let composer = composer();
        let base = composer.factory.create_detached([("name", Value::from("base"))]);

        let one = Fragment::new().field("x", 1);
        let two = Fragment::new().field("x", 2);
        let composed = composer.compose(&base, [&one, &two]);

        assert_eq!(composed.int("x").unwrap(), 2);
        assert_eq!(composed.text("name").unwrap(), "base");
        assert!(composed.is_detached());

        let reversed = composer.compose(&base, [&two, &one]);
        assert_eq!(reversed.int("x").unwrap(), 1);
    }

    #[test]
    fn test_compose_flattens_base_chain() {
        let composer = composer();
        let person = registry(&composer)
            .define(
                "person",
                TemplateSpec::new()
                    .field("species", "human")
                    .method("getName", Method::new(|me, _| Ok(me.value_or_null("name")))),
            )
            .unwrap();
        let maud = composer.factory.create(&person, [("name", "maud")]).unwrap();

        let mut composed = composer.compose(&maud, Vec::<&Fragment>::new());
        assert!(composed.is_detached());
        assert!(matches!(composed.own("getName"), Some(Member::Method(_))));
        assert_eq!(composed.invoke("getName", &[]).unwrap(), Value::from("maud"));
        assert_eq!(composed.text("species").unwrap(), "human");
    }

    #[test]
    fn test_chained_recipe_is_shared() {
        let composer = composer();
        let registry = registry(&composer);
        let character = registry
            .define("character", TemplateSpec::new().field("health", 100))
            .unwrap();
        let fighter = registry
            .define("fighter", TemplateSpec::new().field("stamina", 100))
            .unwrap();
        let mage = registry
            .define("mage", TemplateSpec::new().field("aura", 100))
            .unwrap();

        let a = composer.factory.create(&character, [("name", "a")]).unwrap();
        let b = composer.factory.create(&character, [("name", "b")]).unwrap();

        let paladin_a = composer.compose_chained(&a, [&fighter, &mage]);
        let paladin_b = composer.compose_chained(&b, [&fighter, &mage]);

        assert_eq!(composer.recipe_count(), 1);
        let head_a = paladin_a.template().unwrap();
        let head_b = paladin_b.template().unwrap();
        assert!(TemplateHandle::ptr_eq(head_a, head_b));
        assert_eq!(head_a.name(), "character+fighter+mage");
        assert_eq!(head_a.depth(), 3);

        assert_eq!(paladin_a.int("stamina").unwrap(), 100);
        assert_eq!(paladin_a.int("aura").unwrap(), 100);
        assert_eq!(paladin_a.int("health").unwrap(), 100);
        assert_eq!(paladin_b.text("name").unwrap(), "b");
    }

    #[test]
    fn test_chained_later_fragment_wins() {
        let composer = composer();
        let registry = registry(&composer);
        let one = registry.define("one", TemplateSpec::new().field("x", 1)).unwrap();
        let two = registry.define("two", TemplateSpec::new().field("x", 2)).unwrap();

        let base = composer.factory.create_detached(Vec::<(String, Value)>::new());
        let entity = composer.compose_chained(&base, [&one, &two]);
        assert_eq!(entity.int("x").unwrap(), 2);
        assert!(one.state().is_published());
    }

    #[test]
    fn test_recipe_instantiate() {
        let composer = composer();
        let registry = registry(&composer);
        let fighter = registry
            .define("fighter", TemplateSpec::new().field("stamina", 100))
            .unwrap();

        let recipe = composer.recipe(None, [&fighter]);
        assert_eq!(recipe.depth(), 1);

        let gunar = recipe.instantiate([("name", "gunar")]).unwrap();
        assert_eq!(gunar.text("name").unwrap(), "gunar");
        assert_eq!(gunar.int("stamina").unwrap(), 100);

        let empty = composer.recipe(None, Vec::<&TemplateHandle>::new());
        assert!(empty.head().is_none());
        assert_eq!(empty.label(), "<detached>");
        assert!(empty.instantiate([("x", 1)]).unwrap().is_detached());
    }

    #[test]
    fn test_strict_empty_recipe_rejects_overrides() {
        let registry = Arc::new(TemplateRegistry::new());
        let factory = EntityFactory::new(registry, ModelConfig::default().strict());
        let composer = TraitComposer::new(Arc::new(factory));

        let empty = composer.recipe(None, Vec::<&TemplateHandle>::new());
        assert_eq!(
            empty.instantiate([("x", 1)]).unwrap_err(),
            ModelError::InvalidOverrideKey {
                template: "<detached>".to_string(),
                key: "x".to_string(),
            }
        );
        assert!(empty
            .instantiate(Vec::<(String, Value)>::new())
            .unwrap()
            .is_detached());
    }

    #[test]
    fn test_stale_recipes_are_evicted() {
        let composer = composer();
        let registry = registry(&composer);
        let fighter = registry
            .define("fighter", TemplateSpec::new().field("stamina", 100))
            .unwrap();
        let mage = registry
            .define("mage", TemplateSpec::new().field("aura", 100))
            .unwrap();

        let first = composer.recipe(None, [&fighter]);
        composer.recipe(None, [&mage]);
        assert_eq!(composer.recipe_count(), 2);

        let v0_shares = fighter.share_count();
        registry.write_member(&fighter, "stamina", Value::from(120)).unwrap();
        let second = composer.recipe(None, [&fighter]);
        assert_eq!(composer.recipe_count(), 2);
        assert!(fighter.share_count() < v0_shares);
        let fresh = second.instantiate([("name", "gunar")]).unwrap();
        let pinned = first.instantiate([("name", "gunar")]).unwrap();
        assert_eq!(fresh.int("stamina").unwrap(), 120);
        assert_eq!(pinned.int("stamina").unwrap(), 100);
    }

    #[test]
    fn test_new_revision_gets_new_recipe() {
        let composer = composer();
        let registry = registry(&composer);
        let fighter = registry
            .define("fighter", TemplateSpec::new().field("stamina", 100))
            .unwrap();

        let base = composer.factory.create_detached(Vec::<(String, Value)>::new());
        let before = composer.compose_chained(&base, [&fighter]);
        registry.write_member(&fighter, "stamina", Value::from(120)).unwrap();
        let after = composer.compose_chained(&base, [&fighter]);

        assert_eq!(composer.recipe_count(), 1);
        assert_eq!(before.int("stamina").unwrap(), 100);
        assert_eq!(after.int("stamina").unwrap(), 120);
    }
}
