//! # Roster
//!
//! A loaded set of templates and traits on top of a [`Realm`].
//!
//! Loading order:
//!
//! 0. Validation. Every method is bound, parents are ordered and every name
//!    is checked against the realm. Nothing is registered until this passes.
//! 1. Templates, parents before children. A parent may also be a template
//!    the realm already holds.
//! 2. Each template is published at its declared seal level (open when
//!    absent) right after definition, so children can delegate to it.
//! 3. Traits. Each trait is kept both as a [`Fragment`] for flattening and as
//!    a frozen `trait:<name>` template for chained composition. Both share the
//!    same method bodies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chimera_core::{
    Entity, Fragment, Member, ModelError, Realm, SealLevel, TemplateHandle, TemplateSpec, Value,
};

use crate::catalog::BehaviorCatalog;
use crate::error::{RosterError, RosterResult};
use crate::recipe::{MethodRecipe, RosterConfig, TemplateRecipe};

/// Registry prefix of the templates backing traits.
pub const TRAIT_TEMPLATE_PREFIX: &str = "trait:";

#[derive(Debug)]
struct LoadedTrait {
    fragment: Fragment,
    template: TemplateHandle,
}

/// Templates and traits loaded from recipes.
#[derive(Debug)]
pub struct Roster {
    realm: Arc<Realm>,
    templates: Vec<String>,
    traits: HashMap<String, LoadedTrait>,
}

impl Roster {
    /// Loads `config` into a fresh realm built from `config.model`.
    ///
    /// # Errors
    ///
    /// See [`Roster::load`].
    pub fn new(config: &RosterConfig, catalog: &BehaviorCatalog) -> RosterResult<Self> {
        Self::load(config, catalog, Arc::new(Realm::new(config.model.clone())))
    }

    /// Loads `config` into `realm`.
    ///
    /// Every recipe is bound and checked before the realm is touched, so a
    /// failed load leaves the realm as it was.
    ///
    /// # Errors
    ///
    /// - `ParentCycle` if template parents loop
    /// - `UnknownBehavior` / `BehaviorArgs` for unbindable methods
    /// - `Model` for duplicate names or parents the realm lacks
    pub fn load(
        config: &RosterConfig,
        catalog: &BehaviorCatalog,
        realm: Arc<Realm>,
    ) -> RosterResult<Self> {
        let ordered = parents_first(&config.templates)?;
        let template_members = ordered
            .iter()
            .map(|recipe| members(&recipe.fields, &recipe.methods, catalog))
            .collect::<RosterResult<Vec<_>>>()?;
        let trait_members = config
            .traits
            .iter()
            .map(|recipe| members(&recipe.fields, &recipe.methods, catalog))
            .collect::<RosterResult<Vec<_>>>()?;
        check_names(config, &realm)?;

        let mut templates = Vec::with_capacity(ordered.len());
        for (recipe, members) in ordered.into_iter().zip(template_members) {
            let mut spec = TemplateSpec::new();
            for (key, member) in members {
                spec = spec.member(key, member);
            }
            if let Some(parent) = &recipe.parent {
                spec = spec.parent(parent.as_str());
            }

            let handle = realm.define_template(recipe.name.as_str(), spec)?;
            let state = realm.publish(&handle, recipe.seal.unwrap_or(SealLevel::Open));
            tracing::debug!("Roster template `{}` loaded ({})", recipe.name, state);
            templates.push(recipe.name.clone());
        }

        let mut traits = HashMap::with_capacity(config.traits.len());
        for (recipe, members) in config.traits.iter().zip(trait_members) {
            let mut fragment = Fragment::named(recipe.name.as_str());
            let mut spec = TemplateSpec::new();
            for (key, member) in members {
                fragment.push(key.as_str(), member.clone());
                spec = spec.member(key, member);
            }

            let template = realm.define_template(trait_template_name(&recipe.name), spec)?;
            realm.freeze(&template);
            traits.insert(recipe.name.clone(), LoadedTrait { fragment, template });
        }

        tracing::info!(
            "Roster loaded: {} templates, {} traits",
            templates.len(),
            traits.len()
        );

        Ok(Self {
            realm,
            templates,
            traits,
        })
    }

    /// The realm the roster lives in.
    #[inline]
    #[must_use]
    pub const fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// Names of the templates this roster defined, parents first.
    #[must_use]
    pub fn template_names(&self) -> &[String] {
        &self.templates
    }

    /// Names of the loaded traits, sorted.
    #[must_use]
    pub fn trait_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.traits.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The current revision of a template in the realm.
    ///
    /// # Errors
    ///
    /// `Model(UnknownTemplate)` if the realm has no such template.
    pub fn template(&self, name: &str) -> RosterResult<TemplateHandle> {
        Ok(self.realm.registry().require(name)?)
    }

    /// The fragment of a trait.
    ///
    /// # Errors
    ///
    /// `UnknownTrait` if no such trait was loaded.
    pub fn fragment(&self, name: &str) -> RosterResult<&Fragment> {
        self.loaded(name).map(|t| &t.fragment)
    }

    /// The frozen template backing a trait.
    ///
    /// # Errors
    ///
    /// `UnknownTrait` if no such trait was loaded.
    pub fn trait_template(&self, name: &str) -> RosterResult<&TemplateHandle> {
        self.loaded(name).map(|t| &t.template)
    }

    /// Creates an entity delegating to the named template.
    ///
    /// # Errors
    ///
    /// `Model(UnknownTemplate)`, or `Model(InvalidOverrideKey)` in strict mode.
    pub fn spawn<I, K, V>(&self, template: &str, overrides: I) -> RosterResult<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let template = self.template(template)?;
        Ok(self.realm.create_entity(&template, overrides)?)
    }

    /// Flattens the named traits onto `base`.
    ///
    /// # Errors
    ///
    /// `UnknownTrait` for a name that was not loaded. Nothing is built then.
    pub fn assemble(&self, base: &Entity, traits: &[&str]) -> RosterResult<Entity> {
        let fragments = traits
            .iter()
            .map(|name| self.fragment(name))
            .collect::<RosterResult<Vec<_>>>()?;
        Ok(self.realm.compose(base, fragments))
    }

    /// Composes `base` with the named traits by delegation.
    ///
    /// # Errors
    ///
    /// `UnknownTrait` for a name that was not loaded. Nothing is built then.
    pub fn assemble_chained(&self, base: &Entity, traits: &[&str]) -> RosterResult<Entity> {
        let templates = traits
            .iter()
            .map(|name| self.trait_template(name))
            .collect::<RosterResult<Vec<_>>>()?;
        Ok(self.realm.compose_chained(base, templates))
    }

    fn loaded(&self, name: &str) -> RosterResult<&LoadedTrait> {
        self.traits
            .get(name)
            .ok_or_else(|| RosterError::UnknownTrait(name.to_string()))
    }
}

fn trait_template_name(name: &str) -> String {
    format!("{TRAIT_TEMPLATE_PREFIX}{name}")
}

/// Fields then methods, each bound through the catalog.
fn members(
    fields: &BTreeMap<String, Value>,
    methods: &BTreeMap<String, MethodRecipe>,
    catalog: &BehaviorCatalog,
) -> RosterResult<Vec<(String, Member)>> {
    let mut out: Vec<(String, Member)> = fields
        .iter()
        .map(|(key, value)| (key.clone(), Member::Field(value.clone())))
        .collect();
    for (key, method) in methods {
        let bound = catalog.build(key, &method.behavior, &method.with)?;
        out.push((key.clone(), Member::Method(bound)));
    }
    Ok(out)
}

/// Rejects names the realm or the config already uses, and parents that
/// neither the config nor the realm provides in published form.
fn check_names(config: &RosterConfig, realm: &Realm) -> RosterResult<()> {
    let registry = realm.registry();
    let mut names: HashSet<String> = HashSet::new();
    let declared = config
        .templates
        .iter()
        .map(|recipe| recipe.name.clone())
        .chain(config.traits.iter().map(|recipe| trait_template_name(&recipe.name)));
    for name in declared {
        if registry.contains(&name) || !names.insert(name.clone()) {
            return Err(ModelError::DuplicateTemplateName(name).into());
        }
    }

    for recipe in &config.templates {
        let Some(parent) = recipe.parent.as_deref() else {
            continue;
        };
        if config.templates.iter().any(|other| other.name == parent) {
            continue;
        }
        let published = registry
            .get(parent)
            .is_some_and(|handle| handle.state().is_published());
        if !published {
            return Err(ModelError::UnknownParent {
                template: recipe.name.clone(),
                parent: parent.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Orders recipes so every parent defined in `recipes` precedes its children.
fn parents_first(recipes: &[TemplateRecipe]) -> RosterResult<Vec<&TemplateRecipe>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut by_name: HashMap<&str, &TemplateRecipe> = HashMap::with_capacity(recipes.len());
    for recipe in recipes {
        if by_name.insert(recipe.name.as_str(), recipe).is_some() {
            return Err(ModelError::DuplicateTemplateName(recipe.name.clone()).into());
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(recipes.len());
    let mut ordered = Vec::with_capacity(recipes.len());

    for recipe in recipes {
        // Walk up to the first ancestor not yet placed, then place downwards.
        let mut path: Vec<&TemplateRecipe> = Vec::new();
        let mut cursor = Some(recipe);
        while let Some(current) = cursor {
            match marks.get(current.name.as_str()) {
                Some(Mark::Done) => break,
                Some(Mark::Visiting) => return Err(RosterError::ParentCycle(current.name.clone())),
                None => {}
            }
            marks.insert(current.name.as_str(), Mark::Visiting);
            path.push(current);
            cursor = current
                .parent
                .as_deref()
                .and_then(|parent| by_name.get(parent).copied());
        }
        for placed in path.into_iter().rev() {
            marks.insert(placed.name.as_str(), Mark::Done);
            ordered.push(placed);
        }
    }

    Ok(ordered)
}
