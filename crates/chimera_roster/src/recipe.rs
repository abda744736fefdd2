//! # Roster Recipes
//!
//! The TOML schema for a roster file:
//!
//! ```toml
//! [model]
//! publish_seal = "frozen"
//!
//! [[template]]
//! name = "character"
//! seal = "frozen"
//! fields = { health = 100 }
//! methods = { getName = { behavior = "read_field", with = "name" } }
//!
//! [[template]]
//! name = "fighter"
//! parent = "character"
//! fields = { stamina = 100 }
//! methods = { fight = { behavior = "spend", with = ["stamina", "is fighting"] } }
//!
//! [[trait]]
//! name = "runner"
//! fields = { rootLocation = "oise" }
//! methods = { goesRunning = { behavior = "announce", with = "run along {rootLocation}" } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chimera_core::{ModelConfig, SealLevel, Value};
use serde::{Deserialize, Serialize};

use crate::error::{RosterError, RosterResult};

/// A whole roster file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterConfig {
    /// Model settings for a realm built from this roster.
    #[serde(default)]
    pub model: ModelConfig,
    /// Template recipes, in any order.
    #[serde(rename = "template", default)]
    pub templates: Vec<TemplateRecipe>,
    /// Trait recipes.
    #[serde(rename = "trait", default)]
    pub traits: Vec<TraitRecipe>,
}

impl RosterConfig {
    /// Parses a roster from TOML source.
    ///
    /// # Errors
    ///
    /// `Config` if the source is not valid TOML or does not match the schema.
    pub fn from_toml(source: &str) -> RosterResult<Self> {
        toml::from_str(source).map_err(|e| RosterError::Config(e.to_string()))
    }

    /// Reads and parses a roster file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> RosterResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }
}

/// A named template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateRecipe {
    /// Registry name.
    pub name: String,
    /// Parent template, defined in this roster or already in the realm.
    #[serde(default)]
    pub parent: Option<String>,
    /// Seal level applied once defined. Open when absent.
    #[serde(default)]
    pub seal: Option<SealLevel>,
    /// Default field values.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Methods by name.
    #[serde(default)]
    pub methods: BTreeMap<String, MethodRecipe>,
}

/// A named trait: members to layer onto entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraitRecipe {
    /// Trait name.
    pub name: String,
    /// Fields the trait adds.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Methods the trait adds.
    #[serde(default)]
    pub methods: BTreeMap<String, MethodRecipe>,
}

/// A method bound to a catalog behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodRecipe {
    /// Behavior name in the catalog.
    pub behavior: String,
    /// Argument handed to the behavior factory.
    #[serde(default)]
    pub with: Value,
}
