//! # Behavior Catalog
//!
//! Recipes cannot carry code, so every method in a recipe names a behavior
//! from this catalog plus an optional `with` argument. A behavior is a
//! factory: given the argument, it builds the [`Method`] closure. Whatever the
//! factory captures stays private to the method and never becomes a member.
//!
//! ## Built-ins
//!
//! | Behavior     | `with`                         | Returns                               |
//! |--------------|--------------------------------|---------------------------------------|
//! | `read_field` | field name                     | the field's value                     |
//! | `describe`   | list of field names            | `"k=v, k=v"`                          |
//! | `greet`      | greeting                       | `"<greeting>, <name>"`                |
//! | `spend`      | `[resource, action]`           | `"<name> <action>"`, one resource less|
//! | `adjust`     | field name                     | field plus the first call argument    |
//! | `announce`   | text with `{field}` holes      | the filled-in text                    |
//! | `constant`   | any value                      | that value                            |

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chimera_core::{Entity, Method, ModelError, Value};

use crate::error::{RosterError, RosterResult};

/// Builds a method from its `with` argument.
pub type BehaviorFactory = Arc<dyn Fn(&Value) -> RosterResult<Method> + Send + Sync>;

/// Named method factories.
#[derive(Clone)]
pub struct BehaviorCatalog {
    behaviors: HashMap<String, BehaviorFactory>,
}

impl BehaviorCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Creates a catalog holding the built-in behaviors.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        catalog.register("read_field", read_field);
        catalog.register("describe", describe);
        catalog.register("greet", greet);
        catalog.register("spend", spend);
        catalog.register("adjust", adjust);
        catalog.register("announce", announce);
        catalog.register("constant", |with: &Value| {
            let value = with.clone();
            Ok(Method::new(move |_, _| Ok(value.clone())))
        });
        catalog
    }

    /// Registers a behavior, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> RosterResult<Method> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.behaviors.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::debug!("Behavior `{}` replaced", name);
        }
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }

    /// Registered behavior names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.behaviors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the method `method` from `behavior` and its argument.
    ///
    /// # Errors
    ///
    /// `UnknownBehavior` if the catalog lacks `behavior`, or whatever the
    /// factory rejects.
    pub fn build(&self, method: &str, behavior: &str, with: &Value) -> RosterResult<Method> {
        let factory = self
            .behaviors
            .get(behavior)
            .ok_or_else(|| RosterError::UnknownBehavior {
                method: method.to_string(),
                behavior: behavior.to_string(),
            })?;
        factory(with)
    }
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for BehaviorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorCatalog")
            .field("behaviors", &self.names())
            .finish()
    }
}

// ============================================================================
// BUILT-IN BEHAVIORS
// ============================================================================

fn text_arg(behavior: &str, with: &Value) -> RosterResult<String> {
    with.as_str()
        .map(str::to_string)
        .ok_or_else(|| RosterError::BehaviorArgs {
            behavior: behavior.to_string(),
            expected: "a string",
        })
}

fn text_list_arg(
    behavior: &str,
    with: &Value,
    expected: &'static str,
) -> RosterResult<Vec<String>> {
    let bad = || RosterError::BehaviorArgs {
        behavior: behavior.to_string(),
        expected,
    };
    with.as_list()
        .ok_or_else(bad)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(bad))
        .collect()
}

fn read_field(with: &Value) -> RosterResult<Method> {
    let field = text_arg("read_field", with)?;
    Ok(Method::new(move |me, _| Ok(me.value_or_null(&field))))
}

fn describe(with: &Value) -> RosterResult<Method> {
    let fields = text_list_arg("describe", with, "a list of field names")?;
    Ok(Method::new(move |me, _| {
        let parts: Vec<String> = fields
            .iter()
            .map(|field| format!("{field}={}", me.value_or_null(field)))
            .collect();
        Ok(Value::from(parts.join(", ")))
    }))
}

fn greet(with: &Value) -> RosterResult<Method> {
    let greeting = text_arg("greet", with)?;
    Ok(Method::new(move |me, _| {
        Ok(Value::from(format!("{greeting}, {}", me.text("name")?)))
    }))
}

fn spend(with: &Value) -> RosterResult<Method> {
    let args = text_list_arg("spend", with, "[resource, action]")?;
    let [resource, action] = <[String; 2]>::try_from(args).map_err(|_| RosterError::BehaviorArgs {
        behavior: "spend".to_string(),
        expected: "[resource, action]",
    })?;

    Ok(Method::new(move |me, _| {
        let left = me.int(&resource)?;
        if left <= 0 {
            return Err(ModelError::InvalidArgument(format!(
                "{} has no {} left",
                me.text("name")?,
                resource
            )));
        }
        me.set(resource.as_str(), left - 1);
        Ok(Value::from(format!("{} {}", me.text("name")?, action)))
    }))
}

fn adjust(with: &Value) -> RosterResult<Method> {
    let field = text_arg("adjust", with)?;
    Ok(Method::new(move |me, args| {
        let delta = args.first().and_then(Value::as_int).ok_or_else(|| {
            ModelError::InvalidArgument(format!("adjusting `{field}` needs an integer"))
        })?;
        let value = me.int(&field)?.checked_add(delta).ok_or_else(|| {
            ModelError::InvalidArgument(format!("adjusting `{field}` by {delta} overflows"))
        })?;
        me.set(field.as_str(), value);
        Ok(Value::from(value))
    }))
}

fn announce(with: &Value) -> RosterResult<Method> {
    let text = text_arg("announce", with)?;
    Ok(Method::new(move |me, _| Ok(Value::from(fill_placeholders(&text, me)))))
}

/// Replaces every `{field}` in `text` with the field's resolved value.
/// An unclosed brace is kept as is.
fn fill_placeholders(text: &str, me: &Entity) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                out.push_str(&me.value_or_null(&after[..close]).to_string());
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
