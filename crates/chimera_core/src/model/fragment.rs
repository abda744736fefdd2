//! # Trait Fragments
//!
//! A fragment is a standalone bundle of fields and methods used as input to
//! flattening composition. It has no delegation target and is never linked
//! to at runtime: its members are copied in.

use super::value::{Member, Method, Value};

/// An ordered bundle of members.
///
/// Keys may repeat; when the fragment is applied, later entries overwrite
/// earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    name: Option<String>,
    members: Vec<(String, Member)>,
}

impl Fragment {
    /// Creates an empty, unnamed fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty fragment with a name used in logs.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            members: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push((name.into(), Member::Field(value.into())));
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.members.push((name.into(), Member::Method(method)));
        self
    }

    /// Adds an already-built member.
    pub fn push(&mut self, name: impl Into<String>, member: impl Into<Member>) {
        self.members.push((name.into(), member.into()));
    }

    /// The fragment's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The member `name` would contribute (its last entry).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, member)| member)
    }

    /// Iterates entries in insertion order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the fragment has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<K, M> FromIterator<(K, M)> for Fragment
where
    K: Into<String>,
    M: Into<Member>,
{
    fn from_iter<I: IntoIterator<Item = (K, M)>>(iter: I) -> Self {
        Self {
            name: None,
            members: iter.into_iter().map(|(k, m)| (k.into(), m.into())).collect(),
        }
    }
}

impl IntoIterator for Fragment {
    type Item = (String, Member);
    type IntoIter = std::vec::IntoIter<(String, Member)>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_entry_wins() {
        let fragment = Fragment::named("runner").field("x", 1).field("x", 2);
        assert_eq!(fragment.len(), 2);
        assert_eq!(fragment.get("x"), Some(&Member::Field(Value::from(2))));
        assert_eq!(fragment.name(), Some("runner"));
    }

    #[test]
    fn test_from_iter() {
        let fragment: Fragment = [("a", Value::from(1)), ("b", Value::from(2))]
            .into_iter()
            .collect();
        assert_eq!(fragment.members().map(|(k, _)| k).collect::<Vec<_>>(), ["a", "b"]);
    }
}
