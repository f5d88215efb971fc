//! Named parameter bindings passed to the engine.

use std::collections::HashMap;

use crate::value::{BindValue, ToBindValue};

/// A mapping from parameter name to bind value.
///
/// ```rust
/// use twowaysql_core::Bindings;
///
/// let bindings = Bindings::new()
///     .bind("id", 42)
///     .bind("name", "alice")
///     .bind("tags", vec!["a", "b"]);
/// assert!(bindings.contains("id"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, BindValue>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, consuming and returning the set.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl ToBindValue) -> Self {
        self.values.insert(name.into(), value.to_bind_value());
        self
    }

    /// Inserts a binding in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToBindValue) {
        self.values.insert(name.into(), value.to_bind_value());
    }

    /// Looks up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BindValue> {
        self.values.get(name)
    }

    /// Returns true if the name is bound, regardless of polarity.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no bindings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds bindings from a JSON object; returns `None` for any other
    /// JSON shape.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut bindings = Self::new();
        for (name, v) in object {
            bindings.insert(name.clone(), BindValue::from(v.clone()));
        }
        Some(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_get() {
        let b = Bindings::new().bind("a", 1).bind("b", Option::<i32>::None);
        assert_eq!(b.get("a"), Some(&BindValue::Int(1)));
        assert_eq!(b.get("b"), Some(&BindValue::Null));
        assert_eq!(b.get("c"), None);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn from_json_object() {
        let b = Bindings::from_json(&serde_json::json!({"id": 7, "tags": ["x"]})).unwrap();
        assert_eq!(b.get("id"), Some(&BindValue::Int(7)));
        assert_eq!(
            b.get("tags"),
            Some(&BindValue::List(vec![BindValue::Text(String::from("x"))]))
        );
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(Bindings::from_json(&serde_json::json!([1, 2])).is_none());
    }
}
