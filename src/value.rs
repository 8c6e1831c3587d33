//! Nested value tree produced by dict reduction.
//!
//! Mirrors the xmltodict shape: an element with no attributes, children, or
//! text is `Null`; text-only elements are `Text`; anything richer is a `Map`
//! whose keys are `@`-prefixed attributes, child tags, and `#text`. Lists
//! arise only from scalar-to-list promotion on repeated sibling tags.

use indexmap::IndexMap;

/// A node in the reduced document tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty element.
    #[default]
    Null,

    /// Trimmed text content.
    Text(String),

    /// Attributes, children, and optional `#text`, in document order.
    Map(IndexMap<String, Value>),

    /// Repeated sibling values, in document order.
    List(Vec<Value>),
}

impl Value {
    /// Check if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as text.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a mapping.
    #[inline]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get as a list.
    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key in a mapping value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Nesting depth of the tree: `Null`/`Text` count 1, containers add 1
    /// per level.
    pub fn depth(&self) -> usize {
        match self {
            Value::Null | Value::Text(_) => 1,
            Value::Map(m) => 1 + m.values().map(Value::depth).max().unwrap_or(0),
            Value::List(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
