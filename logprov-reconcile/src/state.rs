//! Attribute-level representation of remote resources.
//!
//! Desired and observed states share one shape: a map from attribute name to
//! [`AttrValue`]. The per-resource field mapping that fills these maps lives in
//! the CRUD layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single attribute value as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered list, compared element by element.
    List(Vec<AttrValue>),
    /// Unordered collection, compared as a set.
    Set(Vec<AttrValue>),
    /// Nested block.
    Object(AttributeMap),
}

impl AttrValue {
    /// Whether this value carries no information: null or an empty collection.
    pub fn is_empty_like(&self) -> bool {
        match self {
            AttrValue::Null => true,
            AttrValue::List(items) | AttrValue::Set(items) => items.is_empty(),
            AttrValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Render a scalar the way the remote API echoes it inside search
    /// expressions. Collections have no textual form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttrValue::Str(s) => Some(s.clone()),
            AttrValue::Int(i) => Some(i.to_string()),
            AttrValue::Float(f) => Some(f.to_string()),
            AttrValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

impl From<AttributeMap> for AttrValue {
    fn from(map: AttributeMap) -> Self {
        AttrValue::Object(map)
    }
}

/// Attribute name to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, AttrValue>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, AttrValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What the caller wants the remote resource to look like.
pub type DesiredState = AttributeMap;

/// A resource as last read from the remote platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedState {
    pub id: String,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl ObservedState {
    pub fn new(id: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }
}

/// Result of a single read: the resource was there, or it was not.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Present(ObservedState),
    Absent,
}

impl Observation {
    pub fn state(&self) -> Option<&ObservedState> {
        match self {
            Observation::Present(state) => Some(state),
            Observation::Absent => None,
        }
    }

    pub fn into_state(self) -> Option<ObservedState> {
        match self {
            Observation::Present(state) => Some(state),
            Observation::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Observation::Absent)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<ObservedState>,
    pub has_more: bool,
}

impl Page {
    pub fn last(items: Vec<ObservedState>) -> Self {
        Self {
            items,
            has_more: false,
        }
    }

    pub fn more(items: Vec<ObservedState>) -> Self {
        Self {
            items,
            has_more: true,
        }
    }
}
