// src/properties.rs

//! Input property values and their deterministic encoding.
//!
//! Every property value goes through [`PropertyValue`] before it can take
//! part in up-to-date checks. Values that have no stable encoding (NaN,
//! infinities, TOML datetimes) are rejected when the property is declared,
//! so hashing itself can never fail.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskstateError};
use crate::snapshot::hash::{ContentHash, StableHasher};

/// A finite `f64` with `-0.0` folded into `0.0`.
///
/// Equality and hashing use the bit pattern, which is sound once NaN is
/// excluded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FiniteFloat(f64);

impl FiniteFloat {
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for FiniteFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FiniteFloat {}

impl TryFrom<f64> for FiniteFloat {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("non-finite float {value}"))
    }
}

impl From<FiniteFloat> for f64 {
    fn from(f: FiniteFloat) -> Self {
        f.0
    }
}

/// A serializable input property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(FiniteFloat),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Feed the canonical encoding into `hasher`.
    ///
    /// Each value starts with a type tag; strings and containers are length
    /// prefixed; map entries are visited in key order.
    pub fn write_canonical(&self, hasher: &mut StableHasher) {
        match self {
            PropertyValue::Null => {
                hasher.tag(0);
            }
            PropertyValue::Bool(b) => {
                hasher.tag(1).tag(u8::from(*b));
            }
            PropertyValue::Integer(i) => {
                hasher.tag(2).u64(*i as u64);
            }
            PropertyValue::Float(f) => {
                hasher.tag(3).u64(f.get().to_bits());
            }
            PropertyValue::String(s) => {
                hasher.tag(4).str(s);
            }
            PropertyValue::List(items) => {
                hasher.tag(5).u64(items.len() as u64);
                for item in items {
                    item.write_canonical(hasher);
                }
            }
            PropertyValue::Map(map) => {
                hasher.tag(6).u64(map.len() as u64);
                for (k, v) in map {
                    hasher.str(k);
                    v.write_canonical(hasher);
                }
            }
        }
    }

    /// Convert a TOML value declared for property `name`.
    pub fn from_toml(name: &str, value: &toml::Value) -> Result<Self> {
        Ok(match value {
            toml::Value::String(s) => PropertyValue::String(s.clone()),
            toml::Value::Integer(i) => PropertyValue::Integer(*i),
            toml::Value::Float(f) => PropertyValue::Float(finite(name, *f)?),
            toml::Value::Boolean(b) => PropertyValue::Bool(*b),
            toml::Value::Datetime(dt) => {
                return Err(unsupported(
                    name,
                    format!("datetime {dt} has no stable encoding; quote it as a string"),
                ));
            }
            toml::Value::Array(items) => PropertyValue::List(
                items
                    .iter()
                    .map(|v| Self::from_toml(name, v))
                    .collect::<Result<_>>()?,
            ),
            toml::Value::Table(table) => PropertyValue::Map(
                table
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_toml(name, v)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

fn finite(name: &str, f: f64) -> Result<FiniteFloat> {
    FiniteFloat::new(f).ok_or_else(|| unsupported(name, format!("non-finite float {f}")))
}

fn unsupported(name: &str, detail: String) -> TaskstateError {
    TaskstateError::UnsupportedProperty {
        name: name.to_string(),
        detail,
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{}", x.get()),
            PropertyValue::String(s) => write!(f, "{s:?}"),
            PropertyValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            PropertyValue::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i64::from(i))
    }
}

/// Declared input properties of a task, keyed by unique property name.
///
/// Insertion order is irrelevant: the map is kept sorted, which is also the
/// order used for hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputProperties(BTreeMap<String, PropertyValue>);

impl InputProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build from a TOML table, rejecting unsupported values.
    pub fn from_toml_table(table: &toml::Table) -> Result<Self> {
        table
            .iter()
            .map(|(name, value)| Ok((name.clone(), PropertyValue::from_toml(name, value)?)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Self)
    }

    pub fn hash(&self) -> ContentHash {
        let mut hasher = StableHasher::new();
        hasher.u64(self.0.len() as u64);
        for (name, value) in &self.0 {
            hasher.str(name);
            value.write_canonical(&mut hasher);
        }
        hasher.finish()
    }

    /// Names of properties that were added, removed or changed relative to
    /// `previous`, sorted.
    pub fn changed_since(&self, previous: &InputProperties) -> Vec<String> {
        let mut names: Vec<String> = previous
            .0
            .iter()
            .filter(|(name, before)| self.0.get(*name) != Some(*before))
            .map(|(name, _)| name.clone())
            .chain(
                self.0
                    .keys()
                    .filter(|name| !previous.0.contains_key(*name))
                    .cloned(),
            )
            .collect();
        names.sort();
        names
    }
}

impl<K: Into<String>> FromIterator<(K, PropertyValue)> for InputProperties {
    fn from_iter<T: IntoIterator<Item = (K, PropertyValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_zero_is_folded() {
        let a = PropertyValue::Float(FiniteFloat::new(0.0).unwrap());
        let b = PropertyValue::Float(FiniteFloat::new(-0.0).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn toml_datetime_is_rejected() {
        let table: toml::Table = toml::from_str("built = 1979-05-27T07:32:00Z").unwrap();
        let err = InputProperties::from_toml_table(&table).unwrap_err();
        assert!(matches!(err, TaskstateError::UnsupportedProperty { ref name, .. } if name == "built"));
    }

    #[test]
    fn non_finite_toml_floats_are_rejected() {
        let table: toml::Table = toml::from_str("scale = nan\nlimit = [1.0, inf]").unwrap();
        for name in ["scale", "limit"] {
            let value = &table[name];
            let err = PropertyValue::from_toml(name, value).unwrap_err();
            assert!(matches!(err, TaskstateError::UnsupportedProperty { .. }), "{name}");
        }
    }

    #[test]
    fn changed_names_cover_added_removed_and_modified() {
        let before = InputProperties::new().with("a", 1).with("b", "x").with("c", true);
        let after = InputProperties::new().with("a", 1).with("b", "y").with("d", false);
        assert_eq!(after.changed_since(&before), vec!["b", "c", "d"]);
    }
}
