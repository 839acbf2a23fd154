//! Tagged document values
//!
//! A document value is plain JSON data, except that any position may hold a
//! reference to another cell. On the wire a reference is the single-field
//! object `{"$reference": "<id>"}`.

use crate::CellId;
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;
use std::fmt;

/// Field name of the reference marker object
pub const REFERENCE_KEY: &str = "$reference";

/// Insertion-ordered mapping of a document value
pub type Mapping = IndexMap<String, Value>;

/// A JSON-shaped value that may contain cell references
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    /// Reference to another cell of the same document
    Reference(CellId),
}

impl Value {
    /// Build a value from a mapping, recognizing the reference marker shape
    pub fn from_mapping(mapping: Mapping) -> Value {
        let reference = match mapping.get(REFERENCE_KEY) {
            Some(Value::String(id)) if mapping.len() == 1 => Some(CellId::new(id.clone())),
            _ => None,
        };

        match reference {
            Some(id) => Value::Reference(id),
            None => Value::Mapping(mapping),
        }
    }

    pub fn reference(id: impl Into<CellId>) -> Value {
        Value::Reference(id.into())
    }

    /// Copy with every reference spelled out as its `{"$reference": id}`
    /// mapping, i.e. the value exactly as it reads on the wire
    pub fn to_plain(&self) -> Value {
        match self {
            Value::Reference(id) => {
                let mut mapping = Mapping::with_capacity(1);
                mapping.insert(REFERENCE_KEY.to_string(), Value::String(id.0.clone()));
                Value::Mapping(mapping)
            }
            Value::Sequence(items) => Value::Sequence(items.iter().map(Value::to_plain).collect()),
            Value::Mapping(mapping) => Value::Mapping(
                mapping
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_plain()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Collapse every reference-shaped mapping into a [`Value::Reference`],
    /// the form a value takes after a trip through JSON
    pub fn canonicalize(self) -> Value {
        match self {
            Value::Sequence(items) => {
                Value::Sequence(items.into_iter().map(Value::canonicalize).collect())
            }
            Value::Mapping(mapping) => Value::from_mapping(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key, value.canonicalize()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&CellId> {
        match self {
            Value::Reference(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Reference(_) => "reference",
        }
    }

    /// Visit every string value as it reads on the wire: string leaves,
    /// strings nested in sequences and mappings, and reference ids. Mapping
    /// keys are not visited.
    pub fn for_each_string<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Value::String(s) => f(s),
            Value::Reference(id) => f(id.as_str()),
            Value::Sequence(items) => {
                for item in items {
                    item.for_each_string(f);
                }
            }
            Value::Mapping(mapping) => {
                for value in mapping.values() {
                    value.for_each_string(f);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(mapping) => {
                let mut map = serializer.serialize_map(Some(mapping.len()))?;
                for (key, value) in mapping {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Reference(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REFERENCE_KEY, id)?;
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut mapping = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            mapping.insert(key, value);
        }
        Ok(Value::from_mapping(mapping))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::from_mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Mapping(mapping) => serde_json::Value::Object(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
            Value::Reference(id) => {
                let mut object = serde_json::Map::new();
                object.insert(REFERENCE_KEY.to_string(), serde_json::Value::String(id.0));
                serde_json::Value::Object(object)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Mapping> for Value {
    fn from(mapping: Mapping) -> Self {
        Value::Mapping(mapping)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}
