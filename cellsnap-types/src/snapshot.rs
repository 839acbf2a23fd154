//! Snapshots and patches
//!
//! A snapshot is the flat, JSON-safe form of a set of cells: every cell's
//! serialized value keyed by its id, plus the anonymous-id counter. A patch is
//! the structural delta between two documents.

use crate::value::{Mapping, Value};
use crate::CellId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flat mapping from cell id to serialized cell value
pub type Document = IndexMap<CellId, Value>;

const NEXT_ID_KEY: &str = "nextId";
const OBSERVABLES_KEY: &str = "observables";

/// Serialized state of a set of cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Anonymous-id counter after the walk that produced this snapshot
    pub next_id: u64,

    /// Serialized cell values by id
    pub observables: Document,
}

impl Snapshot {
    pub fn new(next_id: u64, observables: Document) -> Self {
        Self {
            next_id,
            observables,
        }
    }

    /// Serialized value of a cell
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.observables.get(id)
    }

    pub fn len(&self) -> usize {
        self.observables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observables.is_empty()
    }

    /// Wire form of this snapshot as a document value
    pub fn to_value(&self) -> Value {
        let observables: Mapping = self
            .observables
            .iter()
            .map(|(id, value)| (id.0.clone(), value.clone()))
            .collect();

        let mut fields = Mapping::with_capacity(2);
        fields.insert(NEXT_ID_KEY.to_string(), Value::from(self.next_id));
        fields.insert(OBSERVABLES_KEY.to_string(), Value::Mapping(observables));
        Value::Mapping(fields)
    }
}

impl From<&Snapshot> for Value {
    fn from(snapshot: &Snapshot) -> Self {
        snapshot.to_value()
    }
}

impl TryFrom<Value> for Snapshot {
    type Error = FormatError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut fields = match value {
            Value::Mapping(fields) => fields,
            other => return Err(FormatError::NotAMapping(other.kind_name())),
        };

        let next_id = match fields.get(NEXT_ID_KEY) {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| FormatError::InvalidNextId(n.to_string()))?,
            Some(other) => return Err(FormatError::InvalidNextId(other.to_string())),
            None => return Err(FormatError::MissingField(NEXT_ID_KEY)),
        };

        let observables = match fields.swap_remove(OBSERVABLES_KEY) {
            Some(Value::Mapping(cells)) => cells
                .into_iter()
                .map(|(id, value)| (CellId(id), value))
                .collect(),
            Some(other) => return Err(FormatError::InvalidObservables(other.kind_name())),
            None => return Err(FormatError::MissingField(OBSERVABLES_KEY)),
        };

        Ok(Snapshot {
            next_id,
            observables,
        })
    }
}

/// Structural delta between two documents
///
/// `updates` mirrors the shape of the newer document but only holds changed
/// or added entries. A mapping entry whose value is `delete_marker` removes
/// that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(rename = "u")]
    pub updates: Value,

    #[serde(rename = "d")]
    pub delete_marker: String,
}

/// Errors raised when a value does not have the expected wire shape
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Expected a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid nextId: {0}")]
    InvalidNextId(String),

    #[error("Expected observables to be a mapping, found {0}")]
    InvalidObservables(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_wire_format() {
        let mut observables = Document::new();
        observables.insert(CellId::new("text"), Value::from("Hello session"));
        observables.insert(CellId::new("ref"), Value::reference("text"));
        let snapshot = Snapshot::new(0, observables);

        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"nextId":0,"observables":{"text":"Hello session","ref":{"$reference":"text"}}}"#
        );

        let parsed: Snapshot = serde_json::from_str(&serde_json::to_string(&snapshot).unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_value_conversion() {
        let value = Value::from(json!({
            "nextId": 2,
            "observables": { "$0": "anon", "main": { "$reference": "$0" } },
        }));

        let snapshot = Snapshot::try_from(value.clone()).unwrap();
        assert_eq!(snapshot.next_id, 2);
        assert_eq!(snapshot.get("main"), Some(&Value::reference("$0")));
        assert_eq!(snapshot.to_value(), value);
    }

    #[test]
    fn test_value_conversion_errors() {
        assert!(matches!(
            Snapshot::try_from(Value::from("nope")),
            Err(FormatError::NotAMapping("string"))
        ));
        assert!(matches!(
            Snapshot::try_from(Value::from(json!({ "observables": {} }))),
            Err(FormatError::MissingField("nextId"))
        ));
        assert!(matches!(
            Snapshot::try_from(Value::from(json!({ "nextId": -1, "observables": {} }))),
            Err(FormatError::InvalidNextId(_))
        ));
        assert!(matches!(
            Snapshot::try_from(Value::from(json!({ "nextId": 0, "observables": [] }))),
            Err(FormatError::InvalidObservables("sequence"))
        ));
    }

    #[test]
    fn test_patch_wire_format() {
        let patch = Patch {
            updates: Value::from(json!({ "b": "$del", "c": "c" })),
            delete_marker: "$del".to_string(),
        };

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, json!({ "u": { "b": "$del", "c": "c" }, "d": "$del" }));
    }
}
