//! Snapshot reader
//!
//! Rebuilds live cells from a [`Snapshot`]. Cells are materialized lazily and
//! memoized by id, so every id yields exactly one cell no matter how many
//! references point at it, and cyclic references resolve to the same handle.

use crate::cell::{Cell, LiveValue};
use crate::error::{Result, SnapshotError};
use cellsnap_types::{CellId, Document, Snapshot, Value};
use indexmap::IndexMap;
use tracing::debug;

/// Read-scoped memo table over one document
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    document: &'a Document,
    cells: IndexMap<CellId, Cell>,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            cells: IndexMap::with_capacity(document.len()),
        }
    }

    /// Materialize every cell of the document
    pub fn read_all(mut self) -> Result<IndexMap<CellId, Cell>> {
        for id in self.document.keys() {
            self.materialize(id)?;
        }
        Ok(self.cells)
    }

    /// Return the cell for `id`, creating it on first use
    ///
    /// `id` must be a key of the document.
    pub fn materialize(&mut self, id: &CellId) -> Result<Cell> {
        if let Some(cell) = self.cells.get(id) {
            return Ok(cell.clone());
        }

        let document = self.document;
        let raw = document
            .get(id)
            .ok_or_else(|| SnapshotError::DanglingReference {
                from: id.clone(),
                target: id.clone(),
            })?;

        // Registered before resolving the value so references back to `id`
        // find this cell instead of recursing.
        let cell = if id.is_anonymous() {
            Cell::observable(LiveValue::Null)
        } else {
            Cell::named(id.clone(), LiveValue::Null)
        };
        self.cells.insert(id.clone(), cell.clone());

        let value = self.resolve(id, raw)?;
        cell.set(value);
        Ok(cell)
    }

    fn resolve(&mut self, owner: &CellId, raw: &Value) -> Result<LiveValue> {
        let value = match raw {
            Value::Null => LiveValue::Null,
            Value::Bool(b) => LiveValue::Bool(*b),
            Value::Number(n) => LiveValue::Number(n.clone()),
            Value::String(s) => LiveValue::String(s.clone()),
            Value::Sequence(items) => LiveValue::List(
                items
                    .iter()
                    .map(|item| self.resolve(owner, item))
                    .collect::<Result<_>>()?,
            ),
            Value::Mapping(mapping) => LiveValue::Record(
                mapping
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.resolve(owner, value)?)))
                    .collect::<Result<_>>()?,
            ),
            Value::Reference(target) => {
                if !self.document.contains_key(target) {
                    return Err(SnapshotError::DanglingReference {
                        from: owner.clone(),
                        target: target.clone(),
                    });
                }
                LiveValue::Cell(self.materialize(target)?)
            }
        };

        Ok(value)
    }
}

/// Rebuild every cell of `snapshot`, keyed by snapshot id
///
/// Named ids become cells with that id; anonymous ids become fresh anonymous
/// cells. The caller is expected to register the result as the new baseline.
pub fn observables_from_snapshot(snapshot: &Snapshot) -> Result<IndexMap<CellId, Cell>> {
    let cells = SnapshotReader::new(&snapshot.observables).read_all()?;
    debug!(cells = cells.len(), next_id = snapshot.next_id, "snapshot restored");
    Ok(cells)
}

/// Rebuild the cells of `snapshot` and return only the named ones
///
/// Anonymous cells are still created where named cells reference them.
pub fn named_observables_from_snapshot(snapshot: &Snapshot) -> Result<IndexMap<CellId, Cell>> {
    let mut cells = observables_from_snapshot(snapshot)?;
    cells.retain(|id, _| !id.is_anonymous());
    Ok(cells)
}
