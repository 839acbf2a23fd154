//! Snapshot writer
//!
//! Walks cell values and flattens the cell graph into a [`Snapshot`]: every
//! reachable observable is serialized exactly once under its id, and nested
//! cells are replaced by references to that id.

use crate::cell::{Cell, CellHandle, CellKind, LiveValue};
use crate::error::{Result, SnapshotError};
use crate::identity::IdCache;
use cellsnap_types::{CellId, Document, Mapping, Snapshot, Value, REFERENCE_KEY};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Stateful snapshot walk
///
/// Cells can be stored one at a time; ids assigned to anonymous cells are
/// shared across every `store` call of the same writer.
#[derive(Debug)]
pub struct SnapshotWriter {
    ids: IdCache,
    observables: Document,
    /// Cells stored or being stored, by assigned id
    owners: HashMap<CellId, CellHandle>,
}

impl SnapshotWriter {
    /// Create a writer whose anonymous ids start at `next_id`
    pub fn new(next_id: u64) -> Self {
        Self {
            ids: IdCache::new(next_id),
            observables: Document::new(),
            owners: HashMap::new(),
        }
    }

    /// Store `cell` and every cell reachable from its value, returning its id
    pub fn store(&mut self, cell: &Cell) -> Result<CellId> {
        let id = self.ids.id_for(cell)?;

        match self.owners.get(&id) {
            Some(owner) if *owner != cell.handle() => {
                warn!(id = %id, "two cells share a named id, keeping the first one");
                return Ok(id);
            }
            Some(_) => return Ok(id),
            None => {}
        }

        let mut path = vec![id.to_string()];
        check_kind(cell, &path)?;

        // Marked before the walk so cycles back to this cell terminate
        self.owners.insert(id.clone(), cell.handle());

        let value = self.to_value(&cell.get(), &mut path)?;
        self.observables.insert(id.clone(), value);
        Ok(id)
    }

    /// Finish the walk
    pub fn finish(self) -> Snapshot {
        Snapshot::new(self.ids.next_id(), self.observables)
    }

    pub fn next_id(&self) -> u64 {
        self.ids.next_id()
    }

    fn to_value(&mut self, value: &LiveValue, path: &mut Vec<String>) -> Result<Value> {
        let value = match value {
            LiveValue::Null => Value::Null,
            LiveValue::Bool(b) => Value::Bool(*b),
            LiveValue::Number(n) => Value::Number(n.clone()),
            LiveValue::String(s) => Value::String(s.clone()),
            LiveValue::List(items) => {
                let mut sequence = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(format!("[{index}]"));
                    sequence.push(self.to_value(item, path)?);
                    path.pop();
                }
                Value::Sequence(sequence)
            }
            LiveValue::Record(fields) => {
                let mut mapping = Mapping::with_capacity(fields.len());
                for (key, field) in fields {
                    path.push(format!(".{key}"));
                    mapping.insert(key.clone(), self.to_value(field, path)?);
                    path.pop();
                }
                if is_reference_shaped(&mapping) {
                    warn!(
                        path = %path.concat(),
                        "plain record has the shape of a reference and will restore as one"
                    );
                }
                Value::Mapping(mapping)
            }
            LiveValue::Cell(cell) => {
                check_kind(cell, path)?;
                Value::Reference(self.store(cell)?)
            }
            LiveValue::Opaque(opaque) => {
                return Err(SnapshotError::UnsupportedValue {
                    path: path.concat(),
                    found: opaque.type_name().to_string(),
                })
            }
        };

        Ok(value)
    }
}

fn check_kind(cell: &Cell, path: &[String]) -> Result<()> {
    match cell.kind() {
        CellKind::Observable => Ok(()),
        CellKind::Computed => Err(SnapshotError::UnsupportedValue {
            path: path.concat(),
            found: "computed cell".to_string(),
        }),
    }
}

fn is_reference_shaped(mapping: &Mapping) -> bool {
    mapping.len() == 1 && matches!(mapping.get(REFERENCE_KEY), Some(Value::String(_)))
}

/// Snapshot every restorable observable in `cells`
///
/// Named cells are processed in id order, followed by anonymous roots in
/// their enumeration order, so anonymous ids are reproducible for the same
/// input and starting counter.
pub fn snapshot_from_observables<I>(cells: I, next_id: u64) -> Result<Snapshot>
where
    I: IntoIterator<Item = Cell>,
{
    let mut roots: Vec<Cell> = cells
        .into_iter()
        .filter(|cell| cell.kind() == CellKind::Observable && cell.restore())
        .collect();

    roots.sort_by(|a, b| {
        a.id()
            .is_none()
            .cmp(&b.id().is_none())
            .then_with(|| a.id().cmp(&b.id()))
    });

    let mut writer = SnapshotWriter::new(next_id);
    for cell in &roots {
        writer.store(cell)?;
    }

    let snapshot = writer.finish();
    debug!(
        roots = roots.len(),
        cells = snapshot.len(),
        next_id = snapshot.next_id,
        "snapshot written"
    );
    Ok(snapshot)
}
