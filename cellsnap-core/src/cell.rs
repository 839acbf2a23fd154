//! Reactive cell handles and the registry capability
//!
//! The snapshot engine treats cells as an external capability: a handle with
//! an identity, an optional stable id, a kind, a restore flag and a current
//! value. This module provides a minimal in-process implementation of that
//! surface. Computation and subscription are out of scope.

use cellsnap_types::CellId;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Number;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique identity of a cell handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellHandle(pub u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl CellHandle {
    fn next() -> Self {
        CellHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// What kind of subscribable a cell is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellKind {
    /// A writable value holder; the only kind that is snapshotted
    #[default]
    Observable,
    /// A derived value; never snapshotted
    Computed,
}

/// A payload that has no JSON representation (a callback, a foreign object)
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

/// The current value of a cell
#[derive(Debug, Clone, Default)]
pub enum LiveValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<LiveValue>),
    Record(IndexMap<String, LiveValue>),
    /// A nested cell
    Cell(Cell),
    /// A value that cannot be snapshotted
    Opaque(Opaque),
}

impl LiveValue {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        LiveValue::Opaque(Opaque::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&Cell> {
        match self {
            LiveValue::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[LiveValue]> {
        match self {
            LiveValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, LiveValue>> {
        match self {
            LiveValue::Record(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for LiveValue {
    fn from(s: &str) -> Self {
        LiveValue::String(s.to_string())
    }
}

impl From<String> for LiveValue {
    fn from(s: String) -> Self {
        LiveValue::String(s)
    }
}

impl From<bool> for LiveValue {
    fn from(b: bool) -> Self {
        LiveValue::Bool(b)
    }
}

impl From<i64> for LiveValue {
    fn from(n: i64) -> Self {
        LiveValue::Number(n.into())
    }
}

impl From<Cell> for LiveValue {
    fn from(cell: Cell) -> Self {
        LiveValue::Cell(cell)
    }
}

impl From<Vec<LiveValue>> for LiveValue {
    fn from(items: Vec<LiveValue>) -> Self {
        LiveValue::List(items)
    }
}

impl<K: Into<String>> FromIterator<(K, LiveValue)> for LiveValue {
    fn from_iter<I: IntoIterator<Item = (K, LiveValue)>>(iter: I) -> Self {
        LiveValue::Record(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<serde_json::Value> for LiveValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => LiveValue::Null,
            serde_json::Value::Bool(b) => LiveValue::Bool(b),
            serde_json::Value::Number(n) => LiveValue::Number(n),
            serde_json::Value::String(s) => LiveValue::String(s),
            serde_json::Value::Array(items) => {
                LiveValue::List(items.into_iter().map(LiveValue::from).collect())
            }
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, LiveValue::from(v)))
                .collect(),
        }
    }
}

/// Options for creating a cell
#[derive(Debug, Clone)]
pub struct CellOptions {
    pub id: Option<CellId>,
    pub kind: CellKind,
    pub restore: bool,
}

impl CellOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(id: impl Into<CellId>) -> Self {
        Self::default().with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<CellId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: CellKind) -> Self {
        self.kind = kind;
        self
    }

    /// Exclude the cell from snapshots unless another cell references it
    pub fn without_restore(mut self) -> Self {
        self.restore = false;
        self
    }
}

impl Default for CellOptions {
    fn default() -> Self {
        Self {
            id: None,
            kind: CellKind::Observable,
            restore: true,
        }
    }
}

#[derive(Debug)]
struct CellInner {
    handle: CellHandle,
    id: Option<CellId>,
    kind: CellKind,
    restore: bool,
    value: RwLock<LiveValue>,
}

/// A shared handle to a mutable value holder
///
/// Clones share the same cell. Cells may reference each other in cycles; such
/// cycles keep each other alive.
#[derive(Clone)]
pub struct Cell {
    inner: Arc<CellInner>,
}

impl Cell {
    pub fn new(value: impl Into<LiveValue>, options: CellOptions) -> Self {
        Cell {
            inner: Arc::new(CellInner {
                handle: CellHandle::next(),
                id: options.id,
                kind: options.kind,
                restore: options.restore,
                value: RwLock::new(value.into()),
            }),
        }
    }

    /// Create an anonymous observable
    pub fn observable(value: impl Into<LiveValue>) -> Self {
        Self::new(value, CellOptions::default())
    }

    /// Create an observable with a stable id
    pub fn named(id: impl Into<CellId>, value: impl Into<LiveValue>) -> Self {
        Self::new(value, CellOptions::named(id))
    }

    pub fn handle(&self) -> CellHandle {
        self.inner.handle
    }

    pub fn id(&self) -> Option<&CellId> {
        self.inner.id.as_ref()
    }

    pub fn kind(&self) -> CellKind {
        self.inner.kind
    }

    pub fn restore(&self) -> bool {
        self.inner.restore
    }

    /// Read the current value
    pub fn get(&self) -> LiveValue {
        self.inner.value.read().clone()
    }

    pub fn set(&self, value: impl Into<LiveValue>) {
        *self.inner.value.write() = value.into();
    }

    /// Returns true if both handles point at the same cell
    pub fn ptr_eq(&self, other: &Cell) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// Values may be cyclic through nested cells, so only identity is printed.
impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("handle", &self.inner.handle.0)
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .finish()
    }
}

/// The capability surface the snapshot engine needs from a cell library
pub trait CellRegistry {
    /// Every live subscribable, in registration order
    fn subscribables(&self) -> Vec<Cell>;

    /// Mark a restored cell as the baseline for its id
    fn register_initial(&self, cell: &Cell);

    /// Called before the cells of a new restore are registered. Anonymous
    /// cells registered by an earlier restore stop being roots; they stay
    /// reachable through any cell that still references them.
    fn begin_restore(&self) {}
}

#[derive(Debug, Default)]
struct RegistryState {
    cells: Vec<Cell>,
    /// Named cells by id; creating a cell with a registered id reuses it
    references: HashMap<CellId, Cell>,
    /// Baselines registered by a restore
    initial: HashMap<CellId, Cell>,
    /// Anonymous cells registered by the latest restore
    restored_anonymous: Vec<Cell>,
}

/// In-process cell registry
///
/// Named cells are de-duplicated by id: asking for an id that already has a
/// cell (or a restored baseline) returns the existing cell and ignores the
/// supplied value.
#[derive(Debug, Default)]
pub struct ObservableRegistry {
    state: Mutex<RegistryState>,
}

impl ObservableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or reuse a cell
    pub fn observable(&self, value: impl Into<LiveValue>, options: CellOptions) -> Cell {
        let mut state = self.state.lock();

        if let Some(id) = &options.id {
            if let Some(existing) = state.initial.get(id).or_else(|| state.references.get(id)) {
                return existing.clone();
            }
        }

        let cell = Cell::new(value, options);
        if let Some(id) = cell.id() {
            state.references.insert(id.clone(), cell.clone());
        }
        state.cells.push(cell.clone());
        cell
    }

    /// Look up a named cell
    pub fn get(&self, id: &str) -> Option<Cell> {
        let state = self.state.lock();
        state
            .initial
            .get(id)
            .or_else(|| state.references.get(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().cells.is_empty()
    }

    /// Forget every cell and baseline
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cells.clear();
        state.references.clear();
        state.initial.clear();
        state.restored_anonymous.clear();
    }
}

impl CellRegistry for ObservableRegistry {
    fn subscribables(&self) -> Vec<Cell> {
        self.state.lock().cells.clone()
    }

    fn register_initial(&self, cell: &Cell) {
        let mut state = self.state.lock();

        match cell.id() {
            Some(id) => {
                state.initial.insert(id.clone(), cell.clone());
                if let Some(previous) = state.references.insert(id.clone(), cell.clone()) {
                    if !previous.ptr_eq(cell) {
                        state.cells.retain(|c| !c.ptr_eq(&previous));
                    }
                }
            }
            None => {
                if !state.restored_anonymous.iter().any(|c| c.ptr_eq(cell)) {
                    state.restored_anonymous.push(cell.clone());
                }
            }
        }

        if !state.cells.iter().any(|c| c.ptr_eq(cell)) {
            state.cells.push(cell.clone());
        }
    }

    fn begin_restore(&self) {
        let mut state = self.state.lock();
        let released = std::mem::take(&mut state.restored_anonymous);
        state
            .cells
            .retain(|c| !released.iter().any(|r| r.ptr_eq(c)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_get_and_set() {
        let cell = Cell::named("count", 1i64);
        assert_eq!(cell.id(), Some(&CellId::new("count")));
        assert_eq!(cell.kind(), CellKind::Observable);
        assert!(cell.restore());

        cell.set("changed");
        assert_eq!(cell.get().as_str(), Some("changed"));
    }

    #[test]
    fn test_handles_are_unique() {
        let a = Cell::observable(LiveValue::Null);
        let b = Cell::observable(LiveValue::Null);
        assert_ne!(a.handle(), b.handle());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_self_referencing_cell_debug_terminates() {
        let cell = Cell::observable(LiveValue::Null);
        cell.set(cell.clone());
        let printed = format!("{:?}", cell);
        assert!(printed.starts_with("Cell"));
    }

    #[test]
    fn test_live_value_from_json() {
        let value = LiveValue::from(json!({ "a": [1, "two", null] }));
        let list = value.as_record().unwrap()["a"].as_list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].as_str(), Some("two"));
    }

    #[test]
    fn test_opaque_keeps_type_name() {
        let value = LiveValue::opaque(|| 42);
        match value {
            LiveValue::Opaque(opaque) => assert!(opaque.type_name().contains("closure")),
            other => panic!("expected opaque, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_reuses_named_cells() {
        let registry = ObservableRegistry::new();

        let first = registry.observable("first", CellOptions::named("text"));
        let second = registry.observable("ignored", CellOptions::named("text"));

        assert!(first.ptr_eq(&second));
        assert_eq!(second.get().as_str(), Some("first"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_prefers_registered_baseline() {
        let registry = ObservableRegistry::new();
        let stale = registry.observable("stale", CellOptions::named("text"));

        let restored = Cell::named("text", "restored");
        registry.register_initial(&restored);

        let reused = registry.observable("will be overridden", CellOptions::named("text"));
        assert!(reused.ptr_eq(&restored));
        assert!(!reused.ptr_eq(&stale));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_tracks_anonymous_cells() {
        let registry = ObservableRegistry::new();
        registry.observable(1i64, CellOptions::new());
        registry.observable(2i64, CellOptions::new());

        let restored = Cell::observable(3i64);
        registry.register_initial(&restored);
        registry.register_initial(&restored);

        assert_eq!(registry.subscribables().len(), 3);
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_new_restore_releases_earlier_anonymous_cells() {
        let registry = ObservableRegistry::new();
        let own = registry.observable("own", CellOptions::new());

        let first = Cell::observable("first");
        registry.begin_restore();
        registry.register_initial(&first);
        registry.register_initial(&Cell::named("pair", LiveValue::List(vec![first.into()])));

        let second = Cell::observable("second");
        registry.begin_restore();
        registry.register_initial(&second);
        registry.register_initial(&Cell::named("pair", LiveValue::List(vec![second.clone().into()])));

        let roots = registry.subscribables();
        assert_eq!(roots.len(), 3);
        assert!(roots.iter().any(|c| c.ptr_eq(&own)));
        assert!(roots.iter().any(|c| c.ptr_eq(&second)));
    }
}
