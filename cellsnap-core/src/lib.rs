//! Cellsnap snapshot engine
//!
//! This crate turns a graph of reactive cells into a flat, JSON-safe
//! [`Snapshot`], rebuilds live cells from one, and computes minimal patches
//! between two snapshots.
//!
//! # Architecture
//!
//! ```text
//! live cells → writer → Snapshot → (stored) → reader → live cells
//! Snapshot, Snapshot → create_patch → Patch → apply_patch(older) → newer
//! ```
//!
//! ## Key Features
//!
//! - **Stable identity**: named cells keep their id, anonymous cells get
//!   `$<n>` ids from an explicit counter carried in the snapshot
//! - **Cycle safety**: shared and cyclic references are written once and
//!   restored to a single cell instance
//! - **Unambiguous deletion**: patches mark removed keys with a marker string
//!   chosen to never collide with data in the newer document
//!
//! # Example
//!
//! ```rust
//! use cellsnap_core::prelude::*;
//!
//! let anonymous = Cell::observable("shared");
//! let main = Cell::named("main", LiveValue::List(vec![anonymous.clone().into(), anonymous.into()]));
//!
//! let snapshot = snapshot_from_observables(vec![main], 0).unwrap();
//! assert_eq!(snapshot.next_id, 1);
//!
//! let cells = observables_from_snapshot(&snapshot).unwrap();
//! assert_eq!(cells.len(), 2);
//! ```

#![warn(missing_debug_implementations)]

pub mod cell;
pub mod error;
pub mod identity;
pub mod patch;
pub mod reader;
pub mod writer;

pub use cell::{
    Cell, CellHandle, CellKind, CellOptions, CellRegistry, LiveValue, ObservableRegistry, Opaque,
};
pub use cellsnap_types::{deep_equal, CellId, Document, Mapping, Patch, Snapshot, Value};
pub use error::{Result, SnapshotError};
pub use identity::{IdCache, IdGenerator};
pub use patch::{apply_patch, create_delete_marker, create_patch, is_empty_patch};
pub use reader::{named_observables_from_snapshot, observables_from_snapshot, SnapshotReader};
pub use writer::{snapshot_from_observables, SnapshotWriter};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cell::{Cell, CellOptions, CellRegistry, LiveValue, ObservableRegistry};
    pub use crate::patch::{apply_patch, create_patch};
    pub use crate::reader::observables_from_snapshot;
    pub use crate::writer::snapshot_from_observables;
    pub use cellsnap_types::{CellId, Patch, Snapshot, Value};
}
