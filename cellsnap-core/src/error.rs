//! Errors raised while writing or reading snapshots

use cellsnap_types::CellId;

/// Errors that can occur during snapshot walks
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(
        "Unsupported value at {path}: found {found}, but observables can only contain \
         JSON serializable data and other observables"
    )]
    UnsupportedValue { path: String, found: String },

    #[error("Dangling reference: cell {from} refers to missing cell {target}")]
    DanglingReference { from: CellId, target: CellId },

    #[error("Cell id {0} is reserved for anonymous cells")]
    ReservedId(CellId),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
