//! Session errors

use crate::config::ConfigError;
use crate::store::StoreError;
use cellsnap_core::SnapshotError;
use cellsnap_types::FormatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No session to restore")]
    NoSession,

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
