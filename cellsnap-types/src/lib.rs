//! Shared types for cellsnap
//!
//! This crate provides the value model shared across the cellsnap crates:
//! cell identifiers, the tagged document value, flat snapshots and patches,
//! together with their JSON wire format.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub mod equality;
pub mod snapshot;
pub mod value;

pub use equality::deep_equal;
pub use snapshot::{Document, FormatError, Patch, Snapshot};
pub use value::{Mapping, Value, REFERENCE_KEY};

/// Prefix shared by every machine-generated cell id
pub const ANONYMOUS_PREFIX: &str = "$";

/// Cell identifier
///
/// Named ids are chosen by the caller. Anonymous ids are generated during a
/// snapshot walk and always have the shape `$<digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the anonymous id for a counter value
    pub fn anonymous(counter: u64) -> Self {
        Self(format!("{ANONYMOUS_PREFIX}{counter}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this id lies in the anonymous namespace
    pub fn is_anonymous(&self) -> bool {
        is_anonymous_id(&self.0)
    }
}

/// Returns true if `id` has the shape of a generated anonymous id
pub fn is_anonymous_id(id: &str) -> bool {
    match id.strip_prefix(ANONYMOUS_PREFIX) {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CellId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        CellId(id.to_string())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        CellId(id)
    }
}
