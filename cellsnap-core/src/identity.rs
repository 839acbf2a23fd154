//! Identity assignment for snapshot walks
//!
//! Named cells keep their declared id. Anonymous cells get `$<n>` ids from a
//! counter, memoized per cell handle so that a cell reached twice in one walk
//! gets one id.

use crate::cell::{Cell, CellHandle};
use crate::error::{Result, SnapshotError};
use cellsnap_types::CellId;
use std::collections::HashMap;

/// Monotonic generator of anonymous ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdGenerator {
    next_id: u64,
}

impl IdGenerator {
    /// Start generating at `next_id`
    pub fn new(next_id: u64) -> Self {
        Self { next_id }
    }

    pub fn generate(&mut self) -> CellId {
        let id = CellId::anonymous(self.next_id);
        self.next_id += 1;
        id
    }

    /// The counter value the next generated id will use
    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}

/// Walk-scoped map from cell handle to assigned id
#[derive(Debug)]
pub struct IdCache {
    ids: HashMap<CellHandle, CellId>,
    generator: IdGenerator,
}

impl IdCache {
    pub fn new(next_id: u64) -> Self {
        Self {
            ids: HashMap::new(),
            generator: IdGenerator::new(next_id),
        }
    }

    /// Id of `cell`, generating one for an anonymous cell seen for the first time
    pub fn id_for(&mut self, cell: &Cell) -> Result<CellId> {
        if let Some(id) = cell.id() {
            if id.is_anonymous() {
                return Err(SnapshotError::ReservedId(id.clone()));
            }
            return Ok(id.clone());
        }

        let generator = &mut self.generator;
        Ok(self
            .ids
            .entry(cell.handle())
            .or_insert_with(|| generator.generate())
            .clone())
    }

    pub fn next_id(&self) -> u64 {
        self.generator.next_id()
    }
}
