//! Session save and restore over a key-value store

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::store::{AnyStore, KeyValueStore};
use cellsnap_core::{
    apply_patch, create_patch, observables_from_snapshot, snapshot_from_observables, Cell,
    CellId, CellRegistry, ObservableRegistry, Patch, Snapshot, Value,
};
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, info};

/// Persists the cells of a registry under a single storage key
#[derive(Debug)]
pub struct Session<S, R> {
    config: SessionConfig,
    store: S,
    registry: R,
    id_base: u64,
}

impl Session<AnyStore, ObservableRegistry> {
    /// Session over a fresh registry and the store the config describes
    pub fn from_config(config: SessionConfig) -> Self {
        let store = config.open_store();
        Self::new(config, store, ObservableRegistry::new())
    }

    /// Load a YAML config file and open a session over it
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = SessionConfig::from_file(path)?;
        Ok(Self::from_config(config))
    }
}

impl<S: KeyValueStore, R: CellRegistry> Session<S, R> {
    pub fn new(config: SessionConfig, store: S, registry: R) -> Self {
        Self {
            config,
            store,
            registry,
            id_base: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Counter anonymous ids start from on the next walk
    pub fn id_base(&self) -> u64 {
        self.id_base
    }

    /// Snapshot every registered cell without storing it
    pub fn create_snapshot(&self) -> Result<Snapshot> {
        let snapshot = snapshot_from_observables(self.registry.subscribables(), self.id_base)?;
        Ok(snapshot)
    }

    /// Snapshot every registered cell and store it under the storage key
    pub fn save(&mut self) -> Result<Snapshot> {
        let snapshot = self.create_snapshot()?;
        let json = if self.config.pretty {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };

        self.store.set_item(&self.config.storage_key, &json)?;
        info!(
            key = %self.config.storage_key,
            cells = snapshot.len(),
            next_id = snapshot.next_id,
            "Saved session"
        );
        Ok(snapshot)
    }

    /// Load the stored snapshot and register its cells as the initial baseline
    pub fn restore(&mut self) -> Result<IndexMap<CellId, Cell>> {
        let key = self.config.storage_key.clone();
        let json = self.store.get_item(&key)?.ok_or(SessionError::NoSession)?;

        if self.config.remove_after_restore {
            self.store.remove_item(&key)?;
            debug!(key = %key, "Removed stored session");
        }

        let value: Value = serde_json::from_str(&json)?;
        let snapshot = Snapshot::try_from(value)?;
        let cells = self.restore_snapshot(&snapshot)?;

        info!(key = %key, cells = cells.len(), next_id = snapshot.next_id, "Restored session");
        Ok(cells)
    }

    /// Rebuild cells from a snapshot and register them as the initial baseline
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<IndexMap<CellId, Cell>> {
        let cells = observables_from_snapshot(snapshot)?;
        self.registry.begin_restore();
        for cell in cells.values() {
            self.registry.register_initial(cell);
        }
        self.id_base = snapshot.next_id;
        Ok(cells)
    }

    /// Patch turning `current` into `updated`
    pub fn diff_snapshots(&self, current: &Snapshot, updated: &Snapshot) -> Patch {
        create_patch(&current.to_value(), &updated.to_value())
    }

    /// Apply a patch produced by [`Session::diff_snapshots`]
    pub fn apply_snapshot_diff(&self, snapshot: &Snapshot, patch: &Patch) -> Result<Snapshot> {
        let value = apply_patch(&snapshot.to_value(), patch);
        Ok(Snapshot::try_from(value)?)
    }
}
