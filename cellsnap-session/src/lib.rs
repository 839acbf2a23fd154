//! Cellsnap session persistence
//!
//! Saves every cell of a registry as one JSON document under a storage key,
//! and restores it later so that cells created with the same ids pick up
//! their saved values.
//!
//! ```rust
//! use cellsnap_core::{CellOptions, ObservableRegistry};
//! use cellsnap_session::{MemoryStore, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default(), MemoryStore::new(), ObservableRegistry::new());
//! session.registry().observable("Hello session", CellOptions::named("text"));
//! session.save().unwrap();
//!
//! let cells = session.restore().unwrap();
//! assert_eq!(cells["text"].get().as_str(), Some("Hello session"));
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod store;

pub use config::{ConfigError, SessionConfig};
pub use error::{Result, SessionError};
pub use session::Session;
pub use store::{AnyStore, FileStore, KeyValueStore, MemoryStore, StoreError};
