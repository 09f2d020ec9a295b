//! monalert-state: concurrent metric store and its durability.
//!
//! # Architecture
//!
//! ```text
//! MetricStore (Arc<RwLock<BTreeMap>>, Clone)
//!   ├── update() ← called per accepted sample
//!   ├── get()    ← value queries
//!   └── list_all() → sorted entries
//!
//! DurabilityManager
//!   ├── persist()     → SnapshotFile::write (temp file + rename)
//!   ├── restore()     ← SnapshotFile::read, absolute values
//!   ├── after_update() → persist() in synchronous mode
//!   └── run()         → periodic persist loop until shutdown
//! ```
//!
//! The store lock is never held across file I/O: persisting copies the
//! entries out first, then writes.

pub mod durability;
pub mod error;
pub mod snapshot;
pub mod store;

pub use durability::{DurabilityManager, PersistMode};
pub use error::{StateError, StateResult};
pub use snapshot::SnapshotFile;
pub use store::MetricStore;
