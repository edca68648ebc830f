//! # KomalDB Core
//!
//! Embedded key-value engine for KomalDB.
//!
//! This crate provides:
//! - A concurrent key-value store with per-key mutual exclusion
//! - Undo-log transactions, nestable
//! - Single-field secondary indexes maintained on every write
//! - Whole-store snapshot persistence
//! - A human-readable audit log
//!
//! ## Quick start
//!
//! ```
//! use komaldb_core::{Database, Value};
//!
//! let db = Database::open_in_memory().unwrap();
//!
//! db.set("greeting", "hello").unwrap();
//! db.begin();
//! db.transactional_set("greeting", "goodbye").unwrap();
//! db.rollback().unwrap();
//!
//! assert_eq!(db.get("greeting"), Some(Value::from("hello")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod config;
mod database;
mod dir;
mod error;
mod lock;
mod persistence;
mod store;
mod types;

pub mod index;
pub mod transaction;

pub use audit::{AuditLevel, AuditLog};
pub use config::{Config, DEFAULT_LOCK_SHARDS};
pub use database::Database;
pub use dir::DatabaseDir;
pub use error::{CoreError, CoreResult};
pub use index::{FieldIndex, IndexKey, IndexManager, IndexPolicy};
pub use lock::{KeyGuard, LockTable};
pub use persistence::Snapshotter;
pub use store::Store;
pub use transaction::{Frame, NestedCommit, TransactionManager, UndoRecord};
pub use types::TransactionId;

pub use komaldb_codec::{Format, Value};

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
