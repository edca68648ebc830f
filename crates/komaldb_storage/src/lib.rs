//! # KomalDB Storage
//!
//! Byte storage backends for KomalDB.
//!
//! Backends are **opaque byte stores**: they hold the snapshot document and
//! the audit log without knowing anything about either format.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral databases
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use komaldb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"hello ").unwrap();
//! backend.append(b"world").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"hello world");
//!
//! backend.replace(b"fresh").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"fresh");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
