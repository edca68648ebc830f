//! # KomalDB Codec
//!
//! The structured value model and the document formats KomalDB uses for
//! snapshots.
//!
//! - [`Value`] is a JSON-like tree: null, bool, integer, float, text,
//!   array and object. Values compare structurally.
//! - [`Format`] encodes and decodes whole documents as JSON or CBOR.
//!
//! ## Usage
//!
//! ```
//! use komaldb_codec::{Format, Value};
//!
//! let value = Value::from_input(r#"{"email": "a@example.com"}"#);
//! assert_eq!(value.field("email"), Some(&Value::from("a@example.com")));
//!
//! let bytes = Format::Json.encode(&value).unwrap();
//! let decoded: Value = Format::Json.decode(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod format;
mod value;

pub use error::{CodecError, CodecResult};
pub use format::Format;
pub use value::Value;
