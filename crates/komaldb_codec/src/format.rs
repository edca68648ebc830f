//! Document formats used for snapshots.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// On-disk document format.
///
/// Both formats are self-describing, so a snapshot can be decoded without
/// any schema. JSON is human-readable and the default; CBOR is compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// JSON text (`serde_json`).
    #[default]
    Json,
    /// CBOR binary (`ciborium`).
    Cbor,
}

impl Format {
    /// Short lowercase name of the format.
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Cbor => "cbor",
        }
    }

    /// File extension used for documents in this format.
    pub fn extension(self) -> &'static str {
        self.name()
    }

    /// Encode a document.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if the document contains data the
    /// format cannot represent (for example a non-finite float).
    pub fn encode<T: Serialize + ?Sized>(self, document: &T) -> CodecResult<Vec<u8>> {
        match self {
            Format::Json => serde_json::to_vec(document)
                .map_err(|e| CodecError::encoding_failed(self.name(), e.to_string())),
            Format::Cbor => {
                let mut buf = Vec::new();
                ciborium::ser::into_writer(document, &mut buf)
                    .map_err(|e| CodecError::encoding_failed(self.name(), e.to_string()))?;
                Ok(buf)
            }
        }
    }

    /// Decode a document.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodingFailed`] if the bytes are malformed or do
    /// not have the expected shape.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            Format::Json => serde_json::from_slice(bytes)
                .map_err(|e| CodecError::decoding_failed(self.name(), e.to_string())),
            Format::Cbor => ciborium::de::from_reader(bytes)
                .map_err(|e| CodecError::decoding_failed(self.name(), e.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "cbor" => Ok(Format::Cbor),
            other => Err(CodecError::decoding_failed(
                "format",
                format!("unknown format: {other}"),
            )),
        }
    }
}
