//! Codec Module
//!
//! Maps values to the single-string wire format and back:
//!
//! - payloads up to `max_uncompressed_size` bytes are stored as plain JSON
//! - larger payloads are stored as `"##compressed##" + base64(zlib(json))`
//!
//! The marker is the only format discriminator. JSON text never starts with
//! `#`, so a plain payload can not be mistaken for a compressed one.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::recorder::{NoopRecorder, Recorder};

/// Prefix marking a compressed payload.
pub const COMPRESSION_MARKER: &str = "##compressed##";

/// Default compression threshold (1 MiB).
pub const DEFAULT_MAX_UNCOMPRESSED_SIZE: usize = 1024 * 1024;

// == Codec Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value serializes to `null`; absent values are deleted, not cached
    #[error("Refusing to encode an absent value")]
    AbsentValue,

    #[error("Serialization failed: {0}")]
    Serialize(String),

    #[error("Malformed base64 payload: {0}")]
    Base64(String),

    #[error("Corrupt compressed payload: {0}")]
    Decompress(String),

    #[error("Malformed JSON payload: {0}")]
    Deserialize(String),
}

// == Codec ==
#[derive(Clone)]
pub struct Codec {
    max_uncompressed_size: usize,
    recorder: Arc<dyn Recorder>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("max_uncompressed_size", &self.max_uncompressed_size)
            .finish()
    }
}

impl Codec {
    pub fn new(max_uncompressed_size: usize) -> Self {
        Self {
            max_uncompressed_size,
            recorder: Arc::new(NoopRecorder),
        }
    }

    /// Routes compression fallback warnings to `recorder`.
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn max_uncompressed_size(&self) -> usize {
        self.max_uncompressed_size
    }

    // == Encode ==
    /// Serializes `value`, compressing when the JSON exceeds the threshold.
    ///
    /// A compression failure falls back to the plain JSON and is reported as
    /// a warning, never as an error.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CodecError> {
        let json = serde_json::to_string(value).map_err(|e| CodecError::Serialize(e.to_string()))?;
        if json == "null" {
            return Err(CodecError::AbsentValue);
        }

        if json.len() <= self.max_uncompressed_size {
            return Ok(json);
        }

        match compress(json.as_bytes()) {
            Ok(compressed) => Ok(format!("{}{}", COMPRESSION_MARKER, STANDARD.encode(compressed))),
            Err(e) => {
                warn!(size = json.len(), error = %e, "Compression failed, storing uncompressed");
                self.recorder
                    .warn("codec", &format!("compression failed, storing uncompressed: {}", e));
                Ok(json)
            }
        }
    }

    // == Decode ==
    /// Parses a raw payload. An empty payload is `Ok(None)`.
    pub fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<Option<T>, CodecError> {
        if raw.is_empty() {
            return Ok(None);
        }

        let value = match raw.strip_prefix(COMPRESSION_MARKER) {
            Some(payload) => {
                let compressed = STANDARD
                    .decode(payload)
                    .map_err(|e| CodecError::Base64(e.to_string()))?;
                let json = decompress(&compressed)?;
                serde_json::from_slice(&json)
            }
            None => serde_json::from_str(raw),
        }
        .map_err(|e| CodecError::Deserialize(e.to_string()))?;

        Ok(Some(value))
    }

    /// Returns true if `raw` carries the compression marker.
    pub fn is_compressed(raw: &str) -> bool {
        raw.starts_with(COMPRESSION_MARKER)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNCOMPRESSED_SIZE)
    }
}

fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;
    Ok(out)
}
