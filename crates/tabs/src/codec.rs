//! Interchange codec.
//!
//! The in-memory `Song` model is the only contract the reasoning core has
//! with notation files; this module moves songs in and out of the
//! tree-structured JSON interchange representation. Binary notation formats
//! are decoded elsewhere and arrive here already as `Song`s.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::song::Song;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed interchange data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("round-trip check failed for song '{0}'")]
    RoundTrip(String),
}

/// Decoder/encoder between notation files and the in-memory model.
pub trait NotationCodec {
    fn decode(&self, path: &Path) -> Result<Vec<Song>, CodecError>;
    fn encode(&self, songs: &[Song], target: &Path) -> Result<(), CodecError>;
}

/// JSON interchange codec. Lossless: `decode(encode(songs)) == songs`
/// structurally, rational durations included.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn decode_str(&self, data: &str) -> Result<Vec<Song>, CodecError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn encode_string(&self, songs: &[Song]) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(songs)?)
    }
}

impl NotationCodec for JsonCodec {
    fn decode(&self, path: &Path) -> Result<Vec<Song>, CodecError> {
        let data = fs::read_to_string(path).map_err(|source| CodecError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.decode_str(&data)
    }

    fn encode(&self, songs: &[Song], target: &Path) -> Result<(), CodecError> {
        let data = self.encode_string(songs)?;
        fs::write(target, data).map_err(|source| CodecError::Io {
            path: target.display().to_string(),
            source,
        })
    }
}

/// Encode and re-decode the songs, comparing structurally.
///
/// Batch ingestion uses this to reject files whose decoded form does not
/// survive the interchange representation; the failing song's title is
/// reported so the file can be skipped without aborting the batch.
pub fn verify_roundtrip(songs: &[Song]) -> Result<(), CodecError> {
    let codec = JsonCodec;
    let restored = codec.decode_str(&codec.encode_string(songs)?)?;

    for (original, decoded) in songs.iter().zip(restored.iter()) {
        if original != decoded {
            return Err(CodecError::RoundTrip(original.meta.title.clone()));
        }
    }
    if songs.len() != restored.len() {
        return Err(CodecError::RoundTrip("<song count>".into()));
    }
    Ok(())
}
