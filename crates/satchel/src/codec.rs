//! Typed value ↔ byte buffer conversion.
//!
//! [`Payload`] is the single encoding seam the rest of the crate goes
//! through: [`Json`] wraps any serde type and encodes as JSON (optionally
//! pretty-printed), while [`RawBytes`] passes byte buffers through
//! unchanged in both directions.

use serde::de::DeserializeOwned;
use serde::Serialize;

// ==============================================================================
// Errors
// ==============================================================================

/// What went wrong while decoding, at the granularity callers can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    /// The input is not structurally valid (bad syntax, truncated document).
    Malformed,
    /// A required field was absent.
    MissingField,
    /// A field was present with an incompatible type or value.
    TypeMismatch,
    /// The input bytes are not a readable text encoding.
    Unreadable,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed at {path}: {message}")]
    Encode { path: String, message: String },

    #[error("decode failed at {path}: {message}")]
    Decode {
        path: String,
        kind: DecodeKind,
        message: String,
    },
}

impl CodecError {
    /// Dotted path of the field the failure occurred at (`.` for the root).
    pub fn path(&self) -> &str {
        match self {
            Self::Encode { path, .. } | Self::Decode { path, .. } => path,
        }
    }

    pub fn decode_kind(&self) -> Option<DecodeKind> {
        match self {
            Self::Decode { kind, .. } => Some(*kind),
            Self::Encode { .. } => None,
        }
    }
}

fn classify(err: &serde_json::Error) -> DecodeKind {
    match err.classify() {
        serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
            DecodeKind::Malformed
        }
        serde_json::error::Category::Io => DecodeKind::Unreadable,
        serde_json::error::Category::Data => {
            // serde's data errors are message-only; the stable prefixes
            // distinguish an absent field from a present-but-wrong one.
            if err.to_string().starts_with("missing field") {
                DecodeKind::MissingField
            } else {
                DecodeKind::TypeMismatch
            }
        }
    }
}

// ==============================================================================
// Payload
// ==============================================================================

/// A value that can cross the byte-buffer boundary.
pub trait Payload: Sized {
    fn encode(&self, pretty: bool) -> Result<Vec<u8>, CodecError>;
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

/// JSON-encoded payload over any serde type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> Payload for Json<T> {
    fn encode(&self, pretty: bool) -> Result<Vec<u8>, CodecError> {
        encode_value(&self.0, pretty)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode_value(bytes).map(Json)
    }
}

/// Identity payload: encoding returns the bytes unchanged, decoding takes
/// ownership of the source bytes unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl Payload for RawBytes {
    fn encode(&self, _pretty: bool) -> Result<Vec<u8>, CodecError> {
        Ok(self.0.clone())
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self(bytes.to_vec()))
    }
}

// ==============================================================================
// JSON helpers
// ==============================================================================

pub(crate) fn encode_value<T: Serialize>(value: &T, pretty: bool) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let result = if pretty {
        let mut ser = serde_json::Serializer::pretty(&mut out);
        serde_path_to_error::serialize(value, &mut ser)
    } else {
        let mut ser = serde_json::Serializer::new(&mut out);
        serde_path_to_error::serialize(value, &mut ser)
    };
    result.map_err(|err| CodecError::Encode {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })?;
    Ok(out)
}

pub(crate) fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    // JSON is UTF-8 by definition; reject unreadable input before parsing
    // so the failure classifies as such rather than as a syntax error.
    let text = std::str::from_utf8(bytes).map_err(|err| CodecError::Decode {
        path: ".".to_owned(),
        kind: DecodeKind::Unreadable,
        message: err.to_string(),
    })?;

    let mut de = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        CodecError::Decode {
            path,
            kind: classify(&inner),
            message: inner.to_string(),
        }
    })
}

/// Render a serde value as a JSON string.
pub fn to_json_text<T: Serialize>(value: &T, pretty: bool) -> Result<String, CodecError> {
    let bytes = encode_value(value, pretty)?;
    String::from_utf8(bytes).map_err(|err| CodecError::Encode {
        path: ".".to_owned(),
        message: err.to_string(),
    })
}

/// Parse a serde value back out of a JSON string.
pub fn from_json_text<T: DeserializeOwned>(json: &str) -> Result<T, CodecError> {
    decode_value(json.as_bytes())
}
