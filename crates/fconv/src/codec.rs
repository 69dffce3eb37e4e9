//! Codec traits and encoder options.

use crate::converter::ConvertError;
use crate::format::{Compression, Format};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decodes bytes of one format into a document stream.
pub trait Decoder: Send + Sync {
    /// Decode every top-level document in `input`.
    ///
    /// Returns an empty vector when the input holds no documents.
    fn decode(&self, input: &[u8]) -> Result<Vec<Value>, ConvertError>;
}

/// Encodes a document stream into bytes of one format.
pub trait Encoder: Send + Sync {
    fn encode(&self, docs: &[Value], opts: &EncodeOptions) -> Result<Vec<u8>, ConvertError>;
}

/// A decode + encode pair for one serialization format.
pub trait Codec: Decoder + Encoder {
    fn format(&self) -> Format;
}

/// A reversible transform over raw bytes (compression).
pub trait ByteTransform: Send + Sync {
    fn compression(&self) -> Compression;

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, ConvertError>;

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, ConvertError>;
}

/// Whether mappings get their keys sorted before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKeys {
    Yes,
    No,
    /// Sort for text targets, keep input order for binary ones.
    #[default]
    Auto,
}

impl SortKeys {
    pub fn applies_to(self, target: Format) -> bool {
        match self {
            SortKeys::Yes => true,
            SortKeys::No => false,
            SortKeys::Auto => target.is_text(),
        }
    }
}

impl FromStr for SortKeys {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" | "y" => Ok(SortKeys::Yes),
            "no" | "false" | "n" => Ok(SortKeys::No),
            "auto" => Ok(SortKeys::Auto),
            _ => Err(format!("invalid sort-keys value '{s}'. Use: yes, no, auto")),
        }
    }
}

/// Options for encoders. Each encoder reads the ones that apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Indent width for pretty output; 0 means compact JSON. YAML accepts
    /// 2 through 9 and uses 2 otherwise.
    pub indent: usize,
    pub sort_keys: SortKeys,
    /// When false, text encoders escape every non-ASCII character.
    pub allow_unicode: bool,
    /// Render scalar non-text mapping keys as text in JSON instead of failing.
    pub stringify_keys: bool,
    /// Emit ANSI color escapes.
    pub color: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            sort_keys: SortKeys::Auto,
            allow_unicode: true,
            stringify_keys: false,
            color: false,
        }
    }
}

impl EncodeOptions {
    pub fn compact() -> Self {
        Self {
            indent: 0,
            ..Self::default()
        }
    }
}
