//! Registry of codecs and byte transforms.

use crate::codec::{ByteTransform, Codec};
use crate::converter::ConvertError;
use crate::format::{Compression, Format};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of available codecs.
///
/// Holds at most one codec per format and one transform per compression.
/// Registering again for the same key replaces the earlier entry.
#[derive(Clone, Default)]
pub struct Registry {
    codecs: IndexMap<Format, Arc<dyn Codec>>,
    compressions: IndexMap<Compression, Arc<dyn ByteTransform>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec under the format it reports.
    pub fn register(&mut self, codec: impl Codec + 'static) {
        self.codecs.insert(codec.format(), Arc::new(codec));
    }

    /// Register a compression transform.
    pub fn register_compression(&mut self, transform: impl ByteTransform + 'static) {
        self.compressions
            .insert(transform.compression(), Arc::new(transform));
    }

    /// Get the codec for a format.
    pub fn get(&self, format: Format) -> Result<Arc<dyn Codec>, ConvertError> {
        self.codecs
            .get(&format)
            .cloned()
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                name: format.name().to_string(),
                suggestion: None,
            })
    }

    /// Get the transform for a compression.
    pub fn get_compression(
        &self,
        compression: Compression,
    ) -> Result<Arc<dyn ByteTransform>, ConvertError> {
        self.compressions
            .get(&compression)
            .cloned()
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                name: compression.name().to_string(),
                suggestion: None,
            })
    }

    /// Formats with a registered codec, in registration order.
    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.codecs.keys().copied()
    }

    /// Compressions with a registered transform.
    pub fn compressions(&self) -> impl Iterator<Item = Compression> + '_ {
        self.compressions.keys().copied()
    }

    /// Whether a codec is registered for the format.
    pub fn supports(&self, format: Format) -> bool {
        self.codecs.contains_key(&format)
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Check if registry has no codecs.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
