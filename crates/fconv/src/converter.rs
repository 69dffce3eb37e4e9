//! The conversion pipeline: decode, transform, encode.

use crate::codec::EncodeOptions;
use crate::format::{Compression, Format, InputFormat};
use crate::registry::Registry;
use crate::value::Value;
use std::borrow::{Borrow, Cow};
use tracing::debug;

/// Errors that can occur during conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("unsupported format '{name}'{}", did_you_mean(.suggestion))]
    UnsupportedFormat {
        name: String,
        suggestion: Option<&'static str>,
    },

    #[error("error parsing input as {format}: {message}")]
    Decode { format: InputFormat, message: String },

    #[error("error serializing as {format}: {message}")]
    Encode { format: Format, message: String },

    #[error("empty input")]
    EmptyInput,

    #[error("{compression} data is invalid: {message}")]
    Compression {
        compression: Compression,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn decode(format: impl Into<InputFormat>, err: impl std::fmt::Display) -> Self {
        ConvertError::Decode {
            format: format.into(),
            message: err.to_string(),
        }
    }

    pub fn encode(format: Format, err: impl std::fmt::Display) -> Self {
        ConvertError::Encode {
            format,
            message: err.to_string(),
        }
    }

    pub fn compression(compression: Compression, err: impl std::fmt::Display) -> Self {
        ConvertError::Compression {
            compression,
            message: err.to_string(),
        }
    }
}

fn did_you_mean(suggestion: impl Borrow<Option<&'static str>>) -> String {
    match suggestion.borrow() {
        Some(name) => format!("; did you mean '{name}'?"),
        None => String::new(),
    }
}

/// What to convert from and to.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub from: InputFormat,
    pub to: Format,
    pub options: EncodeOptions,
    /// Decompress the input first. When unset, xz input is recognized by magic.
    pub decompress: Option<Compression>,
    /// Compress the encoded output.
    pub compress: Option<Compression>,
}

impl ConvertRequest {
    pub fn new(from: impl Into<InputFormat>, to: Format) -> Self {
        Self {
            from: from.into(),
            to,
            ..Self::default()
        }
    }

    pub fn options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn decompress(mut self, compression: Compression) -> Self {
        self.decompress = Some(compression);
        self
    }

    pub fn compress(mut self, compression: Compression) -> Self {
        self.compress = Some(compression);
        self
    }
}

/// Result of a conversion.
#[derive(Debug)]
pub struct Conversion {
    /// Encoded (and possibly compressed) output.
    pub data: Vec<u8>,
    /// Format the input was decoded as.
    pub source_format: Format,
    /// Number of documents carried through.
    pub documents: usize,
    /// Compression removed from the input, if any.
    pub decompressed: Option<Compression>,
}

/// Runs conversions against the codecs in a registry.
pub struct Converter<'a> {
    registry: &'a Registry,
}

impl<'a> Converter<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Convert `input` as described by `req`.
    ///
    /// Every codec the request names is resolved before the input is looked
    /// at, and the output is fully built in memory before it is returned.
    pub fn convert(&self, input: &[u8], req: &ConvertRequest) -> Result<Conversion, ConvertError> {
        self.registry.get(req.to)?;
        if let InputFormat::Known(format) = req.from {
            self.registry.get(format)?;
        }
        if let Some(compression) = req.decompress {
            self.registry.get_compression(compression)?;
        }
        let compressor = req
            .compress
            .map(|c| self.registry.get_compression(c))
            .transpose()?;

        let (input, decompressed) = self.decompress(input, req.decompress)?;
        let (source_format, docs) = self.decode(&input, req.from)?;
        let documents = docs.len();
        let mut data = self.encode(docs, req.to, &req.options)?;

        if let Some(compressor) = compressor {
            data = compressor.compress(&data)?;
            debug!(compression = %compressor.compression(), bytes = data.len(), "compressed output");
        }

        Ok(Conversion {
            data,
            source_format,
            documents,
            decompressed,
        })
    }

    /// Decode `input` into its document stream.
    ///
    /// Fails with [`ConvertError::EmptyInput`] when there is nothing to
    /// decode: zero bytes, only whitespace for text or auto input, or a
    /// stream with no documents.
    pub fn decode(
        &self,
        input: &[u8],
        from: InputFormat,
    ) -> Result<(Format, Vec<Value>), ConvertError> {
        if is_empty_input(input, from) {
            return Err(ConvertError::EmptyInput);
        }

        let (format, docs) = match from {
            InputFormat::Known(format) => (format, self.registry.get(format)?.decode(input)?),
            InputFormat::Auto => self.detect(input)?,
        };

        if docs.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        debug!(%format, documents = docs.len(), bytes = input.len(), "decoded input");
        Ok((format, docs))
    }

    /// Encode a document stream, sorting keys first when the options ask for it.
    pub fn encode(
        &self,
        mut docs: Vec<Value>,
        to: Format,
        opts: &EncodeOptions,
    ) -> Result<Vec<u8>, ConvertError> {
        let codec = self.registry.get(to)?;
        if opts.sort_keys.applies_to(to) {
            docs.iter_mut().for_each(Value::sort_keys);
        }
        let data = codec.encode(&docs, opts)?;
        debug!(format = %to, bytes = data.len(), "encoded output");
        Ok(data)
    }

    fn decompress<'i>(
        &self,
        input: &'i [u8],
        explicit: Option<Compression>,
    ) -> Result<(Cow<'i, [u8]>, Option<Compression>), ConvertError> {
        let Some(compression) = explicit.or_else(|| Compression::sniff(input)) else {
            return Ok((Cow::Borrowed(input), None));
        };
        let transform = self.registry.get_compression(compression)?;
        let data = transform.decompress(input)?;
        debug!(%compression, from = input.len(), to = data.len(), "decompressed input");
        Ok((Cow::Owned(data), Some(compression)))
    }

    /// Try each registered format in turn: json, yaml, then msgpack.
    fn detect(&self, input: &[u8]) -> Result<(Format, Vec<Value>), ConvertError> {
        let mut errors = Vec::new();

        for format in Format::ALL {
            let Ok(codec) = self.registry.get(format) else {
                continue;
            };
            match codec.decode(input) {
                // Almost any byte string starts with a valid msgpack integer.
                Ok(docs) if format == Format::Msgpack && docs.first().is_some_and(Value::is_number) => {
                    errors.push(format!("{format}: decoded a bare number"));
                }
                Ok(docs) => {
                    debug!(%format, "detected input format");
                    return Ok((format, docs));
                }
                Err(ConvertError::Decode { message, .. }) => {
                    errors.push(format!("{format}: {message}"));
                }
                Err(other) => return Err(other),
            }
        }

        Err(ConvertError::Decode {
            format: InputFormat::Auto,
            message: errors.join("; "),
        })
    }
}

fn is_empty_input(input: &[u8], from: InputFormat) -> bool {
    match from {
        InputFormat::Known(format) if !format.is_text() => input.is_empty(),
        _ => input.iter().all(u8::is_ascii_whitespace),
    }
}
