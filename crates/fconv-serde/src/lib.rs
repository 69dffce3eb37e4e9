//! Serde-based codecs for fconv.
//!
//! This crate provides the concrete codecs behind [`fconv::Format`] and the
//! compression transforms behind [`fconv::Compression`]. Enable them via
//! feature flags.
//!
//! # Features
//!
//! ## Text formats
//! - `json` (default) - JSON via serde_json, with indent, ASCII and color control
//! - `yaml` (default) - YAML via serde_yaml, multi-document aware
//!
//! ## Binary formats
//! - `msgpack` (default) - MessagePack via rmp-serde
//!
//! ## Compression
//! - `xz` - xz and legacy `.lzma` containers via liblzma
//!
//! ## Feature group
//! - `all` - Everything above

use fconv::{Compression, ConvertError, Format, Registry};

/// Register all enabled codecs and compressions with the registry.
pub fn register_all(registry: &mut Registry) {
    #[cfg(feature = "json")]
    registry.register(JsonCodec);
    #[cfg(feature = "yaml")]
    registry.register(YamlCodec);
    #[cfg(feature = "msgpack")]
    registry.register(MsgpackCodec);

    #[cfg(feature = "xz")]
    {
        registry.register_compression(XzTransform);
        registry.register_compression(LzmaTransform);
    }
}

/// A registry with every enabled codec.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    register_all(&mut registry);
    registry
}

/// Get list of enabled formats based on feature flags.
pub fn enabled_formats() -> Vec<Format> {
    [
        #[cfg(feature = "json")]
        Format::Json,
        #[cfg(feature = "yaml")]
        Format::Yaml,
        #[cfg(feature = "msgpack")]
        Format::Msgpack,
    ]
    .into()
}

/// Get list of enabled compressions based on feature flags.
pub fn enabled_compressions() -> Vec<Compression> {
    [
        #[cfg(feature = "xz")]
        Compression::Xz,
        #[cfg(feature = "xz")]
        Compression::Lzma,
    ]
    .into()
}

/// ANSI colors shared by the text encoders.
#[cfg(any(feature = "json", feature = "yaml"))]
mod palette {
    pub const KEY: &str = "\x1b[36m";
    pub const STRING: &str = "\x1b[32m";
    pub const NUMBER: &str = "\x1b[33m";
    pub const BOOL: &str = "\x1b[35m";
    pub const NULL: &str = "\x1b[39m";
    pub const RESET: &str = "\x1b[0m";
}

// ============================================
// JSON
// ============================================

#[cfg(feature = "json")]
mod json_impl {
    use super::*;
    use fconv::{Codec, Decoder, EncodeOptions, Encoder, Value};
    use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
    use serde_json::ser::{CompactFormatter, Formatter};
    use std::borrow::Cow;
    use std::io::{self, Write};

    /// JSON codec.
    ///
    /// Decoding accepts any number of whitespace-separated values, so JSON
    /// Lines input yields one document per line. Encoding writes each
    /// document followed by a newline.
    pub struct JsonCodec;

    impl Decoder for JsonCodec {
        fn decode(&self, input: &[u8]) -> Result<Vec<Value>, ConvertError> {
            serde_json::Deserializer::from_slice(input)
                .into_iter::<Value>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConvertError::decode(Format::Json, e))
        }
    }

    impl Encoder for JsonCodec {
        fn encode(&self, docs: &[Value], opts: &EncodeOptions) -> Result<Vec<u8>, ConvertError> {
            let mut out = Vec::new();
            for doc in docs {
                let formatter = JsonFormatter::new(opts);
                let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
                JsonValue {
                    value: doc,
                    stringify_keys: opts.stringify_keys,
                }
                .serialize(&mut ser)
                .map_err(|e| ConvertError::encode(Format::Json, e))?;
                out.push(b'\n');
            }
            Ok(out)
        }
    }

    impl Codec for JsonCodec {
        fn format(&self) -> Format {
            Format::Json
        }
    }

    /// A value checked against what JSON can hold while it is written.
    struct JsonValue<'a> {
        value: &'a Value,
        stringify_keys: bool,
    }

    impl<'a> JsonValue<'a> {
        fn child(&self, value: &'a Value) -> Self {
            Self {
                value,
                stringify_keys: self.stringify_keys,
            }
        }
    }

    impl Serialize for JsonValue<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self.value {
                Value::Float(n) if !n.is_finite() => {
                    Err(S::Error::custom(format!("{n} is not a valid JSON number")))
                }
                Value::Bytes(_) => Err(S::Error::custom("binary data cannot be represented in JSON")),
                Value::Array(items) => {
                    let mut seq = serializer.serialize_seq(Some(items.len()))?;
                    for item in items {
                        seq.serialize_element(&self.child(item))?;
                    }
                    seq.end()
                }
                Value::Map(map) => {
                    let mut out = serializer.serialize_map(Some(map.len()))?;
                    for (key, value) in map {
                        let key = json_key(key, self.stringify_keys).map_err(S::Error::custom)?;
                        out.serialize_entry(key.as_ref(), &self.child(value))?;
                    }
                    out.end()
                }
                scalar => scalar.serialize(serializer),
            }
        }
    }

    fn json_key(key: &Value, stringify: bool) -> Result<Cow<'_, str>, String> {
        let text = match key {
            Value::String(s) => return Ok(Cow::Borrowed(s)),
            _ if !stringify => None,
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::UInt(n) => Some(n.to_string()),
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                Some(format!("{n:.1}"))
            }
            Value::Float(n) if n.is_finite() => Some(n.to_string()),
            _ => None,
        };
        text.map(Cow::Owned)
            .ok_or_else(|| format!("mapping keys must be strings, found {}", key.type_name()))
    }

    const COLOR_KEY: &[u8] = palette::KEY.as_bytes();
    const COLOR_STRING: &[u8] = palette::STRING.as_bytes();
    const COLOR_NUMBER: &[u8] = palette::NUMBER.as_bytes();
    const COLOR_BOOL: &[u8] = palette::BOOL.as_bytes();
    const COLOR_NULL: &[u8] = palette::NULL.as_bytes();
    const COLOR_RESET: &[u8] = palette::RESET.as_bytes();

    /// Writes JSON with a configurable indent (0 for compact), optional
    /// `\uXXXX` escaping of non-ASCII text, and optional ANSI color.
    pub struct JsonFormatter {
        indent: usize,
        depth: usize,
        has_value: bool,
        ascii: bool,
        color: bool,
        in_key: bool,
    }

    impl JsonFormatter {
        pub fn new(opts: &EncodeOptions) -> Self {
            Self {
                indent: opts.indent,
                depth: 0,
                has_value: false,
                ascii: !opts.allow_unicode,
                color: opts.color,
                in_key: false,
            }
        }

        fn newline<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
            if self.indent == 0 {
                return Ok(());
            }
            writer.write_all(b"\n")?;
            for _ in 0..self.depth * self.indent {
                writer.write_all(b" ")?;
            }
            Ok(())
        }

        fn colored<W, F>(&self, writer: &mut W, color: &[u8], write: F) -> io::Result<()>
        where
            W: ?Sized + Write,
            F: FnOnce(&mut W) -> io::Result<()>,
        {
            if !self.color {
                return write(writer);
            }
            writer.write_all(color)?;
            write(&mut *writer)?;
            writer.write_all(COLOR_RESET)
        }
    }

    impl Formatter for JsonFormatter {
        fn write_null<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            self.colored(writer, COLOR_NULL, |w| w.write_all(b"null"))
        }

        fn write_bool<W: ?Sized + Write>(&mut self, writer: &mut W, value: bool) -> io::Result<()> {
            self.colored(writer, COLOR_BOOL, |w| {
                CompactFormatter.write_bool(w, value)
            })
        }

        fn write_i64<W: ?Sized + Write>(&mut self, writer: &mut W, value: i64) -> io::Result<()> {
            self.colored(writer, COLOR_NUMBER, |w| {
                CompactFormatter.write_i64(w, value)
            })
        }

        fn write_u64<W: ?Sized + Write>(&mut self, writer: &mut W, value: u64) -> io::Result<()> {
            self.colored(writer, COLOR_NUMBER, |w| {
                CompactFormatter.write_u64(w, value)
            })
        }

        fn write_f64<W: ?Sized + Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
            self.colored(writer, COLOR_NUMBER, |w| {
                CompactFormatter.write_f64(w, value)
            })
        }

        fn begin_string<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            if self.color {
                writer.write_all(if self.in_key { COLOR_KEY } else { COLOR_STRING })?;
            }
            writer.write_all(b"\"")
        }

        fn end_string<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            writer.write_all(b"\"")?;
            if self.color {
                writer.write_all(COLOR_RESET)?;
            }
            Ok(())
        }

        fn write_string_fragment<W: ?Sized + Write>(
            &mut self,
            writer: &mut W,
            fragment: &str,
        ) -> io::Result<()> {
            if !self.ascii || fragment.is_ascii() {
                return writer.write_all(fragment.as_bytes());
            }
            let mut units = [0u16; 2];
            for c in fragment.chars() {
                if c.is_ascii() {
                    writer.write_all(&[c as u8])?;
                } else {
                    for unit in c.encode_utf16(&mut units) {
                        write!(writer, "\\u{unit:04x}")?;
                    }
                }
            }
            Ok(())
        }

        fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            self.depth += 1;
            self.has_value = false;
            writer.write_all(b"[")
        }

        fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            self.depth -= 1;
            if self.has_value {
                self.newline(writer)?;
            }
            writer.write_all(b"]")
        }

        fn begin_array_value<W: ?Sized + Write>(
            &mut self,
            writer: &mut W,
            first: bool,
        ) -> io::Result<()> {
            if !first {
                writer.write_all(b",")?;
            }
            self.newline(writer)
        }

        fn end_array_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
            self.has_value = true;
            Ok(())
        }

        fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            self.depth += 1;
            self.has_value = false;
            writer.write_all(b"{")
        }

        fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            self.depth -= 1;
            if self.has_value {
                self.newline(writer)?;
            }
            writer.write_all(b"}")
        }

        fn begin_object_key<W: ?Sized + Write>(
            &mut self,
            writer: &mut W,
            first: bool,
        ) -> io::Result<()> {
            if !first {
                writer.write_all(b",")?;
            }
            self.in_key = true;
            self.newline(writer)
        }

        fn end_object_key<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
            self.in_key = false;
            Ok(())
        }

        fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
            if self.indent == 0 {
                writer.write_all(b":")
            } else {
                writer.write_all(b": ")
            }
        }

        fn end_object_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
            self.has_value = true;
            Ok(())
        }
    }
}

#[cfg(feature = "json")]
pub use json_impl::{JsonCodec, JsonFormatter};

// ============================================
// YAML
// ============================================

#[cfg(feature = "yaml")]
mod yaml_impl {
    use super::*;
    use fconv::{Codec, Decoder, EncodeOptions, Encoder, Map, Value};
    use serde::Deserialize;
    use std::fmt::Write as _;

    /// YAML codec.
    ///
    /// Multi-document streams decode to one document each; encoding separates
    /// documents with `---`. Output is block style and always UTF-8.
    pub struct YamlCodec;

    impl Decoder for YamlCodec {
        fn decode(&self, input: &[u8]) -> Result<Vec<Value>, ConvertError> {
            if !has_content(input) {
                return Ok(Vec::new());
            }
            serde_yaml::Deserializer::from_slice(input)
                .map(Value::deserialize)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConvertError::decode(Format::Yaml, e))
        }
    }

    impl Encoder for YamlCodec {
        fn encode(&self, docs: &[Value], opts: &EncodeOptions) -> Result<Vec<u8>, ConvertError> {
            let style = YamlStyle::new(opts);
            let mut out = String::new();
            for (i, doc) in docs.iter().enumerate() {
                if contains_bytes(doc) {
                    return Err(ConvertError::encode(
                        Format::Yaml,
                        "binary data cannot be represented in YAML",
                    ));
                }
                if i > 0 {
                    out.push_str("---\n");
                }
                if style.is_plain() {
                    out.push_str(&serde_yaml::to_string(doc).map_err(encode_error)?);
                } else {
                    style.write_document(&mut out, doc)?;
                }
            }
            Ok(out.into_bytes())
        }
    }

    impl Codec for YamlCodec {
        fn format(&self) -> Format {
            Format::Yaml
        }
    }

    /// Whether the stream holds anything besides comments, directives and
    /// document markers. serde_yaml reads such a stream as a single null.
    fn has_content(input: &[u8]) -> bool {
        let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
        input.split(|&b| b == b'\n').any(|line| {
            let line = line.trim_ascii();
            let line = line
                .strip_prefix(b"---")
                .or_else(|| line.strip_prefix(b"..."))
                .map_or(line, <[u8]>::trim_ascii_start);
            !(line.is_empty() || line.starts_with(b"#") || line.starts_with(b"%"))
        })
    }

    fn contains_bytes(value: &Value) -> bool {
        match value {
            Value::Bytes(_) => true,
            Value::Array(items) => items.iter().any(contains_bytes),
            Value::Map(map) => map.iter().any(|(k, v)| contains_bytes(k) || contains_bytes(v)),
            _ => false,
        }
    }

    fn encode_error(e: serde_yaml::Error) -> ConvertError {
        ConvertError::encode(Format::Yaml, e)
    }

    /// Block-style writer for the options serde_yaml has no knobs for: indent
    /// width, escaping non-ASCII text and ANSI color.
    ///
    /// Scalars are still rendered by serde_yaml so quoting stays the same;
    /// anything that would need a multi-line block scalar, or non-ASCII text
    /// under `allow_unicode = false`, is written double-quoted with escapes.
    struct YamlStyle {
        indent: usize,
        ascii: bool,
        color: bool,
    }

    impl YamlStyle {
        fn new(opts: &EncodeOptions) -> Self {
            // Block YAML needs at least two columns; widths past 9 fall back too.
            let indent = if (2..=9).contains(&opts.indent) { opts.indent } else { 2 };
            Self {
                indent,
                ascii: !opts.allow_unicode,
                color: opts.color,
            }
        }

        /// True when serde_yaml's own output already matches these options.
        fn is_plain(&self) -> bool {
            self.indent == 2 && !self.ascii && !self.color
        }

        fn write_document(&self, out: &mut String, doc: &Value) -> Result<(), ConvertError> {
            if is_block(doc) {
                self.write_block(out, doc, 0)
            } else {
                out.push_str(&self.scalar(doc)?);
                out.push('\n');
                Ok(())
            }
        }

        fn write_block(
            &self,
            out: &mut String,
            value: &Value,
            level: usize,
        ) -> Result<(), ConvertError> {
            match value {
                Value::Map(map) => self.write_map(out, map, level),
                Value::Array(items) => self.write_seq(out, items, level),
                _ => Ok(()),
            }
        }

        fn write_map(&self, out: &mut String, map: &Map, level: usize) -> Result<(), ConvertError> {
            for (key, value) in map {
                push_indent(out, level);
                out.push_str(&self.key(key)?);
                out.push(':');
                if is_block(value) {
                    out.push('\n');
                    self.write_block(out, value, level + self.indent)?;
                } else {
                    out.push(' ');
                    out.push_str(&self.scalar(value)?);
                    out.push('\n');
                }
            }
            Ok(())
        }

        fn write_seq(
            &self,
            out: &mut String,
            items: &[Value],
            level: usize,
        ) -> Result<(), ConvertError> {
            for item in items {
                push_indent(out, level);
                out.push_str("- ");
                if is_block(item) {
                    // The nested block starts on the dash line.
                    let mut nested = String::new();
                    self.write_block(&mut nested, item, level + 2)?;
                    out.push_str(&nested[level + 2..]);
                } else {
                    out.push_str(&self.scalar(item)?);
                    out.push('\n');
                }
            }
            Ok(())
        }

        fn key(&self, key: &Value) -> Result<String, ConvertError> {
            let text = match key {
                Value::Array(_) | Value::Map(_) => self.flow(key)?,
                Value::String(s) => self.text(s)?,
                scalar => plain_scalar(scalar)?,
            };
            Ok(self.paint(palette::KEY, text))
        }

        fn scalar(&self, value: &Value) -> Result<String, ConvertError> {
            Ok(match value {
                Value::Null => self.paint(palette::NULL, "null".to_string()),
                Value::Bool(_) => self.paint(palette::BOOL, plain_scalar(value)?),
                Value::Int(_) | Value::UInt(_) | Value::Float(_) => {
                    self.paint(palette::NUMBER, plain_scalar(value)?)
                }
                Value::String(s) => self.paint(palette::STRING, self.text(s)?),
                Value::Array(_) => "[]".to_string(),
                Value::Map(_) => "{}".to_string(),
                Value::Bytes(_) => {
                    return Err(ConvertError::encode(
                        Format::Yaml,
                        "binary data cannot be represented in YAML",
                    ));
                }
            })
        }

        /// A string as serde_yaml would write it, unless that takes more than
        /// one line or the text has to be escaped.
        fn text(&self, s: &str) -> Result<String, ConvertError> {
            let rendered = plain_scalar(&Value::String(s.to_owned()))?;
            if rendered.contains('\n') || (self.ascii && !s.is_ascii()) {
                Ok(double_quoted(s, self.ascii))
            } else {
                Ok(rendered)
            }
        }

        /// Single-line flow form, used for collection keys.
        fn flow(&self, value: &Value) -> Result<String, ConvertError> {
            Ok(match value {
                Value::Array(items) => {
                    let items = items
                        .iter()
                        .map(|item| self.flow(item))
                        .collect::<Result<Vec<_>, _>>()?;
                    format!("[{}]", items.join(", "))
                }
                Value::Map(map) => {
                    let entries = map
                        .iter()
                        .map(|(k, v)| Ok(format!("{}: {}", self.flow(k)?, self.flow(v)?)))
                        .collect::<Result<Vec<_>, ConvertError>>()?;
                    format!("{{{}}}", entries.join(", "))
                }
                Value::String(s) => double_quoted(s, self.ascii),
                scalar => plain_scalar(scalar)?,
            })
        }

        fn paint(&self, color: &str, text: String) -> String {
            if self.color {
                format!("{color}{text}{}", palette::RESET)
            } else {
                text
            }
        }
    }

    fn is_block(value: &Value) -> bool {
        match value {
            Value::Map(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => false,
        }
    }

    fn push_indent(out: &mut String, width: usize) {
        out.extend(std::iter::repeat_n(' ', width));
    }

    /// serde_yaml's rendering of a scalar, without the trailing newline.
    fn plain_scalar(value: &Value) -> Result<String, ConvertError> {
        let mut text = serde_yaml::to_string(value).map_err(encode_error)?;
        text.truncate(text.trim_end_matches('\n').len());
        Ok(text)
    }

    fn double_quoted(s: &str, ascii: bool) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                c if c.is_control() => {
                    let _ = write!(out, "\\u{:04x}", u32::from(c));
                }
                c if ascii && !c.is_ascii() => {
                    let code = u32::from(c);
                    let _ = if code <= 0xFFFF {
                        write!(out, "\\u{code:04x}")
                    } else {
                        write!(out, "\\U{code:08x}")
                    };
                }
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }
}

#[cfg(feature = "yaml")]
pub use yaml_impl::YamlCodec;

// ============================================
// MessagePack
// ============================================

#[cfg(feature = "msgpack")]
mod msgpack_impl {
    use super::*;
    use fconv::{Codec, Decoder, EncodeOptions, Encoder, Value};
    use serde::Deserialize;

    /// MessagePack codec. Concatenated objects decode to one document each.
    pub struct MsgpackCodec;

    impl Decoder for MsgpackCodec {
        fn decode(&self, input: &[u8]) -> Result<Vec<Value>, ConvertError> {
            let mut rest = input;
            let mut docs = Vec::new();
            while !rest.is_empty() {
                let offset = input.len() - rest.len();
                let doc = Value::deserialize(&mut rmp_serde::Deserializer::new(&mut rest))
                    .map_err(|e| {
                        ConvertError::decode(Format::Msgpack, format!("object at byte {offset}: {e}"))
                    })?;
                docs.push(doc);
            }
            tracing::trace!(documents = docs.len(), "read msgpack stream");
            Ok(docs)
        }
    }

    impl Encoder for MsgpackCodec {
        fn encode(&self, docs: &[Value], _opts: &EncodeOptions) -> Result<Vec<u8>, ConvertError> {
            let mut out = Vec::new();
            for doc in docs {
                rmp_serde::encode::write(&mut out, doc)
                    .map_err(|e| ConvertError::encode(Format::Msgpack, e))?;
            }
            Ok(out)
        }
    }

    impl Codec for MsgpackCodec {
        fn format(&self) -> Format {
            Format::Msgpack
        }
    }
}

#[cfg(feature = "msgpack")]
pub use msgpack_impl::MsgpackCodec;

// ============================================
// xz / lzma compression
// ============================================

#[cfg(feature = "xz")]
mod xz_impl {
    use super::*;
    use fconv::ByteTransform;
    use liblzma::read::{XzDecoder, XzEncoder};
    use liblzma::stream::{LzmaOptions, Stream};
    use std::io::Read;

    /// Compression preset used for both containers.
    const PRESET: u32 = 6;

    fn read_all(mut reader: impl Read, compression: Compression) -> Result<Vec<u8>, ConvertError> {
        let mut output = Vec::new();
        reader
            .read_to_end(&mut output)
            .map_err(|e| ConvertError::compression(compression, e))?;
        Ok(output)
    }

    /// The `.xz` container. Concatenated streams decompress as one.
    pub struct XzTransform;

    impl ByteTransform for XzTransform {
        fn compression(&self) -> Compression {
            Compression::Xz
        }

        fn compress(&self, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
            read_all(XzEncoder::new(input, PRESET), Compression::Xz)
        }

        fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
            read_all(XzDecoder::new_multi_decoder(input), Compression::Xz)
        }
    }

    /// The legacy `.lzma` ("alone") container.
    pub struct LzmaTransform;

    impl ByteTransform for LzmaTransform {
        fn compression(&self) -> Compression {
            Compression::Lzma
        }

        fn compress(&self, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
            let err = |e: liblzma::stream::Error| ConvertError::compression(Compression::Lzma, e);
            let options = LzmaOptions::new_preset(PRESET).map_err(err)?;
            let stream = Stream::new_lzma_encoder(&options).map_err(err)?;
            read_all(XzEncoder::new_stream(input, stream), Compression::Lzma)
        }

        fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
            let stream = Stream::new_lzma_decoder(u64::MAX)
                .map_err(|e| ConvertError::compression(Compression::Lzma, e))?;
            read_all(XzDecoder::new_stream(input, stream), Compression::Lzma)
        }
    }
}

#[cfg(feature = "xz")]
pub use xz_impl::{LzmaTransform, XzTransform};

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "xz")]
    use fconv::ByteTransform;
    #[allow(unused_imports)]
    use fconv::{
        ConvertRequest, Converter, Decoder, EncodeOptions, Encoder, InputFormat, Map, Value,
    };

    #[cfg(feature = "json")]
    fn json(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_enabled_formats_are_registered() {
        let registry = registry();
        assert_eq!(registry.formats().collect::<Vec<_>>(), enabled_formats());
        assert_eq!(
            registry.compressions().collect::<Vec<_>>(),
            enabled_compressions()
        );
    }

    #[test]
    #[cfg(all(feature = "json", feature = "yaml"))]
    fn test_json_to_yaml_round_trip() {
        let input = br#"{"a": 1, "b": [true, null, "x"]}"#;
        let docs = JsonCodec.decode(input).unwrap();
        let yaml = YamlCodec.encode(&docs, &EncodeOptions::default()).unwrap();

        let text = String::from_utf8(yaml.clone()).unwrap();
        assert!(text.contains("a: 1"));
        assert!(text.ends_with('\n'));

        let back = YamlCodec.decode(&yaml).unwrap();
        assert_eq!(back, docs);
        assert_eq!(back[0], json(r#"{"a": 1, "b": [true, null, "x"]}"#));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_truncated_json_is_decode_error() {
        let err = JsonCodec.decode(br#"{"a":"#).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
        assert!(err.to_string().starts_with("error parsing input as json"));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_lines() {
        let docs = JsonCodec.decode(b"1\n{\"a\": 2}\n[3]\n").unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0], Value::Int(1));

        let out = JsonCodec.encode(&docs, &EncodeOptions::compact()).unwrap();
        assert_eq!(out, b"1\n{\"a\":2}\n[3]\n");
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_indent() {
        let doc = json(r#"{"a": 1, "b": [true, null, "x"], "c": {}, "d": []}"#);

        let compact = JsonCodec.encode(&[doc.clone()], &EncodeOptions::compact()).unwrap();
        assert_eq!(
            String::from_utf8(compact).unwrap(),
            "{\"a\":1,\"b\":[true,null,\"x\"],\"c\":{},\"d\":[]}\n"
        );

        let pretty = JsonCodec.encode(&[doc.clone()], &EncodeOptions::default()).unwrap();
        assert_eq!(
            String::from_utf8(pretty).unwrap(),
            "{\n  \"a\": 1,\n  \"b\": [\n    true,\n    null,\n    \"x\"\n  ],\n  \"c\": {},\n  \"d\": []\n}\n"
        );

        let opts = EncodeOptions {
            indent: 4,
            ..EncodeOptions::default()
        };
        let wide = JsonCodec.encode(&[json(r#"{"a": 1}"#)], &opts).unwrap();
        assert_eq!(wide, b"{\n    \"a\": 1\n}\n");
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_ascii_escaping() {
        let doc = Value::from("caf\u{e9} \u{1f600}");

        let unicode = JsonCodec.encode(&[doc.clone()], &EncodeOptions::default()).unwrap();
        assert_eq!(String::from_utf8(unicode).unwrap(), "\"caf\u{e9} \u{1f600}\"\n");

        let opts = EncodeOptions {
            allow_unicode: false,
            ..EncodeOptions::default()
        };
        let ascii = JsonCodec.encode(&[doc], &opts).unwrap();
        assert_eq!(ascii, b"\"caf\\u00e9 \\ud83d\\ude00\"\n");
        assert_eq!(JsonCodec.decode(&ascii).unwrap()[0], Value::from("caf\u{e9} \u{1f600}"));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_color() {
        let opts = EncodeOptions {
            color: true,
            ..EncodeOptions::compact()
        };
        let out = JsonCodec.encode(&[json(r#"{"k": "v", "n": 1}"#)], &opts).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[36m\"k\"\x1b[0m"));
        assert!(text.contains("\x1b[32m\"v\"\x1b[0m"));
        assert!(text.contains("\x1b[33m1\x1b[0m"));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_rejects_non_text_keys() {
        let mut map = Map::new();
        map.insert(Value::Int(1), Value::from("one"));
        let doc = Value::Map(map);

        let err = JsonCodec.encode(&[doc.clone()], &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Encode { format: Format::Json, .. }));
        assert!(err.to_string().contains("mapping keys must be strings"));

        let opts = EncodeOptions {
            stringify_keys: true,
            ..EncodeOptions::compact()
        };
        let out = JsonCodec.encode(&[doc], &opts).unwrap();
        assert_eq!(out, b"{\"1\":\"one\"}\n");

        let mut map = Map::new();
        map.insert(Value::from(vec![1i64]), Value::Null);
        assert!(JsonCodec.encode(&[Value::Map(map)], &opts).is_err());
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_round_trip_nested() {
        let mut inner = Map::new();
        inner.insert(Value::from("neg_zero"), Value::Float(-0.0));
        inner.insert(Value::from("tenth"), Value::Float(0.1));
        inner.insert(Value::from("whole"), Value::Float(2.0));
        inner.insert(Value::from("big"), Value::UInt(u64::MAX));
        inner.insert(Value::from("small"), Value::Int(i64::MIN));
        let mut map = Map::new();
        map.insert(Value::from("sn\u{f8}w \u{2603} \u{1f600}"), Value::Map(inner));
        map.insert(
            Value::from("list"),
            Value::from(vec![Value::Null, Value::Bool(false), Value::from(vec![Value::from("")])]),
        );
        let docs = vec![Value::Map(map), Value::Int(3)];

        for opts in [
            EncodeOptions::default(),
            EncodeOptions::compact(),
            EncodeOptions {
                allow_unicode: false,
                ..EncodeOptions::default()
            },
        ] {
            let out = JsonCodec.encode(&docs, &opts).unwrap();
            assert_eq!(JsonCodec.decode(&out).unwrap(), docs, "{opts:?}");
        }
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_stringified_keys_come_back_as_text() {
        let mut map = Map::new();
        map.insert(Value::Int(1), Value::from("one"));
        map.insert(Value::Bool(true), Value::from("yes"));
        map.insert(Value::Float(2.5), Value::Null);
        let doc = Value::Map(map);

        let opts = EncodeOptions {
            stringify_keys: true,
            ..EncodeOptions::default()
        };
        let back = JsonCodec
            .decode(&JsonCodec.encode(&[doc.clone()], &opts).unwrap())
            .unwrap();

        assert_ne!(back[0], doc);
        assert_eq!(back[0], json(r#"{"1": "one", "true": "yes", "2.5": null}"#));
        assert_eq!(back[0].get("1"), Some(&Value::from("one")));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_rejects_bytes_and_nan() {
        let opts = EncodeOptions::default();
        assert!(JsonCodec.encode(&[Value::bytes(vec![1, 2])], &opts).is_err());
        assert!(JsonCodec.encode(&[Value::Float(f64::NAN)], &opts).is_err());
        assert!(JsonCodec.encode(&[Value::from(vec![f64::INFINITY])], &opts).is_err());
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_multi_document() {
        let docs = YamlCodec.decode(b"a: 1\n---\nb: 2\n").unwrap();
        assert_eq!(docs.len(), 2);

        let out = YamlCodec.encode(&docs, &EncodeOptions::default()).unwrap();
        assert_eq!(out, b"a: 1\n---\nb: 2\n");
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_without_documents() {
        assert!(YamlCodec.decode(b"# just a comment\n").unwrap().is_empty());
        assert!(YamlCodec.decode(b"---\n").unwrap().is_empty());
        assert!(YamlCodec.decode(b"%YAML 1.2\n--- # empty\n...\n").unwrap().is_empty());

        assert_eq!(YamlCodec.decode(b"null\n").unwrap(), vec![Value::Null]);
        assert_eq!(YamlCodec.decode(b"--- 1\n").unwrap(), vec![Value::Int(1)]);

        let registry = registry();
        let converter = Converter::new(&registry);
        for from in [InputFormat::Known(Format::Yaml), InputFormat::Auto] {
            let err = converter.decode(b"# just a comment\n", from).unwrap_err();
            assert!(matches!(err, ConvertError::EmptyInput), "{from}: {err}");
        }
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_indent_and_ascii() {
        let docs = YamlCodec
            .decode("a:\n  b: café\n  list: [1, {x: true}]\n  face: \u{1f600}\n".as_bytes())
            .unwrap();
        let opts = EncodeOptions {
            indent: 4,
            allow_unicode: false,
            ..EncodeOptions::default()
        };

        let out = YamlCodec.encode(&docs, &opts).unwrap();
        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "a:\n    b: \"caf\\u00e9\"\n    list:\n        - 1\n        - x: true\n    face: \"\\U0001f600\"\n"
        );
        assert_eq!(YamlCodec.decode(&out).unwrap(), docs);
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_styled_strings_round_trip() {
        let mut map = Map::new();
        map.insert(Value::from("text"), Value::from("one\ntwo \"quoted\" \\ tab\t"));
        map.insert(Value::from("looks like a number"), Value::from("123"));
        map.insert(
            Value::Int(7),
            Value::from(vec![Value::from(vec![1i64, 2]), Value::Map(Map::new())]),
        );
        map.insert(Value::from(vec![1i64, 2]), Value::Float(0.5));
        let docs = vec![Value::Map(map), Value::from("second")];

        let opts = EncodeOptions {
            indent: 3,
            ..EncodeOptions::default()
        };
        let out = YamlCodec.encode(&docs, &opts).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("7:\n   - - 1\n     - 2\n   - {}\n"));
        assert!(text.contains("[1, 2]: 0.5\n"));
        assert_eq!(YamlCodec.decode(&out).unwrap(), docs);
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_color() {
        let docs = YamlCodec.decode(b"k: v\nn: 1\nz: null\nt: true\n").unwrap();
        let opts = EncodeOptions {
            color: true,
            ..EncodeOptions::default()
        };
        let text = String::from_utf8(YamlCodec.encode(&docs, &opts).unwrap()).unwrap();
        assert!(text.starts_with("\x1b[36mk\x1b[0m: \x1b[32mv\x1b[0m\n"));
        assert!(text.contains("\x1b[33m1\x1b[0m"));
        assert!(text.contains("\x1b[39mnull\x1b[0m"));
        assert!(text.contains("\x1b[35mtrue\x1b[0m"));
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_out_of_range_indent_uses_default() {
        let docs = YamlCodec.decode(b"a:\n  b: [1, 2]\n").unwrap();
        let default = YamlCodec.encode(&docs, &EncodeOptions::default()).unwrap();
        assert_eq!(YamlCodec.encode(&docs, &EncodeOptions::compact()).unwrap(), default);
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_non_text_keys() {
        let docs = YamlCodec.decode(b"1: one\ntrue: yes\n").unwrap();
        let map = docs[0].as_map().unwrap();
        assert_eq!(map.get(&Value::Int(1)), Some(&Value::from("one")));
        assert!(map.contains_key(&Value::Bool(true)));
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_yaml_rejects_bytes() {
        let err = YamlCodec
            .encode(&[Value::from(vec![Value::bytes(vec![0])])], &EncodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Encode { format: Format::Yaml, .. }));
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn test_invalid_yaml() {
        let err = YamlCodec.decode(b"a: [1, 2").unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
    }

    #[test]
    #[cfg(feature = "msgpack")]
    fn test_msgpack_round_trip_keeps_bytes() {
        let mut map = Map::new();
        map.insert(Value::from("blob"), Value::bytes(vec![0, 159, 255]));
        map.insert(Value::Int(-7), Value::Float(2.5));
        map.insert(Value::from("big"), Value::UInt(u64::MAX));
        let doc = Value::Map(map);

        let packed = MsgpackCodec.encode(&[doc.clone()], &EncodeOptions::default()).unwrap();
        assert_eq!(MsgpackCodec.decode(&packed).unwrap(), vec![doc]);
    }

    #[test]
    #[cfg(all(feature = "json", feature = "msgpack"))]
    fn test_msgpack_concatenated() {
        // fixmap {"a": 1}, then positive fixint 2.
        let docs = MsgpackCodec.decode(&[0x81, 0xa1, b'a', 0x01, 0x02]).unwrap();
        assert_eq!(docs, vec![json(r#"{"a": 1}"#), Value::Int(2)]);

        let out = MsgpackCodec.encode(&docs, &EncodeOptions::default()).unwrap();
        assert_eq!(out, vec![0x81, 0xa1, b'a', 0x01, 0x02]);
    }

    #[test]
    #[cfg(feature = "msgpack")]
    fn test_truncated_msgpack() {
        let err = MsgpackCodec.decode(&[0x92, 0x01]).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
    }

    #[test]
    #[cfg(all(feature = "json", feature = "yaml", feature = "msgpack"))]
    fn test_auto_detection() {
        let registry = registry();
        let converter = Converter::new(&registry);

        let (format, _) = converter.decode(br#"{"a": 1}"#, InputFormat::Auto).unwrap();
        assert_eq!(format, Format::Json);

        let (format, docs) = converter.decode(b"a: 1\nb: two\n", InputFormat::Auto).unwrap();
        assert_eq!(format, Format::Yaml);
        assert_eq!(docs[0].get("b"), Some(&Value::from("two")));

        let (format, docs) = converter
            .decode(&[0x81, 0xa1, b'a', 0xc3], InputFormat::Auto)
            .unwrap();
        assert_eq!(format, Format::Msgpack);
        assert_eq!(docs[0].get("a"), Some(&Value::Bool(true)));
    }

    #[test]
    #[cfg(all(feature = "json", feature = "yaml"))]
    fn test_convert_sorts_keys_for_text() {
        let registry = registry();
        let converter = Converter::new(&registry);
        let req = ConvertRequest::new(Format::Json, Format::Json).options(EncodeOptions::compact());

        let out = converter.convert(br#"{"b": 1, "a": {"d": 2, "c": 3}}"#, &req).unwrap();
        assert_eq!(out.data, b"{\"a\":{\"c\":3,\"d\":2},\"b\":1}\n");
    }

    #[test]
    #[cfg(all(feature = "json", feature = "msgpack"))]
    fn test_msgpack_keeps_key_order_by_default() {
        let registry = registry();
        let converter = Converter::new(&registry);

        let req = ConvertRequest::new(Format::Json, Format::Msgpack);
        let packed = converter.convert(br#"{"b": 1, "a": 2}"#, &req).unwrap();
        assert_eq!(packed.data, vec![0x82, 0xa1, b'b', 0x01, 0xa1, b'a', 0x02]);
    }

    #[test]
    #[cfg(feature = "xz")]
    fn test_xz_round_trip() {
        let data = b"hello hello hello hello\n".repeat(20);
        let packed = XzTransform.compress(&data).unwrap();
        assert!(packed.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]));
        assert!(packed.len() < data.len());
        assert_eq!(XzTransform.decompress(&packed).unwrap(), data);
    }

    #[test]
    #[cfg(feature = "xz")]
    fn test_lzma_round_trip() {
        let data = b"a: 1\nb: [1, 2, 3]\n".to_vec();
        let packed = LzmaTransform.compress(&data).unwrap();
        assert_eq!(LzmaTransform.decompress(&packed).unwrap(), data);
    }

    #[test]
    #[cfg(feature = "xz")]
    fn test_corrupt_xz() {
        let err = XzTransform.decompress(b"definitely not xz").unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Compression {
                compression: Compression::Xz,
                ..
            }
        ));
    }

    #[test]
    #[cfg(all(feature = "xz", feature = "json", feature = "yaml"))]
    fn test_convert_sniffs_xz_input() {
        let registry = registry();
        let converter = Converter::new(&registry);

        let packed = XzTransform.compress(br#"{"a": [1, 2]}"#).unwrap();
        let req = ConvertRequest::new(InputFormat::Auto, Format::Json).options(EncodeOptions::compact());
        let out = converter.convert(&packed, &req).unwrap();
        assert_eq!(out.data, b"{\"a\":[1,2]}\n");
        assert_eq!(out.decompressed, Some(Compression::Xz));
        assert_eq!(out.source_format, Format::Json);
    }
}
