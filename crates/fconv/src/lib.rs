//! fconv: convert structured data between JSON, YAML and MessagePack
//!
//! Input is decoded into a format-neutral [`Value`] tree (one per document),
//! then encoded into the target format. Codecs are looked up in a
//! [`Registry`]; the concrete ones live in `fconv-serde`.

mod codec;
mod converter;
mod format;
mod registry;
mod value;

pub use codec::{ByteTransform, Codec, Decoder, EncodeOptions, Encoder, SortKeys};
pub use converter::{ConvertError, ConvertRequest, Conversion, Converter};
pub use format::{Compression, Format, InputFormat, find_similar_format};
pub use registry::Registry;
pub use value::{Map, Value};
