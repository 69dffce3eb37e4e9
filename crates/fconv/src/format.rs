//! Format identifiers and detection.

use crate::converter::ConvertError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A serialization format the value tree can be decoded from and encoded to.
///
/// The default is YAML, the most readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Format {
    Json,
    #[default]
    Yaml,
    Msgpack,
}

impl Format {
    /// Every format, in detection order.
    pub const ALL: [Format; 3] = [Format::Json, Format::Yaml, Format::Msgpack];

    /// Canonical identifier.
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Msgpack => "msgpack",
        }
    }

    /// Identifiers accepted for this format, canonical first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Format::Json => &["json", "jsonl", "ndjson"],
            Format::Yaml => &["yaml", "yml"],
            Format::Msgpack => &["msgpack", "msgp", "mp"],
        }
    }

    /// Whether the encoded form is text.
    pub fn is_text(self) -> bool {
        !matches!(self, Format::Msgpack)
    }

    /// Detect a format from a file extension.
    ///
    /// A trailing compression extension is skipped, so `data.json.xz` is json.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Format> {
        let path = path.as_ref();
        let path = if Compression::from_path(path).is_some() {
            Path::new(path.file_stem()?)
        } else {
            path
        };
        let ext = path.extension()?.to_str()?;
        lookup(ext)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s).ok_or_else(|| ConvertError::UnsupportedFormat {
            name: s.to_string(),
            suggestion: find_similar_format(s),
        })
    }
}

fn lookup(name: &str) -> Option<Format> {
    let name = name.to_lowercase();
    Format::ALL
        .into_iter()
        .find(|format| format.aliases().contains(&name.as_str()))
}

/// Source format selection: a known format, or content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    Auto,
    Known(Format),
}

impl FromStr for InputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(InputFormat::Auto)
        } else {
            s.parse().map(InputFormat::Known)
        }
    }
}

impl From<Format> for InputFormat {
    fn from(format: Format) -> Self {
        InputFormat::Known(format)
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Auto => f.write_str("auto"),
            InputFormat::Known(format) => format.fmt(f),
        }
    }
}

/// Byte-level compression applied around the encoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// `.xz` container.
    Xz,
    /// Legacy `.lzma` ("alone") container. Has no magic bytes.
    Lzma,
}

const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

impl Compression {
    pub const ALL: [Compression; 2] = [Compression::Xz, Compression::Lzma];

    pub fn name(self) -> &'static str {
        match self {
            Compression::Xz => "xz",
            Compression::Lzma => "lzma",
        }
    }

    /// Detect from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Compression> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "xz" | "txz" => Some(Compression::Xz),
            "lzma" => Some(Compression::Lzma),
            _ => None,
        }
    }

    /// Detect from leading magic bytes. Only xz is recognizable.
    pub fn sniff(data: &[u8]) -> Option<Compression> {
        data.starts_with(&XZ_MAGIC).then_some(Compression::Xz)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xz" => Ok(Compression::Xz),
            "lzma" | "alone" => Ok(Compression::Lzma),
            _ => Err(ConvertError::UnsupportedFormat {
                name: s.to_string(),
                suggestion: None,
            }),
        }
    }
}

/// Find the known format name closest to `input` (for typo suggestions).
///
/// Aliases under four characters are skipped; they sit within a couple of
/// edits of almost any short word.
pub fn find_similar_format(input: &str) -> Option<&'static str> {
    let input = input.to_lowercase();

    Format::ALL
        .into_iter()
        .flat_map(|format| format.aliases().iter().map(move |alias| (*alias, format)))
        .filter(|(alias, _)| alias.len() >= 4)
        .map(|(alias, format)| (edit_distance(&input, alias), alias, format))
        .filter(|(distance, alias, _)| *distance <= max_typo_distance(alias))
        .min_by_key(|(distance, _, _)| *distance)
        .map(|(_, _, format)| format.name())
}

fn max_typo_distance(alias: &str) -> usize {
    if alias.len() <= 4 { 1 } else { 2 }
}

/// Levenshtein distance that also counts swapping two adjacent characters
/// as a single edit.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // rows[i][j] = distance between a[..i] and b[..j]
    let mut rows = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in rows.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in rows[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (rows[i - 1][j] + 1)
                .min(rows[i][j - 1] + 1)
                .min(rows[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(rows[i - 2][j - 2] + 1);
            }
            rows[i][j] = best;
        }
    }

    rows[a.len()][b.len()]
}
