//! Configuration file and presets support.

use anyhow::{Context, Result};
use clap::ValueEnum;
use fconv::{EncodeOptions, SortKeys};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default CLI options.
    pub defaults: Defaults,
    /// User-defined presets.
    pub presets: BTreeMap<String, Preset>,
}

/// Default CLI options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Enable verbose output by default.
    pub verbose: bool,
    /// Enable quiet output by default.
    pub quiet: bool,
    /// Output options applied before any preset.
    #[serde(flatten)]
    pub output: Preset,
}

/// When to colorize text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Color when writing to a terminal
    #[default]
    Auto,
    #[value(alias = "yes")]
    Always,
    #[value(alias = "no")]
    Never,
}

/// A preset is a bundle of output options.
///
/// ```toml
/// [presets.wide]
/// indent = 4
/// sort_keys = "no"
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Preset {
    /// Target format when neither `--to` nor the output extension decide.
    pub output_format: Option<String>,
    pub indent: Option<usize>,
    pub sort_keys: Option<SortKeys>,
    pub allow_unicode: Option<bool>,
    pub stringify_keys: Option<bool>,
    pub color: Option<ColorChoice>,
}

impl Preset {
    /// Merge another preset into this one (other takes precedence).
    pub fn merge(&mut self, other: &Preset) {
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.indent.is_some() {
            self.indent = other.indent;
        }
        if other.sort_keys.is_some() {
            self.sort_keys = other.sort_keys;
        }
        if other.allow_unicode.is_some() {
            self.allow_unicode = other.allow_unicode;
        }
        if other.stringify_keys.is_some() {
            self.stringify_keys = other.stringify_keys;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
    }

    /// Encoder options with this preset's values over the defaults.
    pub fn encode_options(&self) -> EncodeOptions {
        let defaults = EncodeOptions::default();
        EncodeOptions {
            indent: self.indent.unwrap_or(defaults.indent),
            sort_keys: self.sort_keys.unwrap_or(defaults.sort_keys),
            allow_unicode: self.allow_unicode.unwrap_or(defaults.allow_unicode),
            stringify_keys: self.stringify_keys.unwrap_or(defaults.stringify_keys),
            color: false,
        }
    }

    /// One-line summary of the values this preset sets.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref format) = self.output_format {
            parts.push(format!("output_format={format}"));
        }
        if let Some(indent) = self.indent {
            parts.push(format!("indent={indent}"));
        }
        if let Some(sort_keys) = self.sort_keys {
            parts.push(format!("sort_keys={sort_keys:?}").to_lowercase());
        }
        if let Some(allow_unicode) = self.allow_unicode {
            parts.push(format!("allow_unicode={allow_unicode}"));
        }
        if let Some(stringify_keys) = self.stringify_keys {
            parts.push(format!("stringify_keys={stringify_keys}"));
        }
        if let Some(color) = self.color {
            parts.push(format!("color={color:?}").to_lowercase());
        }
        parts.join(", ")
    }
}

impl Config {
    /// Load config from the default location (~/.config/fconv/config.toml).
    ///
    /// A missing file is not an error.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fconv").join("config.toml"))
    }

    /// Get a preset by name (user-defined or built-in).
    pub fn get_preset(&self, name: &str) -> Option<Preset> {
        if let Some(preset) = self.presets.get(name) {
            return Some(preset.clone());
        }
        builtin_preset(name)
    }

    /// Output options from `[defaults]` with the named preset merged over them.
    pub fn resolve(&self, preset_name: Option<&str>) -> Result<Preset> {
        let mut resolved = self.defaults.output.clone();
        if let Some(name) = preset_name {
            let preset = self.get_preset(name).with_context(|| {
                format!("unknown preset: '{name}'. Use 'fconv presets' to list.")
            })?;
            resolved.merge(&preset);
        }
        Ok(resolved)
    }
}

/// Built-in presets.
fn builtin_preset(name: &str) -> Option<Preset> {
    match name {
        "compact" => Some(Preset {
            indent: Some(0),
            ..Default::default()
        }),
        "pretty" => Some(Preset {
            indent: Some(2),
            sort_keys: Some(SortKeys::Yes),
            ..Default::default()
        }),
        "ascii" => Some(Preset {
            allow_unicode: Some(false),
            ..Default::default()
        }),
        _ => None,
    }
}

/// Built-in presets with descriptions.
pub fn list_presets() -> Vec<(&'static str, &'static str)> {
    vec![
        ("compact", "Single-line JSON (indent 0)"),
        ("pretty", "Indent 2, keys sorted for every format"),
        ("ascii", "Escape non-ASCII text in JSON"),
    ]
}
