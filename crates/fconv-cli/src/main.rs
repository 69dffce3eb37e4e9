//! fconv CLI - convert structured data between JSON, YAML and MessagePack

mod config;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use config::{ColorChoice, Config, list_presets};
use fconv::{
    Compression, ConvertError, ConvertRequest, Converter, Format, InputFormat, Registry, SortKeys,
};
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for decode, encode and compression failures.
const EXIT_BAILOUT: u8 = 13;
/// Exit status for empty input.
const EXIT_EMPTY: u8 = 17;

/// Parse a yes/no flag value.
fn parse_yes_no(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(true),
        "no" | "n" | "false" => Ok(false),
        _ => Err(format!("invalid value '{s}'. Use: yes, no")),
    }
}

#[derive(Parser)]
#[command(name = "fconv", version)]
#[command(about = "Convert structured data between JSON, YAML and MessagePack", long_about = None)]
struct Cli {
    /// Verbose output (show debug info)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file (default: ~/.config/fconv/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert data from one format to another
    Convert(ConvertArgs),

    /// Compress a file or stdin
    Compress(CompressArgs),

    /// Decompress a file or stdin
    Decompress(CompressArgs),

    /// List available formats and compressions
    Formats,

    /// List available presets
    Presets,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file (omit or use "-" for stdin)
    input: Option<PathBuf>,

    /// Output file (omit or use "-" for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source format: auto, json, yaml, msgpack (default: from extension, else auto)
    #[arg(short = 'f', long = "from", visible_alias = "in-format")]
    from: Option<String>,

    /// Target format: json, yaml, msgpack (default: from extension, else yaml)
    #[arg(short = 't', long = "to", visible_alias = "out-format")]
    to: Option<String>,

    /// Indent width; 0 writes compact JSON (YAML takes 2-9)
    #[arg(long)]
    indent: Option<usize>,

    /// Sort mapping keys: yes, no, auto (auto sorts for text formats)
    #[arg(long)]
    sort_keys: Option<SortKeys>,

    /// Allow non-ASCII text in the output: yes, no
    #[arg(long, value_parser = parse_yes_no)]
    allow_unicode: Option<bool>,

    /// Write non-text mapping keys as text in JSON instead of failing
    #[arg(long)]
    stringify_keys: bool,

    /// Colorize text output
    #[arg(long, value_enum)]
    color: Option<ColorChoice>,

    /// Compress the output: xz, lzma (default: from output extension)
    #[arg(long)]
    compress: Option<String>,

    /// Decompress the input first: xz, lzma (default: from extension or magic bytes)
    #[arg(long)]
    decompress: Option<String>,

    /// Apply a preset (compact, pretty, ascii, or one from the config file)
    #[arg(long)]
    preset: Option<String>,

    /// On failure, copy the original input to stdout
    #[arg(long)]
    echo_input_on_failure: bool,
}

#[derive(Args)]
struct CompressArgs {
    /// Input file (omit or use "-" for stdin)
    input: Option<PathBuf>,

    /// Output file (omit or use "-" for stdout)
    output: Option<PathBuf>,

    /// Container: xz, lzma (default: from file extension, else xz)
    #[arg(long)]
    codec: Option<String>,
}

/// Output verbosity level.
#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over the verbosity flags.
fn init_tracing(v: Verbosity) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(v.filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config problems are reported once logging is up.
    let loaded = match cli.config {
        Some(ref path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let verbose = cli.verbose || config.defaults.verbose;
    let quiet = cli.quiet || config.defaults.quiet;
    init_tracing(Verbosity::from_flags(verbose, quiet));
    if let Some(e) = config_error {
        warn!("{e:#}; using defaults");
    }

    let registry = fconv_serde::registry();

    match run(cli.command, &config, &registry) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(command: Commands, config: &Config, registry: &Registry) -> Result<()> {
    match command {
        Commands::Convert(args) => cmd_convert(registry, config, args),
        Commands::Compress(args) => cmd_compress(registry, args),
        Commands::Decompress(args) => cmd_decompress(registry, args),
        Commands::Formats => cmd_formats(registry),
        Commands::Presets => cmd_presets(config),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "fconv", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Map an error to the process exit status.
fn exit_code(err: &anyhow::Error) -> u8 {
    let convert_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ConvertError>());
    match convert_error {
        Some(ConvertError::UnsupportedFormat { .. }) => 2,
        Some(
            ConvertError::Decode { .. }
            | ConvertError::Encode { .. }
            | ConvertError::Compression { .. },
        ) => EXIT_BAILOUT,
        Some(ConvertError::EmptyInput) => EXIT_EMPTY,
        Some(ConvertError::Io(_)) | None => 1,
    }
}

/// `None` and `-` both mean the standard stream.
fn file_path(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| *p != Path::new("-"))
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut data)
                .context("failed to read stdin")?;
            Ok(data)
        }
    }
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data).context("failed to write stdout")?;
            stdout.flush().context("failed to write stdout")
        }
    }
}

fn cmd_convert(registry: &Registry, config: &Config, args: ConvertArgs) -> Result<()> {
    let input_path = file_path(&args.input);
    let output_path = file_path(&args.output);
    let preset = config.resolve(args.preset.as_deref())?;

    // Everything named on the command line is checked before input is read.
    let from = match args.from {
        Some(ref name) => name.parse::<InputFormat>()?,
        None => input_path
            .and_then(|p| Format::from_path(p))
            .map_or(InputFormat::Auto, InputFormat::Known),
    };
    let to = match (args.to, output_path.and_then(|p| Format::from_path(p))) {
        (Some(name), _) => name.parse::<Format>()?,
        (None, Some(format)) => format,
        (None, None) => match preset.output_format {
            Some(ref name) => name.parse::<Format>()?,
            None => Format::default(),
        },
    };
    let decompress = match args.decompress {
        Some(ref name) => Some(name.parse::<Compression>()?),
        None => input_path.and_then(|p| Compression::from_path(p)),
    };
    let compress = match args.compress {
        Some(ref name) => Some(name.parse::<Compression>()?),
        None => output_path.and_then(|p| Compression::from_path(p)),
    };

    registry.get(to)?;
    if let InputFormat::Known(format) = from {
        registry.get(format)?;
    }
    for compression in decompress.iter().chain(&compress) {
        registry.get_compression(*compression)?;
    }

    let mut options = preset.encode_options();
    if let Some(indent) = args.indent {
        options.indent = indent;
    }
    if let Some(sort_keys) = args.sort_keys {
        options.sort_keys = sort_keys;
    }
    if let Some(allow_unicode) = args.allow_unicode {
        options.allow_unicode = allow_unicode;
    }
    options.stringify_keys |= args.stringify_keys;
    options.color = compress.is_none()
        && match args.color.or(preset.color).unwrap_or_default() {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => output_path.is_none() && std::io::stdout().is_terminal(),
        };

    let mut request = ConvertRequest::new(from, to).options(options);
    request.decompress = decompress;
    request.compress = compress;
    debug!(%from, %to, options = ?request.options, "resolved conversion");

    let input = read_input(input_path)?;
    let converter = Converter::new(registry);
    let conversion = match converter.convert(&input, &request) {
        Ok(conversion) => conversion,
        Err(e) if args.echo_input_on_failure => {
            return Err(echo_input(e, &input, &mut std::io::stdout().lock()));
        }
        Err(e) => return Err(e.into()),
    };

    write_output(output_path, &conversion.data)?;
    info!(
        from = %conversion.source_format,
        %to,
        documents = conversion.documents,
        bytes = conversion.data.len(),
        "converted"
    );
    Ok(())
}

/// Copy the unconverted input to `out` after a failed conversion.
///
/// The conversion error is what gets returned; a failed echo is only logged.
fn echo_input(err: ConvertError, input: &[u8], out: &mut impl Write) -> anyhow::Error {
    if let Err(write_err) = out.write_all(input).and_then(|()| out.flush()) {
        warn!("failed to echo input: {write_err}");
    }
    err.into()
}

fn cmd_compress(registry: &Registry, args: CompressArgs) -> Result<()> {
    let input_path = file_path(&args.input);
    let output_path = file_path(&args.output);

    let compression = match args.codec {
        Some(ref name) => name.parse::<Compression>()?,
        None => output_path
            .and_then(|p| Compression::from_path(p))
            .unwrap_or(Compression::Xz),
    };
    let transform = registry.get_compression(compression)?;

    let input = read_input(input_path)?;
    let output = transform.compress(&input)?;
    write_output(output_path, &output)?;
    info!(%compression, from = input.len(), to = output.len(), "compressed");
    Ok(())
}

fn cmd_decompress(registry: &Registry, args: CompressArgs) -> Result<()> {
    let input_path = file_path(&args.input);
    let output_path = file_path(&args.output);

    let named = match args.codec {
        Some(ref name) => Some(name.parse::<Compression>()?),
        None => input_path.and_then(|p| Compression::from_path(p)),
    };
    if let Some(compression) = named {
        registry.get_compression(compression)?;
    }

    let input = read_input(input_path)?;
    let compression = named
        .or_else(|| Compression::sniff(&input))
        .unwrap_or(Compression::Xz);
    let output = registry.get_compression(compression)?.decompress(&input)?;
    write_output(output_path, &output)?;
    info!(%compression, from = input.len(), to = output.len(), "decompressed");
    Ok(())
}

fn cmd_formats(registry: &Registry) -> Result<()> {
    println!("Formats:\n");
    for format in registry.formats() {
        let kind = if format.is_text() { "text" } else { "binary" };
        println!("  {:<10} {:<8} {}", format.name(), kind, format.aliases().join(", "));
    }

    let compressions: Vec<_> = registry.compressions().collect();
    if !compressions.is_empty() {
        println!("\nCompressions:\n");
        for compression in compressions {
            println!("  {compression}");
        }
    }
    Ok(())
}

fn cmd_presets(config: &Config) -> Result<()> {
    println!("Built-in presets:\n");
    for (name, desc) in list_presets() {
        println!("  {name:<12} {desc}");
    }

    if !config.presets.is_empty() {
        println!("\nUser-defined presets:\n");
        for (name, preset) in &config.presets {
            println!("  {name:<12} {}", preset.describe());
        }
    }
    Ok(())
}
