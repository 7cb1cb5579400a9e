//! rvbench CLI — inspection tooling for the rvbench verification harness.
//!
//! Provides `rvbench image` to decode program images, `rvbench golden` to
//! check golden register files, `rvbench signature` to compare a signature
//! artifact with its reference, and `rvbench list` to show the tests
//! configured in `rvbench.toml`.

#![warn(missing_docs)]

mod inspect;
mod list;
mod project;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// rvbench — RISC-V core verification harness.
#[derive(Parser, Debug)]
#[command(name = "rvbench", version, about = "RISC-V core verification harness")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `rvbench.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a program image and print its non-zero words.
    Image(ImageArgs),
    /// Parse a golden register file and print its entries.
    Golden {
        /// Golden register file.
        file: String,
    },
    /// Compare a signature artifact with a reference signature.
    Signature(SignatureArgs),
    /// List the tests configured in `rvbench.toml`.
    List(ListArgs),
}

/// Arguments for the `rvbench image` subcommand.
#[derive(Parser, Debug)]
pub struct ImageArgs {
    /// Program image file.
    pub file: String,

    /// Bytes per memory word.
    #[arg(long, default_value_t = 4)]
    pub word_size: usize,

    /// Word-address width of the memory.
    #[arg(long, default_value_t = 16)]
    pub addr_width: u32,

    /// Image file format.
    #[arg(short, long, value_enum, default_value_t = ImageFormat::HexDump)]
    pub format: ImageFormat,
}

/// Arguments for the `rvbench signature` subcommand.
#[derive(Parser, Debug)]
pub struct SignatureArgs {
    /// Signature written by a test run.
    pub artifact: String,

    /// Reference signature.
    pub reference: String,

    /// Address of the first signature word, used to name differing lines.
    #[arg(long, value_parser = parse_address, default_value = "0")]
    pub begin: u64,
}

/// Arguments for the `rvbench list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list this suite.
    pub suite: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Program image format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    /// `@address` markers followed by hex byte tokens.
    HexDump,
    /// One hex word per line from address zero.
    Plain,
}

/// Listing output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Image(ref args) => inspect::image(args, &global),
        Command::Golden { ref file } => inspect::golden(file, &global),
        Command::Signature(ref args) => inspect::signature(args, &global),
        Command::List(ref args) => list::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Parses a decimal or `0x`-prefixed hexadecimal address.
fn parse_address(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}
