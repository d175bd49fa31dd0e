//! Command-line interface for `jsbc`.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::compile::{compile_netbots, compile_program, NETBOTS_MAGIC, PROGRAM_MAGIC};

#[derive(Parser)]
#[command(name = "jsbc")]
#[command(about = "Ahead-of-time bytecode compiler for jsbc programs and NetBots graphs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a source file to a bytecode container
    Build {
        /// Input file: a `.js` program or a `.json` NetBots graph
        input: PathBuf,

        /// Output path (defaults to the input path with a `.jsbc` extension)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Force the front end instead of inferring it from the file extension
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Override the four-byte magic stamped on the container
        #[arg(long)]
        magic_version: Option<String>,
    },
    /// Compile and print a summary without writing an output file
    Check {
        /// Input file: a `.js` program or a `.json` NetBots graph
        input: PathBuf,

        /// Force the front end instead of inferring it from the file extension
        #[arg(long, value_enum)]
        format: Option<Format>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Program,
    Netbots,
}

/// Entry point for the CLI.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, format, magic_version } => {
            cmd_build(&input, output.as_deref(), format, magic_version.as_deref())
        }
        Commands::Check { input, format } => cmd_check(&input, format),
    }
}

fn infer_format(path: &Path, override_format: Option<Format>) -> Result<Format, Box<dyn std::error::Error>> {
    if let Some(format) = override_format {
        return Ok(format);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Netbots),
        Some("js") => Ok(Format::Program),
        other => Err(format!(
            "cannot infer format from extension {other:?}; pass --format explicitly"
        )
        .into()),
    }
}

fn compile_file(
    input: &Path,
    format: Option<Format>,
    magic_version: Option<&str>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let source = fs::read_to_string(input)
        .map_err(|e| format!("failed to read {}: {e}", input.display()))?;
    let format = infer_format(input, format)?;

    let mut bytes = match format {
        Format::Program => compile_program(&source)?,
        Format::Netbots => compile_netbots(&source)?,
    };

    if let Some(magic) = magic_version {
        let magic_bytes = magic.as_bytes();
        if magic_bytes.len() != 4 {
            return Err(format!("--magic-version must be exactly 4 bytes, got {:?}", magic).into());
        }
        bytes[0..4].copy_from_slice(magic_bytes);
    }

    Ok(bytes)
}

fn cmd_build(
    input: &Path,
    output: Option<&Path>,
    format: Option<Format>,
    magic_version: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = compile_file(input, format, magic_version)?;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("jsbc"),
    };
    fs::write(&output_path, &bytes)?;

    println!("Compiled {} -> {} ({} bytes)", input.display(), output_path.display(), bytes.len());
    Ok(())
}

fn cmd_check(input: &Path, format: Option<Format>) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = compile_file(input, format, None)?;
    let magic = std::str::from_utf8(&bytes[0..4]).unwrap_or("????");

    println!("OK: {}", input.display());
    println!("  magic: {magic}");
    println!("  size:  {} bytes", bytes.len());
    debug_assert!(magic.as_bytes() == PROGRAM_MAGIC || magic.as_bytes() == NETBOTS_MAGIC);
    Ok(())
}
