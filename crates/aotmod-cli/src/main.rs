//! aotmod command-line tool
//!
//! Inspects artifact directories, checks that they bind against a set of
//! shared libraries, and packs metadata documents into artifacts.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aotmod")]
#[command(about = "Inspect, check and pack AOT module artifacts", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); AOTMOD_LOG overrides it
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the version, kernels and fields of an artifact
    Inspect {
        /// Artifact directory
        artifact: PathBuf,
    },

    /// Load an artifact against shared libraries and report the outcome
    Check {
        /// Artifact directory
        artifact: PathBuf,

        /// Shared library to resolve entry symbols from (repeatable, searched in order)
        #[arg(short, long = "lib")]
        libs: Vec<PathBuf>,

        /// Also resolve symbols already loaded into this process
        #[arg(long)]
        process: bool,

        /// Loader options file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write an artifact directory from a metadata JSON document
    Pack {
        /// Metadata document (same schema as metadata.json)
        metadata: PathBuf,

        /// Output artifact directory
        output: PathBuf,

        /// Do not write metadata.crc32
        #[arg(long)]
        no_checksum: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logger = logging::init(&cli.log_level)?;

    match cli.command {
        Commands::Inspect { artifact } => commands::inspect::execute(&artifact),
        Commands::Check {
            artifact,
            libs,
            process,
            config,
        } => commands::check::execute(&artifact, &libs, process, config.as_deref()),
        Commands::Pack {
            metadata,
            output,
            no_checksum,
        } => commands::pack::execute(&metadata, &output, !no_checksum),
    }
}
