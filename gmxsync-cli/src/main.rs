//! gmxsync: edit GameMaker objects as plain text.
//!
//! # Usage
//!
//! ```text
//! gmxsync watch [--project <dir>] [--config <file>] [--mirror <dir>]
//! gmxsync translate <file> [--to mirror|native] [--base <object>] [--output <file>]
//! gmxsync diff [<name>] [--project <dir>]
//! gmxsync status [--project <dir>] [--json]
//! gmxsync init-config [--project <dir>] [--force]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, init_config::InitConfigArgs, status::StatusArgs, translate::TranslateArgs,
    watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gmxsync",
    version,
    about = "Keep GameMaker objects in sync with an editable text mirror",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the mirror tree and keep both trees in sync until stopped.
    Watch(WatchArgs),

    /// Translate a single file between the native and mirror formats.
    Translate(TranslateArgs),

    /// Show unified diffs between the mirror and what the native tree implies.
    Diff(DiffArgs),

    /// Show per-resource sync state across both trees and the manifest.
    Status(StatusArgs),

    /// Write a default gmxsync.yaml into the project directory.
    InitConfig(InitConfigArgs),
}

fn main() -> Result<()> {
    gmxsync_daemon::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => args.run(),
        Commands::Translate(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::InitConfig(args) => args.run(),
    }
}
