//! `gmxsync watch`: run the sync daemon in the foreground.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gmxsync_daemon::start_blocking;

use super::ProjectArgs;

/// Arguments for `gmxsync watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Mirror directory, overriding the config.
    #[arg(long)]
    pub mirror: Option<PathBuf>,

    /// Reverb window in milliseconds, overriding the config.
    #[arg(long)]
    pub reverb_ms: Option<u64>,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let mut config = self.project.load()?;
        if let Some(mirror) = self.mirror {
            config.mirror_dir = mirror;
        }
        if let Some(reverb_ms) = self.reverb_ms {
            config.reverb_spacing_ms = reverb_ms;
        }
        config.validate().context("invalid watch options")?;

        println!(
            "{} {} <-> {}",
            "watching".green().bold(),
            config.project_dir.display(),
            config.mirror_root().display()
        );
        let stats = start_blocking(&config).context("watcher exited with error")?;

        println!(
            "{} {} synced, {} failed, {} suppressed, {} manifest entr{} added",
            "stopped:".bold(),
            stats.processed,
            stats.failed,
            stats.reverb + stats.duplicate + stats.echo,
            stats.manifest_appends,
            if stats.manifest_appends == 1 { "y" } else { "ies" },
        );
        Ok(())
    }
}
