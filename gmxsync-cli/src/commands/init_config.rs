//! `gmxsync init-config`: write the default config for a project.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use gmxsync_core::config::CONFIG_FILE;
use gmxsync_core::SyncConfig;
use gmxsync_sync::atomic_write;

/// Arguments for `gmxsync init-config`.
#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// GameMaker project directory.
    #[arg(long, short = 'p', default_value = ".")]
    pub project: PathBuf,

    /// Replace an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitConfigArgs {
    pub fn run(self) -> Result<()> {
        if !self.project.is_dir() {
            bail!("project directory {} does not exist", self.project.display());
        }
        let path = self.project.join(CONFIG_FILE);
        if path.exists() && !self.force {
            bail!("{} already exists; pass --force to replace it", path.display());
        }

        let yaml = SyncConfig::default()
            .to_yaml()
            .context("failed to render default config")?;
        atomic_write(&path, yaml.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {}", path.display());
        Ok(())
    }
}
