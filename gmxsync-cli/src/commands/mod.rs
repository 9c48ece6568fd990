pub mod diff;
pub mod init_config;
pub mod status;
pub mod translate;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gmxsync_core::SyncConfig;

/// Project selection shared by every project-scoped command.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// GameMaker project directory (the `*.gmx` folder). Defaults to the
    /// config's `project_dir`, or the current directory.
    #[arg(long, short = 'p')]
    pub project: Option<PathBuf>,

    /// Config file; `<project>/gmxsync.yaml` is used when present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn load(&self) -> Result<SyncConfig> {
        let config = match &self.config {
            Some(path) => {
                let mut config = SyncConfig::load_file(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?;
                if let Some(project) = &self.project {
                    config.project_dir = project.clone();
                }
                config.validate().context("invalid config")?;
                config
            }
            None => {
                let project = self.project.clone().unwrap_or_else(|| PathBuf::from("."));
                SyncConfig::load_for_project(&project)
                    .with_context(|| format!("failed to load config for {}", project.display()))?
            }
        };
        tracing::debug!(project = %config.project_dir.display(), "config loaded");
        Ok(config)
    }
}
