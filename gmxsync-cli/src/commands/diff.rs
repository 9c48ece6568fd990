//! `gmxsync diff [<name>]`: what a native -> mirror pass would change.

use anyhow::{Context, Result};
use clap::Args;

use gmxsync_sync::{diff_all, diff_resource, Layout};

use super::ProjectArgs;

/// Arguments for `gmxsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Object or script name; every resource when omitted.
    pub name: Option<String>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = self.project.load()?;
        let layout = Layout::from_config(&config);

        let diffs = match &self.name {
            Some(name) => diff_resource(&layout, name)
                .with_context(|| format!("diff failed for '{name}'"))?
                .into_iter()
                .collect(),
            None => diff_all(&layout).context("diff failed")?,
        };

        if diffs.is_empty() {
            match &self.name {
                Some(name) => println!("No differences for '{name}'."),
                None => println!("No differences."),
            }
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
