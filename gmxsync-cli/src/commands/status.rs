//! `gmxsync status`: per-resource sync state.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gmxsync_core::NativeManifest;
use gmxsync_sync::{scan_status, Layout, ResourceState, ResourceStatus, Side};

use super::ProjectArgs;

/// Arguments for `gmxsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = self.project.load()?;
        let layout = Layout::from_config(&config);

        let manifest_path = config
            .manifest_path()
            .context("could not locate the project manifest")?;
        let text = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest = NativeManifest::parse(text)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        let statuses = scan_status(&layout, &manifest).context("status scan failed")?;
        if self.json {
            return print_json(statuses);
        }
        print_table(&layout, statuses);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusReportJson {
    generated_at: String,
    summary: StatusSummaryJson,
    resources: Vec<ResourceStatus>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    resources: usize,
    in_sync: usize,
    out_of_sync: usize,
    unregistered: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "manifest")]
    manifest: String,
}

fn summarize(statuses: &[ResourceStatus]) -> StatusSummaryJson {
    let in_sync = statuses
        .iter()
        .filter(|s| s.state == ResourceState::InSync)
        .count();
    StatusSummaryJson {
        resources: statuses.len(),
        in_sync,
        out_of_sync: statuses.len() - in_sync,
        unregistered: statuses.iter().filter(|s| s.native && !s.in_manifest).count(),
    }
}

fn print_json(statuses: Vec<ResourceStatus>) -> Result<()> {
    let payload = StatusReportJson {
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary: summarize(&statuses),
        resources: statuses,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(layout: &Layout, statuses: Vec<ResourceStatus>) {
    let summary = summarize(&statuses);
    println!(
        "gmxsync v{} | {} resources | {} in sync | {} out of sync",
        env!("CARGO_PKG_VERSION"),
        summary.resources,
        summary.in_sync,
        summary.out_of_sync,
    );
    println!("mirror: {}", layout.mirror_root.display());

    if statuses.is_empty() {
        println!("No objects or scripts found.");
        return;
    }

    let rows: Vec<StatusTableRow> = statuses
        .iter()
        .map(|status| StatusTableRow {
            kind: status.kind.to_string(),
            name: status.name.clone(),
            state: format!("{} {}", state_indicator(&status.state), state_label(&status.state)),
            manifest: if status.in_manifest { "listed" } else { "-" }.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if summary.out_of_sync > 0 {
        println!("Run 'gmxsync diff' to inspect, or 'gmxsync watch' to rebuild the mirror.");
    }
}

fn state_label(state: &ResourceState) -> String {
    match state {
        ResourceState::InSync => "IN SYNC".to_string(),
        ResourceState::Differs { newer: Side::Native } => "DIFFERS (native newer)".to_string(),
        ResourceState::Differs { newer: Side::Mirror } => "DIFFERS (mirror newer)".to_string(),
        ResourceState::MirrorMissing => "NO MIRROR".to_string(),
        ResourceState::NativeMissing => "MIRROR ONLY".to_string(),
        ResourceState::Unreadable { error } => format!("UNREADABLE: {error}"),
    }
}

fn state_indicator(state: &ResourceState) -> String {
    match state {
        ResourceState::InSync => "■".green().bold().to_string(),
        ResourceState::Differs { .. } => "■".yellow().bold().to_string(),
        ResourceState::MirrorMissing => "■".bright_black().bold().to_string(),
        ResourceState::NativeMissing => "■".magenta().bold().to_string(),
        ResourceState::Unreadable { .. } => "■".red().bold().to_string(),
    }
}
