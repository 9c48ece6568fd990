//! `gmxsync translate <file>`: one-shot conversion without a project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use gmxsync_core::{parse_native, write_native, NativeResource};
use gmxsync_sync::atomic_write;
use gmxsync_translate::{mirror_to_native, native_to_mirror};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Mirror text (`.gmo`).
    Mirror,
    /// Native object XML.
    Native,
}

/// Arguments for `gmxsync translate`.
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Native object or mirror file to translate.
    pub input: PathBuf,

    /// Output format; inferred from the input name when omitted.
    #[arg(long, value_enum)]
    pub to: Option<Format>,

    /// Native object supplying everything the mirror does not carry.
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Write here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl TranslateArgs {
    pub fn run(self) -> Result<()> {
        let to = match self.to {
            Some(to) => to,
            None => infer_target(&self.input)?,
        };
        let text = fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;

        let translated = match to {
            Format::Mirror => {
                let native = parse_native(&text)
                    .with_context(|| format!("{} is not a native object", self.input.display()))?;
                native_to_mirror(&native)
            }
            Format::Native => {
                let base = match &self.base {
                    Some(path) => load_native(path)?,
                    None => NativeResource::skeleton(),
                };
                let native = mirror_to_native(&text, &base)
                    .with_context(|| format!("failed to parse {}", self.input.display()))?;
                write_native(&native).context("failed to serialize native object")?
            }
        };

        match &self.output {
            Some(path) => {
                let result = atomic_write(path, translated.as_bytes())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                let verb = if result.was_written() { "wrote" } else { "unchanged" };
                println!("{verb} {}", path.display());
            }
            None => print!("{translated}"),
        }
        Ok(())
    }
}

fn infer_target(input: &Path) -> Result<Format> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.ends_with(".gmo") {
        Ok(Format::Native)
    } else if name.ends_with(".gmx") || name.ends_with(".xml") {
        Ok(Format::Mirror)
    } else {
        bail!("cannot infer the output format of '{name}'; pass --to mirror|native")
    }
}

fn load_native(path: &Path) -> Result<NativeResource> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_native(&text).with_context(|| format!("{} is not a native object", path.display()))
}
