//! Sync Engine: one change notification in, at most one translation out.
//!
//! `handle` runs the whole pipeline for one event (classify, gate, translate,
//! write, record) and never returns an error: every per-event failure is
//! turned into a [`SyncReport`] and handed to the [`Reporter`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use gmxsync_core::{parse_native, write_native, NativeResource, ResourceKind, SyncConfig};
use gmxsync_translate::{mirror_to_native, native_to_mirror};

use crate::bootstrap::{self, InitialSyncSummary};
use crate::error::SyncError;
use crate::layout::{Classified, Layout, ResourcePaths};
use crate::manifest_updater::ManifestUpdater;
use crate::reverb::{self, fingerprint, Fingerprints, Side, Spacing, SyncState, Verdict};
use crate::writer::{atomic_write, read, WriteResult};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Write,
    Create,
    Remove,
    Other,
}

/// A filesystem notification as delivered by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub op: ChangeOp,
    pub at: Instant,
}

impl ChangeEvent {
    pub fn write(path: impl Into<PathBuf>, at: Instant) -> Self {
        Self {
            path: path.into(),
            op: ChangeOp::Write,
            at,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    NativeToMirror,
    MirrorToNative,
}

impl Direction {
    pub fn from_source(side: Side) -> Self {
        match side {
            Side::Native => Direction::NativeToMirror,
            Side::Mirror => Direction::MirrorToNative,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::NativeToMirror => "native -> mirror",
            Direction::MirrorToNative => "mirror -> native",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The counterpart was rewritten.
    Written {
        target: PathBuf,
        /// A manifest entry was appended for a new resource.
        manifest_updated: bool,
    },
    /// The counterpart already held the translated bytes.
    Unchanged { target: PathBuf },
    Failed { error: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Written {
                target,
                manifest_updated: true,
            } => write!(f, "wrote {} (manifest updated)", target.display()),
            Outcome::Written { target, .. } => write!(f, "wrote {}", target.display()),
            Outcome::Unchanged { target } => write!(f, "{} already up to date", target.display()),
            Outcome::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// One `(timestamp, direction, name, result)` record for the log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub kind: ResourceKind,
    pub name: String,
    pub result: Outcome,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} '{}': {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.direction,
            self.kind,
            self.name,
            self.result
        )
    }
}

/// Sink for sync outcomes.
pub trait Reporter: Send {
    fn report(&mut self, report: &SyncReport);
}

/// Writes every report to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, report: &SyncReport) {
        if report.result.is_failure() {
            tracing::error!("{report}");
        } else {
            tracing::info!("{report}");
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// What `handle` did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a write, a directory, or outside both trees.
    Ignored,
    Suppressed(Verdict),
    /// A translation or copy ran; the report says how it went.
    Processed(SyncReport),
}

/// Counters published to the command listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub processed: u64,
    pub failed: u64,
    pub ignored: u64,
    pub reverb: u64,
    pub duplicate: u64,
    pub echo: u64,
    pub manifest_appends: u64,
    pub last: Option<SyncReport>,
}

pub struct SyncEngine {
    layout: Layout,
    spacing: Spacing,
    state: SyncState,
    fingerprints: Fingerprints,
    manifest: ManifestUpdater,
    reporter: Box<dyn Reporter>,
    stats: EngineStats,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("layout", &self.layout)
            .field("spacing", &self.spacing)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        layout: Layout,
        spacing: Spacing,
        manifest: ManifestUpdater,
        reporter: Box<dyn Reporter>,
    ) -> Self {
        Self {
            layout,
            spacing,
            state: SyncState::default(),
            fingerprints: Fingerprints::default(),
            manifest,
            reporter,
            stats: EngineStats::default(),
        }
    }

    /// Engine for `config`, reporting through the log.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self::new(
            Layout::from_config(config),
            Spacing::from_config(config),
            ManifestUpdater::new(config.manifest_path()?),
            Box::new(TracingReporter),
        ))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Replace the layout, e.g. with its canonicalized form once the mirror
    /// root exists.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Build the mirror tree from the native tree. Every write is remembered
    /// so that late notifications for it are recognised as echoes.
    pub fn initial_sync(&mut self) -> Result<InitialSyncSummary, SyncError> {
        let summary = bootstrap::initial_sync(&self.layout)?;
        for (path, digest) in &summary.fingerprints {
            self.fingerprints.remember(path, digest.clone());
        }
        Ok(summary)
    }

    pub fn handle(&mut self, event: ChangeEvent) -> Dispatch {
        if event.op != ChangeOp::Write || event.path.is_dir() {
            self.stats.ignored += 1;
            return Dispatch::Ignored;
        }

        let classified = self.layout.classify(&event.path);
        let (Some(side), Some(kind), Some(paths)) =
            (classified.side(), classified.kind(), classified.paths())
        else {
            tracing::debug!("unrelated: {}", event.path.display());
            self.stats.ignored += 1;
            return Dispatch::Ignored;
        };

        let verdict = reverb::decide(&self.state, side, &paths.source, event.at, &self.spacing);
        if verdict != Verdict::Pass {
            return self.suppress(verdict, &paths.source);
        }

        let bytes = match read(&paths.source) {
            Ok(bytes) => bytes,
            Err(e) => {
                let failed = Outcome::Failed {
                    error: e.to_string(),
                };
                return self.finish(side, kind, paths, failed);
            }
        };
        if self.fingerprints.is_echo(&paths.source, &bytes) {
            return self.suppress(Verdict::Echo, &paths.source);
        }

        let paths = paths.clone();
        let result = match &classified {
            Classified::NativeObject(p) => self.native_object(p, &bytes),
            Classified::MirrorObject(p) => self.mirror_object(p, &bytes),
            Classified::NativeScript(p) | Classified::MirrorScript(p) => self.copy_script(p, &bytes),
            Classified::Unrelated => return Dispatch::Ignored,
        };

        let done = match result {
            Ok(done) => done,
            Err(e) => {
                let failed = Outcome::Failed {
                    error: e.to_string(),
                };
                return self.finish(side, kind, &paths, failed);
            }
        };

        // The write stands even if the manifest step fails.
        self.fingerprints.forget(&paths.source);
        self.fingerprints
            .remember(done.write.path(), fingerprint(&done.content));
        self.state
            .record(side, &paths.source, Instant::now().max(event.at));

        let outcome = match self.register(side, kind, &paths.name) {
            Ok(manifest_updated) => {
                if manifest_updated {
                    self.stats.manifest_appends += 1;
                }
                match done.write {
                    WriteResult::Written { path } => Outcome::Written {
                        target: path,
                        manifest_updated,
                    },
                    WriteResult::Unchanged { path } => Outcome::Unchanged { target: path },
                }
            }
            Err(e) => Outcome::Failed {
                error: e.to_string(),
            },
        };
        self.finish(side, kind, &paths, outcome)
    }

    fn suppress(&mut self, verdict: Verdict, path: &Path) -> Dispatch {
        tracing::debug!("suppressed ({verdict}): {}", path.display());
        match verdict {
            Verdict::Reverb => self.stats.reverb += 1,
            Verdict::Duplicate => self.stats.duplicate += 1,
            Verdict::Echo => self.stats.echo += 1,
            Verdict::Pass => {}
        }
        Dispatch::Suppressed(verdict)
    }

    fn finish(
        &mut self,
        side: Side,
        kind: ResourceKind,
        paths: &ResourcePaths,
        result: Outcome,
    ) -> Dispatch {
        let report = SyncReport {
            timestamp: Utc::now(),
            direction: Direction::from_source(side),
            kind,
            name: paths.name.clone(),
            result,
        };
        if report.result.is_failure() {
            self.stats.failed += 1;
        } else {
            self.stats.processed += 1;
        }
        self.reporter.report(&report);
        self.stats.last = Some(report.clone());
        Dispatch::Processed(report)
    }

    /// Mirror-side writes reference their resource in the manifest. Keyed on
    /// membership, so an entry that failed to land earlier is added by the
    /// next write for the same name.
    fn register(&self, side: Side, kind: ResourceKind, name: &str) -> Result<bool, SyncError> {
        if side != Side::Mirror {
            return Ok(false);
        }
        self.manifest.ensure_entry(kind.group(), name, kind)
    }

    fn native_object(
        &mut self,
        paths: &ResourcePaths,
        bytes: &[u8],
    ) -> Result<Translated, SyncError> {
        let resource = decode_native(&paths.source, bytes)?;
        let text = native_to_mirror(&resource).into_bytes();
        let write = atomic_write(&paths.counterpart, &text)?;
        Ok(Translated {
            write,
            content: text,
        })
    }

    fn mirror_object(
        &mut self,
        paths: &ResourcePaths,
        bytes: &[u8],
    ) -> Result<Translated, SyncError> {
        let text = utf8(&paths.source, bytes)?;
        let base = if paths.counterpart.is_file() {
            decode_native(&paths.counterpart, &read(&paths.counterpart)?)?
        } else {
            NativeResource::skeleton()
        };

        let merged = mirror_to_native(text, &base).map_err(|source| SyncError::Parse {
            path: paths.source.clone(),
            source,
        })?;
        let xml = write_native(&merged)
            .map_err(|source| SyncError::Native {
                path: paths.counterpart.clone(),
                source,
            })?
            .into_bytes();

        let write = atomic_write(&paths.counterpart, &xml)?;
        Ok(Translated { write, content: xml })
    }

    fn copy_script(
        &mut self,
        paths: &ResourcePaths,
        bytes: &[u8],
    ) -> Result<Translated, SyncError> {
        let write = atomic_write(&paths.counterpart, bytes)?;
        Ok(Translated {
            write,
            content: bytes.to_vec(),
        })
    }
}

/// A finished translation: what was written where.
struct Translated {
    write: WriteResult,
    content: Vec<u8>,
}

fn utf8<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a str, SyncError> {
    std::str::from_utf8(bytes).map_err(|source| SyncError::Utf8 {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn decode_native(path: &Path, bytes: &[u8]) -> Result<NativeResource, SyncError> {
    parse_native(utf8(path, bytes)?).map_err(|source| SyncError::Native {
        path: path.to_path_buf(),
        source,
    })
}
