//! Reverb Suppressor.
//!
//! Every write the engine performs on one tree is observed again by the
//! watcher as a change on that tree. [`decide`] drops such echoes by timing:
//!
//! * **reverb**: the opposite side was translated less than
//!   `Spacing::reverb` ago;
//! * **duplicate**: the same path on the same side was translated less than
//!   `Spacing::dedup` ago.
//!
//! [`Fingerprints`] strengthens the timing rule with content hashes: a file
//! whose bytes equal what the engine itself last wrote there is an echo no
//! matter how late its notification arrives.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};

use gmxsync_core::config::{DEFAULT_DEDUP_SPACING_MS, DEFAULT_REVERB_SPACING_MS};
use gmxsync_core::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Native,
    Mirror,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Native => Side::Mirror,
            Side::Mirror => Side::Native,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Native => "native",
            Side::Mirror => "mirror",
        })
    }
}

/// Last translation triggered from one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub at: Option<Instant>,
    pub path: Option<PathBuf>,
}

/// When each side last triggered a translation. Zero-valued at startup and
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    native: Track,
    mirror: Track,
}

impl SyncState {
    pub fn track(&self, side: Side) -> &Track {
        match side {
            Side::Native => &self.native,
            Side::Mirror => &self.mirror,
        }
    }

    /// Mark `side` as the most recent writer.
    pub fn record(&mut self, side: Side, path: &Path, at: Instant) {
        let track = match side {
            Side::Native => &mut self.native,
            Side::Mirror => &mut self.mirror,
        };
        track.at = Some(at);
        track.path = Some(path.to_path_buf());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacing {
    pub reverb: Duration,
    pub dedup: Duration,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            reverb: Duration::from_millis(DEFAULT_REVERB_SPACING_MS),
            dedup: Duration::from_millis(DEFAULT_DEDUP_SPACING_MS),
        }
    }
}

impl Spacing {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            reverb: config.reverb_spacing(),
            dedup: config.dedup_spacing(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    /// The opposite side wrote within the reverb window.
    Reverb,
    /// Same path, same side, within the dedup window.
    Duplicate,
    /// The file holds exactly what the engine last wrote to it.
    Echo,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "pass",
            Verdict::Reverb => "reverb",
            Verdict::Duplicate => "duplicate",
            Verdict::Echo => "echo",
        })
    }
}

/// Timing verdict for a change on `side` at `path` observed at `at`.
///
/// Events stamped before the recorded time count as zero distance.
pub fn decide(state: &SyncState, side: Side, path: &Path, at: Instant, spacing: &Spacing) -> Verdict {
    let opposite = state.track(side.opposite());
    if let Some(then) = opposite.at {
        if at.saturating_duration_since(then) <= spacing.reverb {
            return Verdict::Reverb;
        }
    }

    let own = state.track(side);
    if let (Some(then), Some(last)) = (own.at, own.path.as_deref()) {
        if last == path && at.saturating_duration_since(then) <= spacing.dedup {
            return Verdict::Duplicate;
        }
    }
    Verdict::Pass
}

/// SHA-256 hex digest of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Digest of the last bytes the engine wrote to each target. In memory only.
#[derive(Debug, Clone, Default)]
pub struct Fingerprints {
    written: HashMap<PathBuf, String>,
}

impl Fingerprints {
    pub fn remember(&mut self, path: &Path, digest: String) {
        self.written.insert(path.to_path_buf(), digest);
    }

    /// Drop the entry for a file whose content now comes from a user edit.
    pub fn forget(&mut self, path: &Path) {
        self.written.remove(path);
    }

    pub fn is_echo(&self, path: &Path, bytes: &[u8]) -> bool {
        self.written
            .get(path)
            .map(|digest| *digest == fingerprint(bytes))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MIRROR: &str = "/mirror/obj_player.gmo";
    const NATIVE: &str = "/project/objects/obj_player.object.gmx";

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[rstest]
    #[case::echo_of_native_write(200, Verdict::Reverb)]
    #[case::at_the_boundary(1_000, Verdict::Reverb)]
    #[case::after_the_window(1_200, Verdict::Pass)]
    fn mirror_change_after_native_translation(#[case] after_ms: u64, #[case] expected: Verdict) {
        let t0 = Instant::now();
        let mut state = SyncState::default();
        state.record(Side::Native, Path::new(NATIVE), t0);

        let verdict = decide(
            &state,
            Side::Mirror,
            Path::new(MIRROR),
            t0 + ms(after_ms),
            &Spacing::default(),
        );
        assert_eq!(verdict, expected);
    }

    #[test]
    fn repeated_notification_for_one_write_is_duplicate() {
        let t0 = Instant::now();
        let mut state = SyncState::default();
        state.record(Side::Mirror, Path::new(MIRROR), t0);

        let spacing = Spacing::default();
        let second = decide(&state, Side::Mirror, Path::new(MIRROR), t0 + ms(10), &spacing);
        assert_eq!(second, Verdict::Duplicate);

        let later = decide(&state, Side::Mirror, Path::new(MIRROR), t0 + ms(150), &spacing);
        assert_eq!(later, Verdict::Pass);
    }

    #[test]
    fn other_path_on_same_side_is_not_duplicate() {
        let t0 = Instant::now();
        let mut state = SyncState::default();
        state.record(Side::Mirror, Path::new(MIRROR), t0);

        let verdict = decide(
            &state,
            Side::Mirror,
            Path::new("/mirror/obj_enemy.gmo"),
            t0 + ms(10),
            &Spacing::default(),
        );
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn fresh_state_passes_everything() {
        let verdict = decide(
            &SyncState::default(),
            Side::Native,
            Path::new(NATIVE),
            Instant::now(),
            &Spacing::default(),
        );
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn events_stamped_before_the_record_are_reverb() {
        let t0 = Instant::now();
        let mut state = SyncState::default();
        state.record(Side::Native, Path::new(NATIVE), t0 + ms(500));

        let verdict = decide(&state, Side::Mirror, Path::new(MIRROR), t0, &Spacing::default());
        assert_eq!(verdict, Verdict::Reverb);
    }

    #[test]
    fn fingerprints_match_only_identical_bytes() {
        let mut prints = Fingerprints::default();
        let path = Path::new(MIRROR);
        prints.remember(path, fingerprint(b"depth = 0\n"));

        assert!(prints.is_echo(path, b"depth = 0\n"));
        assert!(!prints.is_echo(path, b"depth = 1\n"));
        assert!(!prints.is_echo(Path::new(NATIVE), b"depth = 0\n"));

        prints.forget(path);
        assert!(!prints.is_echo(path, b"depth = 0\n"));
        assert!(prints.is_empty());
    }
}
