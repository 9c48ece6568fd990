//! Sync configuration.
//!
//! Loaded from `<project>/gmxsync.yaml` when that file exists; every key is
//! optional and falls back to [`SyncConfig::default`]. Relative paths are
//! resolved against the project directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "gmxsync.yaml";
pub const DEFAULT_MIRROR_DIR: &str = "NiceObjects";
pub const DEFAULT_REVERB_SPACING_MS: u64 = 1_000;
pub const DEFAULT_DEDUP_SPACING_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// GameMaker project directory (`example.gmx`).
    pub project_dir: PathBuf,
    /// Mirror root; created at startup and removed on clean shutdown.
    pub mirror_dir: PathBuf,
    pub objects_dir: PathBuf,
    pub scripts_dir: PathBuf,
    /// Manifest path; auto-detected as the single `*.project.gmx` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Suffix of native object files, including the leading dot.
    pub object_suffix: String,
    /// Extension of mirror object files, without the dot.
    pub mirror_ext: String,
    /// Extension of script files on both sides, without the dot.
    pub script_ext: String,
    pub reverb_spacing_ms: u64,
    pub dedup_spacing_ms: u64,
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            mirror_dir: PathBuf::from(DEFAULT_MIRROR_DIR),
            objects_dir: PathBuf::from("objects"),
            scripts_dir: PathBuf::from("scripts"),
            manifest: None,
            object_suffix: ".object.gmx".to_string(),
            mirror_ext: "gmo".to_string(),
            script_ext: "gml".to_string(),
            reverb_spacing_ms: DEFAULT_REVERB_SPACING_MS,
            dedup_spacing_ms: DEFAULT_DEDUP_SPACING_MS,
            queue_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Config for `project_dir`, reading `gmxsync.yaml` from it if present.
    pub fn load_for_project(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_file(&path)?
        } else {
            Self::default()
        };
        config.project_dir = project_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.object_suffix.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "object_suffix '{}' must start with '.'",
                self.object_suffix
            )));
        }
        for (key, ext) in [("mirror_ext", &self.mirror_ext), ("script_ext", &self.script_ext)] {
            if ext.is_empty() || ext.contains('.') {
                return Err(ConfigError::Invalid(format!(
                    "{key} '{ext}' must be a bare extension"
                )));
            }
        }
        if self.mirror_ext == self.script_ext {
            return Err(ConfigError::Invalid(
                "mirror_ext and script_ext must differ".to_string(),
            ));
        }
        if self.dedup_spacing_ms >= self.reverb_spacing_ms {
            return Err(ConfigError::Invalid(format!(
                "dedup_spacing_ms ({}) must be smaller than reverb_spacing_ms ({})",
                self.dedup_spacing_ms, self.reverb_spacing_ms
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn objects_root(&self) -> PathBuf {
        self.resolve(&self.objects_dir)
    }

    pub fn scripts_root(&self) -> PathBuf {
        self.resolve(&self.scripts_dir)
    }

    /// Mirror root. Relative paths are resolved against the project's
    /// parent directory, next to the project rather than inside it.
    pub fn mirror_root(&self) -> PathBuf {
        if self.mirror_dir.is_absolute() {
            return self.mirror_dir.clone();
        }
        let parent = self
            .project_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        parent.join(&self.mirror_dir)
    }

    /// The manifest path, detecting the single `*.project.gmx` if unset.
    pub fn manifest_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(manifest) = &self.manifest {
            return Ok(self.resolve(manifest));
        }
        let entries = std::fs::read_dir(&self.project_dir).map_err(|source| ConfigError::Io {
            path: self.project_dir.clone(),
            source,
        })?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(".project.gmx"))
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        found
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::ManifestNotFound(self.project_dir.clone()))
    }

    pub fn reverb_spacing(&self) -> Duration {
        Duration::from_millis(self.reverb_spacing_ms)
    }

    pub fn dedup_spacing(&self) -> Duration {
        Duration::from_millis(self.dedup_spacing_ms)
    }
}
