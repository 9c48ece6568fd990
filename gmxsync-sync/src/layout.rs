//! Resource Store Adapter: which tree a path belongs to, and where its
//! counterpart lives.
//!
//! Only direct children of a root are resources; anything nested, or with a
//! suffix that does not match the root, is [`Classified::Unrelated`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gmxsync_core::{ResourceKind, SyncConfig};

use crate::error::{io_err, SyncError};
use crate::reverb::Side;

/// Root directories and file suffixes of both trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub objects_root: PathBuf,
    pub scripts_root: PathBuf,
    pub mirror_root: PathBuf,
    /// Native object suffix including the leading dot (`.object.gmx`).
    pub object_suffix: String,
    /// Mirror object extension without the dot (`gmo`).
    pub mirror_ext: String,
    /// Script extension on both sides without the dot (`gml`).
    pub script_ext: String,
}

/// A resource name and the two files that hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    pub name: String,
    /// The file the change was observed on.
    pub source: PathBuf,
    /// The file in the other tree.
    pub counterpart: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    NativeObject(ResourcePaths),
    NativeScript(ResourcePaths),
    MirrorObject(ResourcePaths),
    MirrorScript(ResourcePaths),
    Unrelated,
}

impl Classified {
    pub fn side(&self) -> Option<Side> {
        match self {
            Classified::NativeObject(_) | Classified::NativeScript(_) => Some(Side::Native),
            Classified::MirrorObject(_) | Classified::MirrorScript(_) => Some(Side::Mirror),
            Classified::Unrelated => None,
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Classified::NativeObject(_) | Classified::MirrorObject(_) => Some(ResourceKind::Object),
            Classified::NativeScript(_) | Classified::MirrorScript(_) => Some(ResourceKind::Script),
            Classified::Unrelated => None,
        }
    }

    pub fn paths(&self) -> Option<&ResourcePaths> {
        match self {
            Classified::NativeObject(p)
            | Classified::NativeScript(p)
            | Classified::MirrorObject(p)
            | Classified::MirrorScript(p) => Some(p),
            Classified::Unrelated => None,
        }
    }
}

impl Layout {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            objects_root: config.objects_root(),
            scripts_root: config.scripts_root(),
            mirror_root: config.mirror_root(),
            object_suffix: config.object_suffix.clone(),
            mirror_ext: config.mirror_ext.clone(),
            script_ext: config.script_ext.clone(),
        }
    }

    /// Resolve every root that exists to its canonical form, so that paths
    /// reported by the watcher (which are canonical on some platforms) match.
    pub fn canonicalized(mut self) -> Self {
        for root in [
            &mut self.objects_root,
            &mut self.scripts_root,
            &mut self.mirror_root,
        ] {
            if let Ok(resolved) = root.canonicalize() {
                *root = resolved;
            }
        }
        self
    }

    pub fn classify(&self, path: &Path) -> Classified {
        let Some(parent) = path.parent() else {
            return Classified::Unrelated;
        };
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Classified::Unrelated;
        };

        if parent == self.mirror_root {
            if let Some(name) = strip_ext(file_name, &self.mirror_ext) {
                return Classified::MirrorObject(self.paths(name, path, self.native_object(name)));
            }
            if let Some(name) = strip_ext(file_name, &self.script_ext) {
                return Classified::MirrorScript(self.paths(name, path, self.native_script(name)));
            }
        }
        if parent == self.objects_root {
            if let Some(name) = strip_suffix(file_name, &self.object_suffix) {
                return Classified::NativeObject(self.paths(name, path, self.mirror_object(name)));
            }
        }
        if parent == self.scripts_root {
            if let Some(name) = strip_ext(file_name, &self.script_ext) {
                return Classified::NativeScript(self.paths(name, path, self.mirror_script(name)));
            }
        }
        Classified::Unrelated
    }

    /// Whether the file in the other tree already exists.
    pub fn counterpart_exists(&self, path: &Path) -> bool {
        self.classify(path)
            .paths()
            .map(|p| p.counterpart.is_file())
            .unwrap_or(false)
    }

    fn paths(&self, name: &str, source: &Path, counterpart: PathBuf) -> ResourcePaths {
        ResourcePaths {
            name: name.to_string(),
            source: source.to_path_buf(),
            counterpart,
        }
    }

    pub fn native_object(&self, name: &str) -> PathBuf {
        self.objects_root
            .join(format!("{name}{}", self.object_suffix))
    }

    pub fn native_script(&self, name: &str) -> PathBuf {
        self.scripts_root.join(format!("{name}.{}", self.script_ext))
    }

    pub fn mirror_object(&self, name: &str) -> PathBuf {
        self.mirror_root.join(format!("{name}.{}", self.mirror_ext))
    }

    pub fn mirror_script(&self, name: &str) -> PathBuf {
        self.mirror_root.join(format!("{name}.{}", self.script_ext))
    }

    /// Path of `name` on `side`.
    pub fn resource_path(&self, side: Side, kind: ResourceKind, name: &str) -> PathBuf {
        match (side, kind) {
            (Side::Native, ResourceKind::Object) => self.native_object(name),
            (Side::Native, ResourceKind::Script) => self.native_script(name),
            (Side::Mirror, ResourceKind::Object) => self.mirror_object(name),
            (Side::Mirror, ResourceKind::Script) => self.mirror_script(name),
        }
    }

    /// Sorted names of every `kind` resource present on `side`.
    pub fn names(&self, side: Side, kind: ResourceKind) -> Result<Vec<String>, SyncError> {
        let (root, suffix) = match (side, kind) {
            (Side::Native, ResourceKind::Object) => (&self.objects_root, self.object_suffix.clone()),
            (Side::Native, ResourceKind::Script) => (&self.scripts_root, format!(".{}", self.script_ext)),
            (Side::Mirror, ResourceKind::Object) => (&self.mirror_root, format!(".{}", self.mirror_ext)),
            (Side::Mirror, ResourceKind::Script) => (&self.mirror_root, format!(".{}", self.script_ext)),
        };

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(root, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| strip_suffix(n, &suffix))
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn strip_suffix<'a>(file_name: &'a str, suffix: &str) -> Option<&'a str> {
    file_name
        .strip_suffix(suffix)
        .filter(|name| !name.is_empty() && !name.starts_with('.'))
}

fn strip_ext<'a>(file_name: &'a str, ext: &str) -> Option<&'a str> {
    file_name
        .strip_suffix(ext)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|name| !name.is_empty() && !name.starts_with('.'))
}
