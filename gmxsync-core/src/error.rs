//! Error types for gmxsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding or encoding a native `.object.gmx` document.
#[derive(Debug, Error)]
pub enum NativeError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The root element is not `<object>`.
    #[error("expected <object> root element, found <{0}>")]
    UnexpectedRoot(String),

    /// An element carries a value that does not fit its schema type.
    #[error("invalid value for <{element}> at byte {offset}: {reason}")]
    InvalidValue {
        element: String,
        offset: usize,
        reason: String,
    },

    /// quick-xml failed while writing.
    #[error("XML write error: {0}")]
    Write(#[from] quick_xml::Error),

    #[error("XML output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised by manifest (`*.project.gmx`) operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed manifest XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The append target group does not exist in the manifest.
    #[error("manifest has no group named '{0}'")]
    UnknownGroup(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No `*.project.gmx` manifest could be located.
    #[error("no *.project.gmx manifest found in {0}")]
    ManifestNotFound(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),
}
