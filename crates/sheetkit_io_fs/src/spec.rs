//! Routing specification models and top-level error types.

use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Output destination strategy for serialized workbook bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumXlsxOutput {
    /// Hand bytes back to the caller for streaming; no side effect.
    Download,
    /// Write a backup copy to the backup directory.
    Backup,
    /// Hand bytes back for streaming and write a backup copy.
    #[default]
    Both,
}

impl EnumXlsxOutput {
    /// Whether this strategy writes a backup copy to disk.
    pub fn if_backup(self) -> bool {
        matches!(self, Self::Backup | Self::Both)
    }

    /// Whether the caller is expected to stream the returned bytes.
    pub fn if_download(self) -> bool {
        matches!(self, Self::Download | Self::Both)
    }
}

/// Convenience save method used by the short route constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSaveMethod {
    /// Download and keep a local backup.
    #[default]
    Local,
    /// Download only.
    Download,
}

impl From<EnumSaveMethod> for EnumXlsxOutput {
    fn from(method: EnumSaveMethod) -> Self {
        match method {
            EnumSaveMethod::Local => EnumXlsxOutput::Both,
            EnumSaveMethod::Download => EnumXlsxOutput::Download,
        }
    }
}

/// Strategy that resolved a lookup string into a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumLookupStrategy {
    /// Named key under `[paths]` in route settings.
    SettingsKey,
    /// `~/`-prefixed path under the settings root directory.
    VirtualPath,
    /// The lookup string used verbatim as absolute or relative path.
    LiteralPath,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Resolved path plus the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResolvedPath {
    /// Existing filesystem path.
    pub path: PathBuf,
    /// Lookup strategy that matched.
    pub strategy: EnumLookupStrategy,
}

/// Plain-string descriptor handed to output routing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecFileDescriptor {
    /// File name used for download and backup.
    pub file_name: String,
    /// Resolved backup directory; `None` means no backup side effect.
    pub backup_path: Option<PathBuf>,
}

/// Result of routing serialized bytes to their destination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecOutputOutcome {
    /// Serialized workbook bytes, always returned.
    pub bytes: Vec<u8>,
    /// Backup file written by this call.
    pub path_backup: Option<PathBuf>,
    /// Caller should stream `bytes` as a download.
    pub if_download: bool,
    /// Swallowed side-effect failure.
    pub warning: Option<String>,
}

/// Routing failures surfaced before any workbook work begins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No lookup strategy produced an existing backup directory.
    #[error(
        "No backup directory could be found using {lookup:?}; checked route settings keys, \
         virtual paths and literal paths."
    )]
    BackupDirNotFound {
        /// Lookup string supplied by the caller.
        lookup: String,
    },
    /// Output file name is empty or contains path components.
    #[error("Invalid output file name: {0:?}")]
    InvalidFileName(String),
    /// Backup destination escapes its directory or is a symlink.
    #[error("Unsafe backup destination: {0}")]
    UnsafeDestination(String),
    /// Route settings could not be read, substituted or parsed.
    #[error("Route settings error: {0}")]
    Settings(String),
    /// Filesystem access failed.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
