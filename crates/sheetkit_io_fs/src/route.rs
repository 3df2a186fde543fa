//! Source and output routing for workbook bytes.
//!
//! A [`SpecFileRoute`] is built once per export request. Construction resolves
//! and validates the backup directory; the template source is resolved too but
//! an unresolvable template only marks the source invalid, so the exporter can
//! fall back to blank synthesis.

use std::fs;
use std::path::PathBuf;

use crate::settings::SpecRouteSettings;
use crate::spec::{
    EnumSaveMethod, EnumXlsxOutput, RouteError, SpecFileDescriptor, SpecOutputOutcome,
};
use crate::util::{
    resolve_dir_path, resolve_file_path, validate_destination_path_safety, validate_file_name,
};

////////////////////////////////////////////////////////////////////////////////
// #region Source

/// Where the initial workbook bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumXlsxSource {
    /// Synthesize a workbook from the collections being exported.
    Blank,
    /// Load a template workbook from disk.
    Template {
        /// Lookup string supplied by the caller.
        lookup: String,
        /// Resolved template file; `None` when no strategy matched.
        path: Option<PathBuf>,
    },
}

impl EnumXlsxSource {
    /// Resolve a template through the route-settings lookup strategies.
    ///
    /// Never fails: an unresolvable template yields an invalid source.
    pub fn template(lookup: impl Into<String>, settings: &SpecRouteSettings) -> Self {
        let lookup = lookup.into();
        let path = resolve_file_path(&lookup, settings).map(|resolved| {
            tracing::debug!(
                lookup = %lookup,
                path = %resolved.path.display(),
                strategy = ?resolved.strategy,
                "Resolved template source"
            );
            resolved.path
        });
        if path.is_none() {
            tracing::debug!(lookup = %lookup, "Template source did not resolve");
        }
        Self::Template { lookup, path }
    }

    /// Whether [`Self::load`] can produce bytes.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Blank => true,
            Self::Template { path, .. } => path.as_ref().is_some_and(|p| p.is_file()),
        }
    }

    /// Whether this source asks for blank synthesis.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    /// Read the whole template file.
    ///
    /// The file handle is closed before this returns, on every path. `Blank`
    /// has no stored bytes and yields an empty buffer.
    pub fn load(&self) -> Result<Vec<u8>, RouteError> {
        match self {
            Self::Blank => Ok(Vec::new()),
            Self::Template { lookup, path } => {
                let Some(path) = path else {
                    return Err(RouteError::Io {
                        path: PathBuf::from(lookup),
                        message: "template source did not resolve to a file".to_string(),
                    });
                };
                fs::read(path).map_err(|e| RouteError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Output

impl EnumXlsxOutput {
    /// Route `bytes` and return them regardless of side-effect outcome.
    pub fn save(self, bytes: Vec<u8>, descriptor: &SpecFileDescriptor) -> SpecOutputOutcome {
        let mut outcome = SpecOutputOutcome {
            bytes,
            path_backup: None,
            if_download: self.if_download(),
            warning: None,
        };

        if !self.if_backup() {
            return outcome;
        }
        let Some(path_dir_backup) = descriptor.backup_path.as_ref() else {
            tracing::debug!(
                file_name = %descriptor.file_name,
                "No backup path configured; skipping backup write"
            );
            return outcome;
        };

        let path_file_backup = path_dir_backup.join(&descriptor.file_name);
        let res_write = validate_destination_path_safety(&path_file_backup, path_dir_backup)
            .and_then(|_| {
                fs::write(&path_file_backup, &outcome.bytes).map_err(|e| RouteError::Io {
                    path: path_file_backup.clone(),
                    message: e.to_string(),
                })
            });

        match res_write {
            Ok(()) => {
                tracing::info!(
                    path = %path_file_backup.display(),
                    n_bytes = outcome.bytes.len(),
                    "Wrote workbook backup"
                );
                outcome.path_backup = Some(path_file_backup);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Backup write failed; returning bytes anyway");
                outcome.warning = Some(format!("Backup write failed: {err}"));
            }
        }
        outcome
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileRoute

/// Per-request routing: file name, backup directory, source and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileRoute {
    file_name: String,
    backup_path: Option<PathBuf>,
    source: EnumXlsxSource,
    output: EnumXlsxOutput,
}

impl SpecFileRoute {
    /// Build and validate a route.
    ///
    /// `backup_lookup`, when given, must resolve to an existing directory
    /// through the settings key, virtual path or literal path strategies.
    pub fn new(
        file_name: impl Into<String>,
        backup_lookup: Option<&str>,
        source: EnumXlsxSource,
        output: EnumXlsxOutput,
        settings: &SpecRouteSettings,
    ) -> Result<Self, RouteError> {
        let file_name = file_name.into();
        validate_file_name(&file_name)?;

        let backup_path = match backup_lookup {
            None => None,
            Some(lookup) => {
                let resolved = resolve_dir_path(lookup, settings).ok_or_else(|| {
                    RouteError::BackupDirNotFound {
                        lookup: lookup.to_string(),
                    }
                })?;
                tracing::debug!(
                    lookup = %lookup,
                    path = %resolved.path.display(),
                    strategy = ?resolved.strategy,
                    "Resolved backup directory"
                );
                Some(resolved.path)
            }
        };

        Ok(Self {
            file_name,
            backup_path,
            source,
            output,
        })
    }

    /// Blank source, no backup directory.
    pub fn blank(file_name: impl Into<String>, method: EnumSaveMethod) -> Result<Self, RouteError> {
        Self::new(
            file_name,
            None,
            EnumXlsxSource::Blank,
            method.into(),
            &SpecRouteSettings::default(),
        )
    }

    /// Blank source, download plus backup into `backup_lookup`.
    pub fn blank_with_backup(
        file_name: impl Into<String>,
        backup_lookup: &str,
        settings: &SpecRouteSettings,
    ) -> Result<Self, RouteError> {
        Self::new(
            file_name,
            Some(backup_lookup),
            EnumXlsxSource::Blank,
            EnumXlsxOutput::Both,
            settings,
        )
    }

    /// Template source, no backup directory.
    pub fn template(
        source_lookup: &str,
        file_name: impl Into<String>,
        method: EnumSaveMethod,
        settings: &SpecRouteSettings,
    ) -> Result<Self, RouteError> {
        Self::new(
            file_name,
            None,
            EnumXlsxSource::template(source_lookup, settings),
            method.into(),
            settings,
        )
    }

    /// Template source, download plus backup into `backup_lookup`.
    pub fn template_with_backup(
        source_lookup: &str,
        file_name: impl Into<String>,
        backup_lookup: &str,
        settings: &SpecRouteSettings,
    ) -> Result<Self, RouteError> {
        Self::new(
            file_name,
            Some(backup_lookup),
            EnumXlsxSource::template(source_lookup, settings),
            EnumXlsxOutput::Both,
            settings,
        )
    }

    /// Output file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Resolved backup directory.
    pub fn backup_path(&self) -> Option<&PathBuf> {
        self.backup_path.as_ref()
    }

    /// Initial workbook source.
    pub fn source(&self) -> &EnumXlsxSource {
        &self.source
    }

    /// Output strategy.
    pub fn output(&self) -> EnumXlsxOutput {
        self.output
    }

    /// Plain descriptor handed to output routing.
    pub fn descriptor(&self) -> SpecFileDescriptor {
        SpecFileDescriptor {
            file_name: self.file_name.clone(),
            backup_path: self.backup_path.clone(),
        }
    }

    /// Route serialized bytes through this route's output strategy.
    pub fn save(&self, bytes: Vec<u8>) -> SpecOutputOutcome {
        self.output.save(bytes, &self.descriptor())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
