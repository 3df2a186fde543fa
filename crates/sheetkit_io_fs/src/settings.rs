//! Route settings: named path keys and the virtual-path root.
//!
//! Settings are read from TOML:
//!
//! ```toml
//! root_dir = "/srv/reports"
//!
//! [paths]
//! ReportBackups = "~/backups"
//! EmployeeTemplate = "/srv/templates/employees.xlsx"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::spec::RouteError;

/// Environment variable overriding `root_dir`.
pub const C_ENV_ROOT_DIR: &str = "SHEETKIT_ROOT_DIR";

/// Lookup table consulted before literal paths.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SpecRouteSettings {
    /// Base directory for `~/` virtual paths.
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    /// Named keys mapping to directory or file strings.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

impl SpecRouteSettings {
    /// Return settings with `root_dir` replaced.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    /// Return settings with one named path added.
    pub fn with_path(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.paths.insert(key.into(), value.into());
        self
    }

    /// Parse settings from TOML text after `${VAR}` substitution.
    pub fn from_toml_str(contents: &str) -> Result<Self, RouteError> {
        let contents = substitute_env_vars(contents)?;
        toml::from_str(&contents)
            .map_err(|e| RouteError::Settings(format!("Failed to parse TOML: {e}")))
    }

    /// Look up a named path key.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.paths.get(key).map(String::as_str)
    }
}

/// Load settings from a TOML file and apply environment overrides.
pub fn load_route_settings(path: impl AsRef<Path>) -> Result<SpecRouteSettings, RouteError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| RouteError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut settings = SpecRouteSettings::from_toml_str(&contents)?;
    apply_env_overrides(&mut settings);

    tracing::debug!(
        path = %path.display(),
        n_keys = settings.paths.len(),
        "Loaded route settings"
    );
    Ok(settings)
}

fn apply_env_overrides(settings: &mut SpecRouteSettings) {
    if let Ok(value) = std::env::var(C_ENV_ROOT_DIR)
        && !value.trim().is_empty()
    {
        settings.root_dir = Some(PathBuf::from(value));
    }
}

/// Substitute `${VAR}` placeholders; comment lines are left untouched.
fn substitute_env_vars(input: &str) -> Result<String, RouteError> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| RouteError::Settings(format!("Invalid placeholder pattern: {e}")))?;

    let mut c_out = String::with_capacity(input.len());
    let mut l_missing: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            c_out.push_str(line);
            c_out.push('\n');
            continue;
        }

        let c_line = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let c_var = &caps[1];
            match std::env::var(c_var) {
                Ok(value) => value,
                Err(_) => {
                    if !l_missing.iter().any(|v| v == c_var) {
                        l_missing.push(c_var.to_string());
                    }
                    String::new()
                }
            }
        });
        c_out.push_str(&c_line);
        c_out.push('\n');
    }

    if !l_missing.is_empty() {
        return Err(RouteError::Settings(format!(
            "Missing environment variables: {}",
            l_missing.join(", ")
        )));
    }
    Ok(c_out)
}
