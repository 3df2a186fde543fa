use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::settings::SpecRouteSettings;
use crate::spec::{EnumLookupStrategy, RouteError, SpecResolvedPath};

////////////////////////////////////////////////////////////////////////////////
// #region LookupStrategies

const C_VIRTUAL_PREFIX: &str = "~/";

/// Map a `~/` virtual path onto the settings root directory.
fn _map_virtual_path(value: &str, settings: &SpecRouteSettings) -> Option<PathBuf> {
    let c_rel = value
        .strip_prefix(C_VIRTUAL_PREFIX)
        .or_else(|| value.strip_prefix("~\\"))?;
    let path_root = settings.root_dir.as_ref()?;
    Some(path_root.join(c_rel))
}

/// Ordered candidate paths for one lookup string.
///
/// 1. settings key → its value (itself virtual-mapped when `~/`-prefixed),
/// 2. lookup string as virtual path,
/// 3. lookup string verbatim.
pub(crate) fn derive_lookup_candidates(
    lookup: &str,
    settings: &SpecRouteSettings,
) -> Vec<(EnumLookupStrategy, PathBuf)> {
    let mut l_candidates = Vec::new();

    if let Some(c_value) = settings.lookup(lookup) {
        let path_value =
            _map_virtual_path(c_value, settings).unwrap_or_else(|| PathBuf::from(c_value));
        l_candidates.push((EnumLookupStrategy::SettingsKey, path_value));
    }
    if let Some(path_virtual) = _map_virtual_path(lookup, settings) {
        l_candidates.push((EnumLookupStrategy::VirtualPath, path_virtual));
    }
    if !lookup.trim().is_empty() {
        l_candidates.push((EnumLookupStrategy::LiteralPath, PathBuf::from(lookup)));
    }

    l_candidates
}

/// Resolve `lookup` to an existing directory.
pub fn resolve_dir_path(lookup: &str, settings: &SpecRouteSettings) -> Option<SpecResolvedPath> {
    derive_lookup_candidates(lookup, settings)
        .into_iter()
        .find(|(_, path)| path.is_dir())
        .map(|(strategy, path)| SpecResolvedPath { path, strategy })
}

/// Resolve `lookup` to an existing regular file.
pub fn resolve_file_path(lookup: &str, settings: &SpecRouteSettings) -> Option<SpecResolvedPath> {
    derive_lookup_candidates(lookup, settings)
        .into_iter()
        .find(|(_, path)| path.is_file())
        .map(|(strategy, path)| SpecResolvedPath { path, strategy })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Validate that `file_name` is a single normal path component.
pub fn validate_file_name(file_name: &str) -> Result<(), RouteError> {
    if file_name.trim().is_empty() {
        return Err(RouteError::InvalidFileName(file_name.to_string()));
    }
    let l_components: Vec<Component<'_>> = Path::new(file_name).components().collect();
    match l_components.as_slice() {
        [Component::Normal(_)] if !file_name.contains(['/', '\\']) => Ok(()),
        _ => Err(RouteError::InvalidFileName(file_name.to_string())),
    }
}

/// Reject backup destinations that escape `path_dir_root` or are symlinks.
pub(crate) fn validate_destination_path_safety(
    path_dst_item: &Path,
    path_dir_root: &Path,
) -> Result<(), RouteError> {
    let path_dir_root_abs = _absolutize_path(path_dir_root);
    let path_dst_item_abs = _absolutize_path(path_dst_item);

    if !path_dst_item_abs.starts_with(&path_dir_root_abs) {
        return Err(RouteError::UnsafeDestination(format!(
            "{} escapes backup directory {}",
            path_dst_item.display(),
            path_dir_root.display()
        )));
    }

    match fs::symlink_metadata(&path_dir_root_abs) {
        Ok(meta_root) if meta_root.file_type().is_symlink() => {
            return Err(RouteError::UnsafeDestination(format!(
                "backup directory is a symbolic link: {}",
                path_dir_root.display()
            )));
        }
        Ok(_) => {}
        Err(e) => {
            return Err(RouteError::Io {
                path: path_dir_root.to_path_buf(),
                message: e.to_string(),
            });
        }
    }

    match fs::symlink_metadata(&path_dst_item_abs) {
        Ok(meta_dst_item) if meta_dst_item.file_type().is_symlink() => {
            Err(RouteError::UnsafeDestination(format!(
                "destination is an existing symlink: {}",
                path_dst_item.display()
            )))
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RouteError::Io {
            path: path_dst_item.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
