//! `sheetkit_io_fs` v1:
//! File routing boundary for workbook exports.
//!
//! Modules:
//! - `settings` : TOML route settings (named paths, virtual-path root)
//! - `spec`     : enums/descriptors/errors
//! - `route`    : template source, output routing, per-request file route
//! - `util`     : path lookup strategies and destination safety checks

pub mod route;
pub mod settings;
pub mod spec;
mod util;

pub use route::{EnumXlsxSource, SpecFileRoute};
pub use settings::{C_ENV_ROOT_DIR, SpecRouteSettings, load_route_settings};
pub use spec::{
    EnumLookupStrategy, EnumSaveMethod, EnumXlsxOutput, RouteError, SpecFileDescriptor,
    SpecOutputOutcome, SpecResolvedPath,
};
pub use util::{resolve_dir_path, resolve_file_path, validate_file_name};
