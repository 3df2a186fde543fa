//! `sheetkit_io_xlsx` v1:
//! Typed record collections projected into XLSX worksheets.
//!
//! Modules:
//! - `conf`     : constants and default presets
//! - `spec`     : cell values, formats, options, reports and errors
//! - `util`     : pure helper functions
//! - `record`   : record traits and named collections
//! - `schema`   : column schema resolution with companion fallback
//! - `book`     : in-memory workbook and its serialization
//! - `reader`   : workbook loading (values plus style sidecar)
//! - `locate`   : sheet lookup/creation and frontier row
//! - `project`  : row projection with date formatting
//! - `exporter` : load-or-create, per-collection pipeline, output routing
pub mod book;
pub mod conf;
pub mod exporter;
pub mod locate;
pub mod project;
mod reader;
pub mod record;
pub mod schema;
pub mod spec;
pub mod util;

pub use book::{SpecCellSelection, XlsxBook, XlsxCell, XlsxSheet};
pub use conf::{
    C_NUM_FORMAT_DATE_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL, XLSX_CONTENT_TYPE,
};
pub use exporter::{XlsxExporter, export_collections, export_xlsx};
pub use locate::{SpecSheetLocation, locate_sheet};
pub use project::{SpecProjection, project_rows};
pub use record::{ExportRecord, SpecRecordCollection, SpecRecordType, XlsxRecord};
pub use schema::{
    CompanionBuilder, FieldBuilder, SchemaBuilder, SchemaResolver, SpecColumn, SpecColumnSchema,
    SpecFieldMeta, XlsxCompanion, resolve_schema,
};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumDataKind, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetWrite, SpecXlsxExportOptions, SpecXlsxReport, SpecXlsxValuePolicy, XlsxExportError,
};
pub use util::{parse_cell_address, sanitize_sheet_name, validate_sheet_name};

pub use sheetkit_io_fs::{
    EnumSaveMethod, EnumXlsxOutput, EnumXlsxSource, SpecFileRoute, SpecRouteSettings,
};
