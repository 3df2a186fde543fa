//! XLSX constants and default preset factories.

use crate::spec::{
    SpecAutofitCellsPolicy, SpecCellFormat, SpecXlsxExportOptions, SpecXlsxValuePolicy,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Excel column width upper bound.
pub const N_WIDTH_EXCEL_COL_MAX: usize = 255;

/// Default number format for `Date` and `DateTime` columns.
pub const C_NUM_FORMAT_DATE_DEFAULT: &str = "mm/dd/yyyy hh:mm";
/// MIME type of serialized workbooks.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Header row preset: bold and centered.
pub fn derive_default_header_format() -> SpecCellFormat {
    SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        ..Default::default()
    }
}

/// Date/date-time column preset.
pub fn derive_default_date_format() -> SpecCellFormat {
    SpecCellFormat {
        num_format: Some(C_NUM_FORMAT_DATE_DEFAULT.to_string()),
        ..Default::default()
    }
}

/// Build default export options.
pub fn derive_default_xlsx_export_options() -> SpecXlsxExportOptions {
    SpecXlsxExportOptions {
        fmt_header: derive_default_header_format(),
        fmt_date: derive_default_date_format(),
        fmt_datetime: derive_default_date_format(),
        policy_autofit: SpecAutofitCellsPolicy::default(),
        value_policy: SpecXlsxValuePolicy::default(),
        sheet_name_replace_to: "_".to_string(),
    }
}
