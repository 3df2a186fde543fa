//! Shared XLSX export models, options, reports and errors.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use sheetkit_io_fs::RouteError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields inherit from the base format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Whether every field is unset.
    pub fn is_empty(&self) -> bool {
        *self == SpecCellFormat::default()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Typed cell value produced by a record field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Bool(bool),
    /// Date-time value; serialized as an Excel serial number.
    DateTime(NaiveDateTime),
}

impl EnumCellValue {
    /// Whether the value renders as an empty cell.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Text content when this is a string cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for EnumCellValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDateTime> for EnumCellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for EnumCellValue {
    fn from(value: NaiveDate) -> Self {
        Self::DateTime(value.and_time(chrono::NaiveTime::default()))
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for EnumCellValue {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64);

impl<T> From<Option<T>> for EnumCellValue
where
    T: Into<EnumCellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataKind

/// Semantic data kind attached to a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumDataKind {
    /// Plain text (default).
    #[default]
    Text,
    /// Calendar date.
    Date,
    /// Date and time of day.
    DateTime,
    /// Time of day.
    Time,
    /// Elapsed duration.
    Duration,
    /// Currency amount.
    Currency,
    /// Text spanning several lines.
    MultilineText,
    /// E-mail address.
    EmailAddress,
    /// Telephone number.
    PhoneNumber,
    /// URL.
    Url,
    /// Postal code.
    PostalCode,
}

impl EnumDataKind {
    /// Kinds whose written range receives a date/time number format.
    pub fn if_date_formatted(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy applied once per sheet at serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Replacement text for non-finite numbers, which workbooks cannot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
        }
    }
}

/// Export-wide options controlling formats, autofit and sheet naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxExportOptions {
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Format merged onto `Date` columns.
    pub fmt_date: SpecCellFormat,
    /// Format merged onto `DateTime` columns.
    pub fmt_datetime: SpecCellFormat,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Non-finite number replacement.
    pub value_policy: SpecXlsxValuePolicy,
    /// Replacement for illegal characters in type-derived sheet names.
    pub sheet_name_replace_to: String,
}

impl Default for SpecXlsxExportOptions {
    fn default() -> Self {
        crate::conf::derive_default_xlsx_export_options()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// One collection written to one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetWrite {
    /// Target sheet name.
    pub sheet_name: String,
    /// Record type simple name.
    pub type_name: String,
    /// Sheet was created (header written) by this write.
    pub if_new_sheet: bool,
    /// First data row written (0-based).
    pub idx_row_start: u32,
    /// Number of data rows written.
    pub n_rows: usize,
}

/// Cumulative export report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheet writes in processing order.
    pub sheets: Vec<SpecSheetWrite>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Size of the last serialized workbook.
    pub n_bytes: usize,
    /// Backup file written by the last run.
    pub path_backup: Option<PathBuf>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Total data rows written to `sheet_name` across all writes.
    pub fn n_rows_written(&self, sheet_name: &str) -> usize {
        self.sheets
            .iter()
            .filter(|write| write.sheet_name == sheet_name)
            .map(|write| write.n_rows)
            .sum()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Export failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XlsxExportError {
    /// File route could not be constructed.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// Collection has no items to derive a schema from.
    #[error("Record collection {name:?} is empty; a column schema cannot be derived")]
    EmptyCollection {
        /// Collection name, or `<unnamed>`.
        name: String,
    },
    /// Collection mixes record types.
    #[error(
        "Record collection {name:?} mixes record types: expected {expected}, found {found} at item {idx_item}"
    )]
    HeterogeneousCollection {
        /// Collection or sheet name.
        name: String,
        /// Record type of the first item.
        expected: String,
        /// Offending record type.
        found: String,
        /// Offending item index (0-based).
        idx_item: usize,
    },
    /// Sheet name is empty, too long, illegal or already taken.
    #[error("Invalid sheet name {name:?}: {reason}")]
    InvalidSheetName {
        /// Rejected name.
        name: String,
        /// Rejection reason.
        reason: String,
    },
    /// No sheet with this exact name.
    #[error("Sheet not found: {0:?}")]
    SheetNotFound(String),
    /// Cell address is not `ColumnLetterRowNumber` notation.
    #[error("Invalid cell address: {0:?}")]
    InvalidCellAddress(String),
    /// Write would land past the last worksheet row.
    #[error("Row limit exceeded on sheet {sheet_name:?}: row index {idx_row} >= {n_max}")]
    RowLimitExceeded {
        /// Target sheet.
        sheet_name: String,
        /// Offending row index (0-based).
        idx_row: usize,
        /// Worksheet row count limit.
        n_max: usize,
    },
    /// Write would land past the last worksheet column.
    #[error("Column limit exceeded on sheet {sheet_name:?}: column index {idx_col} >= {n_max}")]
    ColumnLimitExceeded {
        /// Target sheet.
        sheet_name: String,
        /// Offending column index (0-based).
        idx_col: usize,
        /// Worksheet column count limit.
        n_max: usize,
    },
    /// Workbook bytes could not be parsed.
    #[error("Failed to read workbook: {0}")]
    Read(String),
    /// Workbook could not be serialized.
    #[error("Failed to write workbook: {0}")]
    Write(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_base_and_overrides_set_fields() {
        let base = SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        };
        let merged = base.with_(SpecCellFormat {
            num_format: Some("mm/dd/yyyy".to_string()),
            align: Some("left".to_string()),
            ..Default::default()
        });

        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.align.as_deref(), Some("left"));
        assert_eq!(merged.num_format.as_deref(), Some("mm/dd/yyyy"));
        assert!(SpecCellFormat::default().is_empty());
        assert!(!merged.is_empty());
    }

    #[test]
    fn cell_value_conversions() {
        assert_eq!(EnumCellValue::from("a"), EnumCellValue::String("a".into()));
        assert_eq!(EnumCellValue::from(3_i32), EnumCellValue::Number(3.0));
        assert_eq!(EnumCellValue::from(true), EnumCellValue::Bool(true));
        assert_eq!(EnumCellValue::from(None::<String>), EnumCellValue::None);
        assert_eq!(EnumCellValue::from(Some(2.5_f64)), EnumCellValue::Number(2.5));

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            EnumCellValue::from(date),
            EnumCellValue::DateTime(date.and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn only_date_kinds_are_formatted() {
        assert!(EnumDataKind::Date.if_date_formatted());
        assert!(EnumDataKind::DateTime.if_date_formatted());
        assert!(!EnumDataKind::Time.if_date_formatted());
        assert!(!EnumDataKind::default().if_date_formatted());
    }

    #[test]
    fn report_sums_rows_per_sheet() {
        let mut report = SpecXlsxReport::default();
        for n_rows in [3, 2] {
            report.sheets.push(SpecSheetWrite {
                sheet_name: "Employees".to_string(),
                type_name: "Employee".to_string(),
                if_new_sheet: false,
                idx_row_start: 1,
                n_rows,
            });
        }
        report.warn("w");
        assert_eq!(report.n_rows_written("Employees"), 5);
        assert_eq!(report.n_rows_written("Other"), 0);
        assert_eq!(report.warnings, vec!["w".to_string()]);
    }
}
