//! Row projection: one row per record, one cell per schema column.

use crate::book::XlsxSheet;
use crate::record::ExportRecord;
use crate::schema::SpecColumnSchema;
use crate::spec::{EnumDataKind, SpecXlsxExportOptions, XlsxExportError};
use crate::util::{cast_row_num, convert_cell_value};

/// Rows written by one projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecProjection {
    /// First written row (0-based).
    pub idx_row_start: u32,
    /// One past the last written row.
    pub idx_row_end: u32,
    /// Number of written rows.
    pub n_rows: usize,
}

/// Write `items` below `idx_row_start` following `schema`.
///
/// Every item must be of the schema's record type; a mismatch is rejected
/// before any cell is written. Non-finite numbers are written as the
/// replacement text of `options.value_policy`. `Date`/`DateTime` columns receive the date
/// formats of `options` on the rows written here only, and the sheet is
/// flagged for autofit once.
pub fn project_rows(
    sheet: &mut XlsxSheet,
    schema: &SpecColumnSchema,
    items: &[Box<dyn ExportRecord>],
    idx_row_start: u32,
    options: &SpecXlsxExportOptions,
) -> Result<SpecProjection, XlsxExportError> {
    for (idx_item, item) in items.iter().enumerate() {
        let record_type = item.record_type();
        if record_type.type_id != schema.type_id {
            return Err(XlsxExportError::HeterogeneousCollection {
                name: sheet.name().to_string(),
                expected: schema.type_name.to_string(),
                found: record_type.type_name.to_string(),
                idx_item,
            });
        }
    }

    let n_rows = items.len();
    if n_rows > 0 {
        cast_row_num(idx_row_start as usize + n_rows - 1, sheet.name())?;
    }

    for (idx_item, item) in items.iter().enumerate() {
        let idx_row = idx_row_start as usize + idx_item;
        for (idx_col, col) in schema.columns.iter().enumerate() {
            let value =
                convert_cell_value(item.field_value(&col.source_field), &options.value_policy);
            sheet.write_cell(idx_row, idx_col, value, None)?;
        }
    }

    let idx_row_end = idx_row_start + n_rows as u32;
    if n_rows > 0 {
        for (idx_col, col) in schema.columns.iter().enumerate() {
            if !col.kind.if_date_formatted() {
                continue;
            }
            let fmt_kind = match col.kind {
                EnumDataKind::DateTime => &options.fmt_datetime,
                _ => &options.fmt_date,
            };
            if fmt_kind.is_empty() {
                continue;
            }
            sheet.apply_format(idx_row_start, idx_row_end - 1, idx_col as u16, fmt_kind);
        }
    }
    sheet.request_autofit(&options.policy_autofit);

    tracing::debug!(
        sheet_name = %sheet.name(),
        idx_row_start,
        n_rows,
        "Projected rows"
    );
    Ok(SpecProjection {
        idx_row_start,
        idx_row_end,
        n_rows,
    })
}
