//! Sheet location: find or create the target sheet and its first writable row.

use crate::book::XlsxBook;
use crate::conf::N_NCOLS_EXCEL_MAX;
use crate::schema::SpecColumnSchema;
use crate::spec::{EnumCellValue, SpecCellFormat, XlsxExportError};

/// Where the next rows of a collection go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetLocation {
    /// Target sheet name.
    pub sheet_name: String,
    /// First writable row (0-based); `1` right below a fresh header.
    pub idx_row_start: u32,
    /// Sheet was created by this call.
    pub if_new_sheet: bool,
    /// Header row was written by this call.
    pub if_header_written: bool,
}

/// Find `sheet_name` in `book`, creating it with a header row when missing.
///
/// Lookup is exact and case-sensitive. An existing sheet keeps its header and
/// is appended to below its last populated row; an existing sheet without any
/// populated row gets a header first. An empty schema writes an empty header.
pub fn locate_sheet(
    book: &mut XlsxBook,
    sheet_name: &str,
    schema: &SpecColumnSchema,
    fmt_header: &SpecCellFormat,
) -> Result<SpecSheetLocation, XlsxExportError> {
    if schema.len() > N_NCOLS_EXCEL_MAX {
        return Err(XlsxExportError::ColumnLimitExceeded {
            sheet_name: sheet_name.to_string(),
            idx_col: schema.len() - 1,
            n_max: N_NCOLS_EXCEL_MAX,
        });
    }

    let if_new_sheet = book.sheet(sheet_name).is_none();
    if if_new_sheet {
        book.add_sheet(sheet_name)?;
    }
    let sheet = book
        .sheet_mut(sheet_name)
        .ok_or_else(|| XlsxExportError::SheetNotFound(sheet_name.to_string()))?;

    if let Some(n_row_last) = sheet.idx_row_last() {
        tracing::debug!(
            sheet_name = %sheet_name,
            idx_row_start = n_row_last + 1,
            "Appending below existing rows"
        );
        return Ok(SpecSheetLocation {
            sheet_name: sheet_name.to_string(),
            idx_row_start: n_row_last + 1,
            if_new_sheet: false,
            if_header_written: false,
        });
    }

    for (idx_col, col) in schema.columns.iter().enumerate() {
        sheet.write_cell(
            0,
            idx_col,
            EnumCellValue::from(col.label.as_str()),
            Some(fmt_header),
        )?;
    }
    if schema.is_empty() {
        tracing::warn!(
            sheet_name = %sheet_name,
            type_name = schema.type_name,
            "Record type exports no columns; header row is empty"
        );
    }

    Ok(SpecSheetLocation {
        sheet_name: sheet_name.to_string(),
        idx_row_start: 1,
        if_new_sheet,
        if_header_written: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_default_header_format;
    use crate::record::{SpecRecordType, XlsxRecord};
    use crate::schema::{SchemaBuilder, resolve_schema};

    struct Employee;

    impl XlsxRecord for Employee {
        fn describe(builder: &mut SchemaBuilder) {
            builder.field("name").friendly_name("Name");
            builder.field("age");
        }

        fn cell_value(&self, _field_name: &str) -> EnumCellValue {
            EnumCellValue::None
        }
    }

    struct Nothing;

    impl XlsxRecord for Nothing {
        fn describe(_builder: &mut SchemaBuilder) {}

        fn cell_value(&self, _field_name: &str) -> EnumCellValue {
            EnumCellValue::None
        }
    }

    #[test]
    fn missing_sheet_is_created_with_styled_header() {
        let mut book = XlsxBook::new();
        let schema = resolve_schema(&SpecRecordType::of::<Employee>());
        let fmt_header = derive_default_header_format();

        let location = locate_sheet(&mut book, "Employees", &schema, &fmt_header).unwrap();
        assert_eq!(
            location,
            SpecSheetLocation {
                sheet_name: "Employees".to_string(),
                idx_row_start: 1,
                if_new_sheet: true,
                if_header_written: true,
            }
        );

        let sheet = book.sheet("Employees").unwrap();
        assert_eq!(
            sheet.row_values(0),
            vec![EnumCellValue::from("Name"), EnumCellValue::from("age")]
        );
        assert_eq!(sheet.format(0, 1), Some(&fmt_header));
    }

    #[test]
    fn existing_sheet_appends_below_last_row() {
        let mut book = XlsxBook::new();
        let schema = resolve_schema(&SpecRecordType::of::<Employee>());
        let fmt_header = derive_default_header_format();
        locate_sheet(&mut book, "Employees", &schema, &fmt_header).unwrap();
        book.sheet_mut("Employees")
            .unwrap()
            .write_cell(4, 0, "x".into(), None)
            .unwrap();

        let location = locate_sheet(&mut book, "Employees", &schema, &fmt_header).unwrap();
        assert_eq!(location.idx_row_start, 5);
        assert!(!location.if_new_sheet);
        assert!(!location.if_header_written);
        assert_eq!(book.sheet("Employees").unwrap().value(0, 0), "Name".into());
    }

    #[test]
    fn existing_empty_sheet_receives_header() {
        let mut book = XlsxBook::new();
        book.add_sheet("Employees").unwrap();
        let schema = resolve_schema(&SpecRecordType::of::<Employee>());

        let location =
            locate_sheet(&mut book, "Employees", &schema, &SpecCellFormat::default()).unwrap();
        assert!(!location.if_new_sheet);
        assert!(location.if_header_written);
        assert_eq!(location.idx_row_start, 1);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut book = XlsxBook::new();
        let schema = resolve_schema(&SpecRecordType::of::<Employee>());
        let fmt_header = derive_default_header_format();
        locate_sheet(&mut book, "Employees", &schema, &fmt_header).unwrap();

        assert!(matches!(
            locate_sheet(&mut book, "EMPLOYEES", &schema, &fmt_header),
            Err(XlsxExportError::InvalidSheetName { .. })
        ));
    }

    #[test]
    fn empty_schema_creates_degenerate_sheet() {
        let mut book = XlsxBook::new();
        let schema = resolve_schema(&SpecRecordType::of::<Nothing>());

        let location =
            locate_sheet(&mut book, "Nothing", &schema, &SpecCellFormat::default()).unwrap();
        assert!(location.if_new_sheet);
        assert_eq!(location.idx_row_start, 1);
        assert_eq!(book.sheet("Nothing").unwrap().n_cols_used(), 0);
    }
}
