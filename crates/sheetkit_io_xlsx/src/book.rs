//! In-memory workbook model and its `rust_xlsxwriter` serialization.
//!
//! The book is the live object an export run mutates: sparse typed cells with
//! optional formats, a tracked row frontier per sheet, column widths and an
//! optional initial selection. Serialization renders everything once through
//! `rust_xlsxwriter`; [`XlsxBook::from_bytes`] reads the result back.

use std::collections::{BTreeMap, HashMap};

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::conf::N_WIDTH_EXCEL_COL_MAX;
use crate::reader::read_book;
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    XlsxExportError,
};
use crate::util::{
    cast_col_num, cast_row_num, convert_datetime_to_excel_serial, estimate_width_len,
    validate_sheet_name,
};

////////////////////////////////////////////////////////////////////////////////
// #region Sheet

/// One stored cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XlsxCell {
    /// Cell value.
    pub value: EnumCellValue,
    /// Cell format; `None` renders with the workbook default.
    pub format: Option<SpecCellFormat>,
}

/// One worksheet: sparse cells keyed by 0-based `(row, col)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XlsxSheet {
    name: String,
    dict_cells: BTreeMap<(u32, u16), XlsxCell>,
    idx_row_last: Option<u32>,
    dict_col_widths: BTreeMap<u16, f64>,
    policy_autofit: Option<SpecAutofitCellsPolicy>,
}

impl XlsxSheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `value` at `(idx_row, idx_col)`, replacing any previous cell.
    ///
    /// The row frontier advances even when `value` is blank.
    pub fn write_cell(
        &mut self,
        idx_row: usize,
        idx_col: usize,
        value: EnumCellValue,
        format: Option<&SpecCellFormat>,
    ) -> Result<(), XlsxExportError> {
        let n_row = cast_row_num(idx_row, &self.name)?;
        let n_col = cast_col_num(idx_col, &self.name)?;

        self.dict_cells.insert(
            (n_row, n_col),
            XlsxCell {
                value,
                format: format.filter(|fmt| !fmt.is_empty()).cloned(),
            },
        );
        self.idx_row_last = Some(self.idx_row_last.map_or(n_row, |n_last| n_last.max(n_row)));
        Ok(())
    }

    /// Merge `format` onto every cell of column `idx_col` in rows
    /// `idx_row_first..=idx_row_last`; missing cells become formatted blanks.
    pub fn apply_format(
        &mut self,
        idx_row_first: u32,
        idx_row_last: u32,
        idx_col: u16,
        format: &SpecCellFormat,
    ) {
        for n_row in idx_row_first..=idx_row_last {
            let cell = self.dict_cells.entry((n_row, idx_col)).or_default();
            cell.format = Some(match &cell.format {
                Some(fmt_current) => fmt_current.merge(format),
                None => format.clone(),
            });
        }
        if idx_row_first <= idx_row_last {
            self.idx_row_last = Some(
                self.idx_row_last
                    .map_or(idx_row_last, |n_last| n_last.max(idx_row_last)),
            );
        }
    }

    pub fn cell(&self, idx_row: u32, idx_col: u16) -> Option<&XlsxCell> {
        self.dict_cells.get(&(idx_row, idx_col))
    }

    /// Cell value; absent cells read as [`EnumCellValue::None`].
    pub fn value(&self, idx_row: u32, idx_col: u16) -> EnumCellValue {
        self.cell(idx_row, idx_col)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    pub fn format(&self, idx_row: u32, idx_col: u16) -> Option<&SpecCellFormat> {
        self.cell(idx_row, idx_col)
            .and_then(|cell| cell.format.as_ref())
    }

    /// Stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&(u32, u16), &XlsxCell)> {
        self.dict_cells.iter()
    }

    /// Last populated row (0-based); `None` for an empty sheet.
    pub fn idx_row_last(&self) -> Option<u32> {
        self.idx_row_last
    }

    /// Raise the frontier to at least `idx_row_last`.
    ///
    /// Rows holding only unformatted blanks are not serialized, so a reopened
    /// book can report a lower frontier than the book it was saved from.
    pub(crate) fn extend_row_last(&mut self, idx_row_last: Option<u32>) {
        if let Some(n_row) = idx_row_last {
            self.idx_row_last = Some(self.idx_row_last.map_or(n_row, |n_last| n_last.max(n_row)));
        }
    }

    /// First row below all populated rows.
    pub fn idx_row_frontier(&self) -> u32 {
        self.idx_row_last.map_or(0, |n_last| n_last + 1)
    }

    /// Number of columns spanned by stored cells.
    pub fn n_cols_used(&self) -> usize {
        self.dict_cells
            .keys()
            .map(|(_, n_col)| *n_col as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Values of one row up to [`Self::n_cols_used`].
    pub fn row_values(&self, idx_row: u32) -> Vec<EnumCellValue> {
        (0..self.n_cols_used())
            .map(|n_col| self.value(idx_row, n_col as u16))
            .collect()
    }

    /// Ask for column widths to be inferred at serialization.
    pub fn request_autofit(&mut self, policy: &SpecAutofitCellsPolicy) {
        if policy.rule_columns == EnumAutofitColumnsRule::None {
            return;
        }
        self.policy_autofit = Some(policy.clone());
    }

    pub fn if_autofit_requested(&self) -> bool {
        self.policy_autofit.is_some()
    }

    pub fn set_col_width(&mut self, idx_col: u16, width: f64) {
        self.dict_col_widths.insert(idx_col, width);
    }

    /// Stored column width; autofit widths are only known after serialization.
    pub fn col_width(&self, idx_col: u16) -> Option<f64> {
        self.dict_col_widths.get(&idx_col).copied()
    }

    /// Column widths inferred with the sheet's autofit policy.
    pub fn derive_autofit_widths(&self) -> BTreeMap<u16, f64> {
        let Some(policy) = &self.policy_autofit else {
            return BTreeMap::new();
        };

        let n_min = usize::max(1, policy.width_cell_min);
        let n_max = usize::min(
            N_WIDTH_EXCEL_COL_MAX,
            usize::max(n_min, policy.width_cell_max),
        );
        let n_pad = policy.width_cell_padding;
        let n_rows_body_max = policy.height_body_inferred_max.unwrap_or(usize::MAX);

        let mut dict_width_header: BTreeMap<u16, usize> = BTreeMap::new();
        let mut dict_width_body: BTreeMap<u16, usize> = BTreeMap::new();
        for ((n_row, n_col), cell) in &self.dict_cells {
            let n_width = estimate_width_len(
                &cell.value,
                cell.format.as_ref().and_then(|fmt| fmt.num_format.as_deref()),
            );
            let dict_target = if *n_row == 0 {
                &mut dict_width_header
            } else if (*n_row as usize) <= n_rows_body_max {
                &mut dict_width_body
            } else {
                continue;
            };
            let n_slot = dict_target.entry(*n_col).or_default();
            *n_slot = usize::max(*n_slot, n_width);
        }

        (0..self.n_cols_used())
            .map(|n_col| {
                let n_col = n_col as u16;
                let n_header = dict_width_header.get(&n_col).copied().unwrap_or(0);
                let n_body = dict_width_body.get(&n_col).copied().unwrap_or(0);
                let n_width_recorded = match policy.rule_columns {
                    EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => n_header,
                    EnumAutofitColumnsRule::Body => n_body,
                    EnumAutofitColumnsRule::All => usize::max(n_header, n_body),
                };
                let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                (n_col, n_width_final as f64)
            })
            .collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Book

/// Initial view selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCellSelection {
    /// Sheet shown first.
    pub sheet_name: String,
    /// Selected row (0-based).
    pub idx_row: u32,
    /// Selected column (0-based).
    pub idx_col: u16,
}

/// Ordered worksheets with exact-name lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XlsxBook {
    l_sheets: Vec<XlsxSheet>,
    selection: Option<SpecCellSelection>,
}

impl XlsxBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse serialized workbook bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XlsxExportError> {
        read_book(bytes)
    }

    /// Sheet with exactly this name.
    pub fn sheet(&self, name: &str) -> Option<&XlsxSheet> {
        self.l_sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut XlsxSheet> {
        self.l_sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    pub fn sheets(&self) -> &[XlsxSheet] {
        &self.l_sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.l_sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    /// Check that `name` can be added as a new sheet.
    ///
    /// Names differing from an existing sheet only by letter case are
    /// rejected, matching workbook naming rules.
    pub fn validate_new_sheet_name(&self, name: &str) -> Result<(), XlsxExportError> {
        validate_sheet_name(name)?;
        let c_name_lower = name.to_lowercase();
        if let Some(sheet) = self
            .l_sheets
            .iter()
            .find(|sheet| sheet.name.to_lowercase() == c_name_lower)
        {
            return Err(XlsxExportError::InvalidSheetName {
                name: name.to_string(),
                reason: format!("conflicts with existing sheet {:?}", sheet.name),
            });
        }
        Ok(())
    }

    /// Append an empty sheet.
    pub fn add_sheet(&mut self, name: &str) -> Result<&mut XlsxSheet, XlsxExportError> {
        self.validate_new_sheet_name(name)?;
        self.l_sheets.push(XlsxSheet::new(name));
        let n_idx = self.l_sheets.len() - 1;
        Ok(&mut self.l_sheets[n_idx])
    }

    pub(crate) fn push_sheet(&mut self, sheet: XlsxSheet) {
        self.l_sheets.push(sheet);
    }

    /// Mark `(idx_row, idx_col)` on `sheet_name` as the initial selection.
    pub fn select_cell(
        &mut self,
        sheet_name: &str,
        idx_row: u32,
        idx_col: u16,
    ) -> Result<(), XlsxExportError> {
        if self.sheet(sheet_name).is_none() {
            return Err(XlsxExportError::SheetNotFound(sheet_name.to_string()));
        }
        self.selection = Some(SpecCellSelection {
            sheet_name: sheet_name.to_string(),
            idx_row,
            idx_col,
        });
        Ok(())
    }

    pub fn selection(&self) -> Option<&SpecCellSelection> {
        self.selection.as_ref()
    }

    /// Serialize the whole workbook.
    ///
    /// A book without sheets serializes with one default sheet.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XlsxExportError> {
        let mut workbook = Workbook::new();
        let mut dict_fmt_cache: HashMap<SpecCellFormat, Format> = HashMap::new();

        for sheet in &self.l_sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(derive_xlsx_error_text)?;
            render_sheet(worksheet, sheet, &mut dict_fmt_cache)?;

            if let Some(selection) = &self.selection
                && selection.sheet_name == sheet.name
            {
                worksheet.set_active(true);
                worksheet
                    .set_selection(
                        selection.idx_row,
                        selection.idx_col,
                        selection.idx_row,
                        selection.idx_col,
                    )
                    .map_err(derive_xlsx_error_text)?;
            }
        }

        workbook.save_to_buffer().map_err(derive_xlsx_error_text)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Rendering

fn render_sheet(
    worksheet: &mut Worksheet,
    sheet: &XlsxSheet,
    dict_fmt_cache: &mut HashMap<SpecCellFormat, Format>,
) -> Result<(), XlsxExportError> {
    let fmt_default = Format::new();

    for ((n_row, n_col), cell) in &sheet.dict_cells {
        let format = match &cell.format {
            Some(spec) => &*dict_fmt_cache
                .entry(spec.clone())
                .or_insert_with(|| derive_rust_xlsx_format(spec)),
            None => &fmt_default,
        };
        write_cell_with_format(worksheet, *n_row, *n_col, &cell.value, format)?;
    }

    let mut dict_widths = sheet.dict_col_widths.clone();
    dict_widths.extend(sheet.derive_autofit_widths());
    for (n_col, width) in dict_widths {
        worksheet
            .set_column_width(n_col, width)
            .map_err(derive_xlsx_error_text)?;
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxExportError> {
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Bool(val) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet
                .write_number_with_format(
                    n_row,
                    n_col,
                    convert_datetime_to_excel_serial(*val),
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn derive_xlsx_error_text(err: XlsxError) -> XlsxExportError {
    XlsxExportError::Write(format!("xlsx write error: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_tracks_blank_writes() {
        let mut book = XlsxBook::new();
        let sheet = book.add_sheet("S").unwrap();
        assert_eq!(sheet.idx_row_frontier(), 0);

        sheet.write_cell(0, 0, "h".into(), None).unwrap();
        sheet.write_cell(3, 1, EnumCellValue::None, None).unwrap();
        assert_eq!(sheet.idx_row_last(), Some(3));
        assert_eq!(sheet.idx_row_frontier(), 4);
        assert_eq!(sheet.n_cols_used(), 2);
    }

    #[test]
    fn extend_row_last_never_lowers_the_frontier() {
        let mut sheet = XlsxSheet::new("S");
        sheet.extend_row_last(None);
        assert_eq!(sheet.idx_row_last(), None);

        sheet.write_cell(4, 0, "x".into(), None).unwrap();
        sheet.extend_row_last(Some(2));
        assert_eq!(sheet.idx_row_frontier(), 5);
        sheet.extend_row_last(Some(6));
        assert_eq!(sheet.idx_row_frontier(), 7);
    }

    #[test]
    fn add_sheet_rejects_case_insensitive_duplicates() {
        let mut book = XlsxBook::new();
        book.add_sheet("Employees").unwrap();
        assert!(matches!(
            book.add_sheet("employees"),
            Err(XlsxExportError::InvalidSheetName { .. })
        ));
        assert!(book.sheet("employees").is_none());
        assert!(book.sheet("Employees").is_some());
    }

    #[test]
    fn apply_format_merges_onto_existing_cells() {
        let mut book = XlsxBook::new();
        let sheet = book.add_sheet("S").unwrap();
        let fmt_bold = SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        };
        sheet
            .write_cell(1, 0, EnumCellValue::Number(1.0), Some(&fmt_bold))
            .unwrap();

        let fmt_date = SpecCellFormat {
            num_format: Some("mm/dd/yyyy".to_string()),
            ..Default::default()
        };
        sheet.apply_format(1, 2, 0, &fmt_date);

        assert_eq!(sheet.format(1, 0).and_then(|f| f.bold), Some(true));
        assert_eq!(
            sheet.format(1, 0).and_then(|f| f.num_format.as_deref()),
            Some("mm/dd/yyyy")
        );
        assert_eq!(sheet.value(2, 0), EnumCellValue::None);
        assert!(sheet.format(2, 0).is_some());
        assert!(sheet.format(0, 0).is_none());
    }

    #[test]
    fn autofit_widths_follow_policy_bounds() {
        let mut book = XlsxBook::new();
        let sheet = book.add_sheet("S").unwrap();
        sheet.write_cell(0, 0, "Id".into(), None).unwrap();
        sheet
            .write_cell(0, 1, "Description".into(), None)
            .unwrap();
        sheet
            .write_cell(1, 1, "x".repeat(100).into(), None)
            .unwrap();

        assert!(sheet.derive_autofit_widths().is_empty());
        sheet.request_autofit(&SpecAutofitCellsPolicy::default());

        let dict_widths = sheet.derive_autofit_widths();
        assert_eq!(dict_widths.get(&0), Some(&8.0));
        assert_eq!(dict_widths.get(&1), Some(&60.0));
    }

    #[test]
    fn select_cell_requires_existing_sheet() {
        let mut book = XlsxBook::new();
        book.add_sheet("S").unwrap();
        assert!(book.select_cell("S", 2, 1).is_ok());
        assert!(matches!(
            book.select_cell("Missing", 0, 0),
            Err(XlsxExportError::SheetNotFound(_))
        ));
        assert_eq!(book.selection().map(|s| s.idx_row), Some(2));
    }

    #[test]
    fn serializes_to_zip_bytes() {
        let mut book = XlsxBook::new();
        let sheet = book.add_sheet("S").unwrap();
        sheet.write_cell(0, 0, "h".into(), None).unwrap();
        sheet.write_cell(1, 0, true.into(), None).unwrap();

        let bytes = book.to_bytes().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
