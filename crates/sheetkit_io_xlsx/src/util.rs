//! Stateless helper utilities used by the workbook and projection kernels.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, SpecXlsxValuePolicy, XlsxExportError};

static RE_CELL_ADDRESS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").ok());

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; `None` for finite values.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecXlsxValuePolicy) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    None
}

/// Replace non-finite numbers with their policy text; other values pass through.
pub fn convert_cell_value(
    value: EnumCellValue,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::Number(n) => convert_nan_inf_to_str(n, value_policy)
            .map_or(EnumCellValue::Number(n), EnumCellValue::String),
        other => other,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Sanitize sheet name by replacing illegal chars and enforcing max length.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Validate a sheet name against Excel naming rules.
pub fn validate_sheet_name(name: &str) -> Result<(), XlsxExportError> {
    let fail = |reason: &str| XlsxExportError::InvalidSheetName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(fail("name is empty"));
    }
    if name.chars().count() > N_LEN_EXCEL_SHEET_NAME_MAX {
        return Err(fail("name is longer than 31 characters"));
    }
    if let Some(c_illegal) = TUP_EXCEL_ILLEGAL.iter().find(|c| name.contains(**c)) {
        return Err(fail(&format!("name contains illegal character {c_illegal:?}")));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(fail("name starts or ends with an apostrophe"));
    }
    Ok(())
}

/// Reduce a fully qualified Rust type name to its last path segment.
///
/// `app::model::Wrapper<alloc::string::String>` becomes `Wrapper`.
pub fn derive_simple_type_name(type_name_full: &'static str) -> &'static str {
    let c_base = type_name_full
        .split_once('<')
        .map_or(type_name_full, |(c_head, _)| c_head);
    c_base.rsplit("::").next().unwrap_or(c_base)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Convert column letters (`A`, `AB`, `XFD`) to a 0-based column index.
pub fn convert_col_letters_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n_idx = 0usize;
    for chr in letters.chars() {
        if !chr.is_ascii_alphabetic() {
            return None;
        }
        let n_digit = (chr.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n_idx = n_idx.checked_mul(26)?.checked_add(n_digit)?;
    }
    Some(n_idx - 1)
}

/// Convert a 0-based column index to column letters.
pub fn derive_col_letters(idx_col: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = idx_col + 1;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_digit as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Parse `ColumnLetterRowNumber` notation into 0-based `(row, col)`.
///
/// Absolute markers (`$B$4`) are accepted. Addresses outside the worksheet
/// grid are rejected.
pub fn parse_cell_address(address: &str) -> Result<(u32, u16), XlsxExportError> {
    let fail = || XlsxExportError::InvalidCellAddress(address.to_string());
    let re = RE_CELL_ADDRESS.as_ref().ok_or_else(fail)?;

    let caps = re.captures(address.trim()).ok_or_else(fail)?;
    let n_col = convert_col_letters_to_index(&caps[1]).ok_or_else(fail)?;
    let n_row_1based: usize = caps[2].parse().map_err(|_| fail())?;

    if n_row_1based == 0 || n_row_1based > N_NROWS_EXCEL_MAX || n_col >= N_NCOLS_EXCEL_MAX {
        return Err(fail());
    }
    let idx_row = u32::try_from(n_row_1based - 1).map_err(|_| fail())?;
    let idx_col = u16::try_from(n_col).map_err(|_| fail())?;
    Ok((idx_row, idx_col))
}

/// Cast a row index to storage width, enforcing the worksheet row limit.
pub fn cast_row_num(value: usize, sheet_name: &str) -> Result<u32, XlsxExportError> {
    let fail = || XlsxExportError::RowLimitExceeded {
        sheet_name: sheet_name.to_string(),
        idx_row: value,
        n_max: N_NROWS_EXCEL_MAX,
    };
    if value >= N_NROWS_EXCEL_MAX {
        return Err(fail());
    }
    u32::try_from(value).map_err(|_| fail())
}

/// Cast a column index to storage width, enforcing the worksheet column limit.
pub fn cast_col_num(value: usize, sheet_name: &str) -> Result<u16, XlsxExportError> {
    let fail = || XlsxExportError::ColumnLimitExceeded {
        sheet_name: sheet_name.to_string(),
        idx_col: value,
        n_max: N_NCOLS_EXCEL_MAX,
    };
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(fail());
    }
    u16::try_from(value).map_err(|_| fail())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValueConversion

/// Convert a date-time to an Excel 1900-system serial number.
///
/// Serials before 1900-03-01 are shifted by one to match Excel's phantom
/// 1900-02-29.
pub fn convert_datetime_to_excel_serial(value: NaiveDateTime) -> f64 {
    let date_epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    let n_days = (value.date() - date_epoch).num_days();
    let time = value.time();
    let n_secs = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    let n_frac = n_secs / 86_400.0;

    let n_days = if (0..61).contains(&n_days) {
        n_days - 1
    } else {
        n_days
    };
    n_days as f64 + n_frac
}

/// Convert an XML `<col width>` back into the user width that produced it.
///
/// Writers store `trunc((round(w * 7) + 5) / 7 * 256) / 256` for `w >= 1`.
pub fn convert_xml_col_width_to_user(width_xml: f64) -> f64 {
    if width_xml <= 0.0 {
        return 0.0;
    }
    let n_pixels = (width_xml * 7.0).round() - 5.0;
    if n_pixels < 7.0 {
        return (width_xml * 7.0).round() / 12.0;
    }
    n_pixels / 7.0
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units for one cell value.
///
/// Used by autofit inference logic.
pub fn estimate_width_len(value: &EnumCellValue, num_format: Option<&str>) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => s
            .lines()
            .map(estimate_unicode_string_width)
            .max()
            .unwrap_or(0),
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{n:.0}").len()
            } else {
                usize::min(n.to_string().len(), 12)
            }
        }
        EnumCellValue::Bool(b) => {
            if *b {
                4
            } else {
                5
            }
        }
        EnumCellValue::DateTime(_) => num_format.map_or(19, str::len),
    }
}

/// Width of a string where non-ASCII characters count as 1.6 units.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_non_finite_numbers() {
        let policy = SpecXlsxValuePolicy::default();
        assert_eq!(
            convert_cell_value(EnumCellValue::Number(f64::NAN), &policy),
            EnumCellValue::from("NaN")
        );
        assert_eq!(
            convert_cell_value(EnumCellValue::Number(f64::INFINITY), &policy),
            EnumCellValue::from("Inf")
        );
        assert_eq!(
            convert_cell_value(EnumCellValue::Number(f64::NEG_INFINITY), &policy),
            EnumCellValue::from("-Inf")
        );
        assert_eq!(
            convert_cell_value(EnumCellValue::Number(1.5), &policy),
            EnumCellValue::Number(1.5)
        );
        assert_eq!(convert_nan_inf_to_str(0.0, &policy), None);
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Employees").is_ok());
        assert!(validate_sheet_name("Q1 Sales").is_ok());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name("a[1]").is_err());
        assert!(validate_sheet_name(&"x".repeat(32)).is_err());
        assert!(validate_sheet_name("'quoted").is_err());
    }

    #[test]
    fn test_derive_simple_type_name() {
        assert_eq!(derive_simple_type_name("app::model::Employee"), "Employee");
        assert_eq!(
            derive_simple_type_name("app::Wrapper<alloc::string::String>"),
            "Wrapper"
        );
        assert_eq!(derive_simple_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_parse_cell_address() {
        assert_eq!(parse_cell_address("A1").unwrap(), (0, 0));
        assert_eq!(parse_cell_address("b12").unwrap(), (11, 1));
        assert_eq!(parse_cell_address("$AA$3").unwrap(), (2, 26));
        assert_eq!(parse_cell_address("XFD1048576").unwrap(), (1_048_575, 16_383));
        assert!(parse_cell_address("A0").is_err());
        assert!(parse_cell_address("XFE1").is_err());
        assert!(parse_cell_address("1A").is_err());
        assert!(parse_cell_address("").is_err());
    }

    #[test]
    fn test_col_letters_round_trip_edges() {
        assert_eq!(derive_col_letters(0), "A");
        assert_eq!(derive_col_letters(25), "Z");
        assert_eq!(derive_col_letters(26), "AA");
        assert_eq!(derive_col_letters(16_383), "XFD");
        assert_eq!(convert_col_letters_to_index("XFD"), Some(16_383));
    }

    #[test]
    fn test_cast_limits() {
        assert_eq!(cast_row_num(1_048_575, "S").unwrap(), 1_048_575);
        assert!(matches!(
            cast_row_num(1_048_576, "S"),
            Err(XlsxExportError::RowLimitExceeded { idx_row: 1_048_576, .. })
        ));
        assert!(matches!(
            cast_col_num(16_384, "S"),
            Err(XlsxExportError::ColumnLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_convert_datetime_to_excel_serial() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(convert_datetime_to_excel_serial(dt), 45_292.5);

        let dt_early = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(convert_datetime_to_excel_serial(dt_early), 1.0);
    }

    #[test]
    fn test_convert_xml_col_width_to_user() {
        assert_eq!(convert_xml_col_width_to_user(8.7109375), 8.0);
        assert_eq!(convert_xml_col_width_to_user(22.7109375), 22.0);
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(estimate_width_len(&EnumCellValue::from("abc"), None), 3);
        assert_eq!(estimate_width_len(&EnumCellValue::from("中文"), None), 3);
        assert_eq!(estimate_width_len(&EnumCellValue::from("ab\nabcd"), None), 4);
        assert_eq!(estimate_width_len(&EnumCellValue::Number(1234.0), None), 4);
        assert_eq!(
            estimate_width_len(
                &EnumCellValue::DateTime(NaiveDateTime::default()),
                Some("mm/dd/yyyy hh:mm")
            ),
            16
        );
    }
}
