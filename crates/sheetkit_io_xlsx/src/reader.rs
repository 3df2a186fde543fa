//! Workbook loading: `calamine` for cell values plus a style sidecar.
//!
//! `calamine` does not surface cell formats, so a second pass walks the
//! package with `zip` + `quick-xml` and recovers what an export needs to
//! preserve across a save/load cycle: fonts, solid fills, borders, alignment,
//! number formats and custom column widths.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Seek};

use calamine::{Data, Reader, Xlsx};
use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::book::{XlsxBook, XlsxSheet};
use crate::spec::{EnumCellValue, SpecCellFormat, XlsxExportError};
use crate::util::{convert_xml_col_width_to_user, parse_cell_address};

/// Recovered formats and widths of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
struct SpecSheetStyles {
    dict_cell_fmts: BTreeMap<(u32, u16), SpecCellFormat>,
    dict_col_widths: BTreeMap<u16, f64>,
}

/// Raw `fonts/font` entry.
#[derive(Debug, Clone, Default, PartialEq)]
struct SpecFontRaw {
    bold: bool,
    italic: bool,
    name: Option<String>,
    size: Option<f64>,
    color: Option<String>,
}

/// Raw `cellXfs/xf` entry before font, fill and border lookup.
#[derive(Debug, Clone, Default)]
struct SpecXfRaw {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    align: Option<String>,
    valign: Option<String>,
    text_wrap: bool,
}

////////////////////////////////////////////////////////////////////////////////
// #region BookLoading

/// Parse serialized workbook bytes into an [`XlsxBook`].
pub(crate) fn read_book(bytes: &[u8]) -> Result<XlsxBook, XlsxExportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| XlsxExportError::Read(format!("not a readable xlsx package: {e}")))?;

    let dict_styles = match read_style_sidecar(bytes) {
        Ok(dict_styles) => dict_styles,
        Err(err) => {
            tracing::warn!(error = %err, "Cell styles could not be recovered; loading values only");
            HashMap::new()
        }
    };

    let mut book = XlsxBook::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            XlsxExportError::Read(format!("failed to read sheet {sheet_name:?}: {e}"))
        })?;
        let styles = dict_styles.get(&sheet_name);
        let mut sheet = XlsxSheet::new(&sheet_name);

        if let Some((n_row_start, n_col_start)) = range.start() {
            for (n_row_rel, n_col_rel, data) in range.used_cells() {
                let value = convert_data_to_cell_value(data);
                if value.is_none() {
                    continue;
                }
                let n_row = n_row_start as usize + n_row_rel;
                let n_col = n_col_start as usize + n_col_rel;
                let fmt = styles.and_then(|s| s.dict_cell_fmts.get(&(n_row as u32, n_col as u16)));
                sheet.write_cell(n_row, n_col, value, fmt)?;
            }
        }

        if let Some(styles) = styles {
            for ((n_row, n_col), fmt) in &styles.dict_cell_fmts {
                if sheet.cell(*n_row, *n_col).is_none() {
                    sheet.write_cell(
                        *n_row as usize,
                        *n_col as usize,
                        EnumCellValue::None,
                        Some(fmt),
                    )?;
                }
            }
            for (n_col, width) in &styles.dict_col_widths {
                sheet.set_col_width(*n_col, *width);
            }
        }

        tracing::debug!(
            sheet_name = %sheet_name,
            idx_row_last = ?sheet.idx_row_last(),
            "Loaded worksheet"
        );
        book.push_sheet(sheet);
    }
    Ok(book)
}

fn convert_data_to_cell_value(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Bool(val) => EnumCellValue::Bool(*val),
        Data::DateTime(val) => {
            if val.is_duration() {
                return EnumCellValue::Number(val.as_f64());
            }
            val.as_datetime()
                .map_or(EnumCellValue::Number(val.as_f64()), EnumCellValue::DateTime)
        }
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(val) => EnumCellValue::String(val.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleSidecar

fn read_style_sidecar(bytes: &[u8]) -> Result<HashMap<String, SpecSheetStyles>, String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("Failed to open xlsx zip: {e}"))?;

    let xml_workbook = read_zip_entry(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| "xl/workbook.xml is missing".to_string())?;
    let xml_rels = read_zip_entry(&mut archive, "xl/_rels/workbook.xml.rels")?
        .ok_or_else(|| "xl/_rels/workbook.xml.rels is missing".to_string())?;
    let l_xf_formats = match read_zip_entry(&mut archive, "xl/styles.xml")? {
        Some(xml_styles) => parse_cell_xf_formats(&xml_styles)?,
        None => Vec::new(),
    };

    let dict_targets = parse_relationship_targets(&xml_rels)?;
    let mut dict_styles = HashMap::new();
    for (sheet_name, c_rid) in parse_workbook_sheets(&xml_workbook)? {
        let Some(c_target) = dict_targets.get(&c_rid) else {
            continue;
        };
        let c_part = derive_part_path(c_target);
        let Some(xml_sheet) = read_zip_entry(&mut archive, &c_part)? else {
            continue;
        };
        dict_styles.insert(sheet_name, parse_sheet_styles(&xml_sheet, &l_xf_formats)?);
    }
    Ok(dict_styles)
}

fn read_zip_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, String> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(format!("Failed to open {name}: {e}")),
    };
    let mut c_xml = String::new();
    file.read_to_string(&mut c_xml)
        .map_err(|e| format!("Failed to read {name}: {e}"))?;
    Ok(Some(c_xml))
}

/// Package path of a workbook relationship target.
fn derive_part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(c_abs) => c_abs.to_string(),
        None => format!("xl/{target}"),
    }
}

fn _attr_value(e: &BytesStart<'_>, key_local: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key_local)
        .and_then(|attr| attr.unescape_value().ok().map(|val| val.into_owned()))
}

fn _attr_flag(e: &BytesStart<'_>, key_local: &[u8]) -> bool {
    _attr_value(e, key_local).is_none_or(|val| val != "0" && val != "false")
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn parse_workbook_sheets(xml: &str) -> Result<Vec<(String, String)>, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"sheet"
                    && let (Some(name), Some(rid)) = (_attr_value(&e, b"name"), _attr_value(&e, b"id"))
                {
                    out.push((name, rid));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse workbook XML: {e}")),
            _ => {}
        }
    }
    Ok(out)
}

fn parse_relationship_targets(xml: &str) -> Result<HashMap<String, String>, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship"
                    && let (Some(rid), Some(target)) = (_attr_value(&e, b"Id"), _attr_value(&e, b"Target"))
                {
                    out.insert(rid, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse rels: {e}")),
            _ => {}
        }
    }
    Ok(out)
}

fn derive_builtin_num_format(num_fmt_id: u32) -> Option<&'static str> {
    match num_fmt_id {
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        14 => Some("mm-dd-yy"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        49 => Some("@"),
        _ => None,
    }
}

/// `#RRGGBB` form of an `rgb` attribute (`AARRGGBB` or `RRGGBB`).
fn derive_color_hex(argb: &str) -> Option<String> {
    let c_rgb = match argb.len() {
        8 => argb.get(2..)?,
        6 => argb,
        _ => return None,
    };
    c_rgb
        .chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| format!("#{}", c_rgb.to_ascii_uppercase()))
}

fn derive_border_index(style: &str) -> Option<i64> {
    match style {
        "thin" => Some(1),
        "medium" => Some(2),
        "dashed" => Some(3),
        "dotted" => Some(4),
        "thick" => Some(5),
        "double" => Some(6),
        "hair" => Some(7),
        _ => None,
    }
}

/// Resolved format of every `cellXfs` entry, indexed by style id.
///
/// Font name, size and color are reported only where they differ from the
/// workbook default font (`fonts[0]`).
fn parse_cell_xf_formats(xml: &str) -> Result<Vec<SpecCellFormat>, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut c_section: Option<Vec<u8>> = None;
    let mut dict_num_fmts: HashMap<u32, String> = HashMap::new();
    let mut l_fonts: Vec<SpecFontRaw> = Vec::new();
    let mut l_fills: Vec<Option<String>> = Vec::new();
    let mut if_fill_solid = false;
    let mut l_borders: Vec<Option<i64>> = Vec::new();
    let mut l_xfs: Vec<SpecXfRaw> = Vec::new();

    loop {
        let (e, if_empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(e)) => {
                if c_section.as_deref() == Some(e.local_name().as_ref()) {
                    c_section = None;
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse styles XML: {e}")),
            _ => continue,
        };

        let c_name = e.local_name().as_ref().to_vec();
        let c_section_now = c_section.clone();
        match (c_section_now.as_deref(), c_name.as_slice()) {
            (None, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs")
                if !if_empty =>
            {
                c_section = Some(c_name.clone());
            }
            (Some(b"numFmts"), b"numFmt") => {
                if let (Some(id), Some(code)) =
                    (_attr_value(&e, b"numFmtId"), _attr_value(&e, b"formatCode"))
                    && let Ok(id) = id.parse::<u32>()
                {
                    dict_num_fmts.insert(id, code);
                }
            }
            (Some(b"fonts"), b"font") => l_fonts.push(SpecFontRaw::default()),
            (Some(b"fonts"), tag) => {
                let Some(font) = l_fonts.last_mut() else {
                    continue;
                };
                match tag {
                    b"b" => font.bold = _attr_flag(&e, b"val"),
                    b"i" => font.italic = _attr_flag(&e, b"val"),
                    b"name" => font.name = _attr_value(&e, b"val"),
                    b"sz" => {
                        font.size = _attr_value(&e, b"val").and_then(|val| val.parse().ok());
                    }
                    b"color" => {
                        font.color =
                            _attr_value(&e, b"rgb").and_then(|val| derive_color_hex(&val));
                    }
                    _ => {}
                }
            }
            (Some(b"fills"), b"fill") => l_fills.push(None),
            (Some(b"fills"), b"patternFill") => {
                if_fill_solid = _attr_value(&e, b"patternType").is_some_and(|val| val == "solid");
            }
            (Some(b"fills"), b"fgColor") => {
                if if_fill_solid
                    && let Some(fill) = l_fills.last_mut()
                {
                    *fill = _attr_value(&e, b"rgb").and_then(|val| derive_color_hex(&val));
                }
            }
            (Some(b"borders"), b"border") => l_borders.push(None),
            (Some(b"borders"), b"left") => {
                if let Some(border) = l_borders.last_mut() {
                    *border = _attr_value(&e, b"style").and_then(|val| derive_border_index(&val));
                }
            }
            (Some(b"cellXfs"), b"xf") => {
                let n_attr = |key: &[u8]| {
                    _attr_value(&e, key)
                        .and_then(|val| val.parse::<usize>().ok())
                        .unwrap_or(0)
                };
                l_xfs.push(SpecXfRaw {
                    num_fmt_id: n_attr(b"numFmtId") as u32,
                    font_id: n_attr(b"fontId"),
                    fill_id: n_attr(b"fillId"),
                    border_id: n_attr(b"borderId"),
                    ..Default::default()
                });
            }
            (Some(b"cellXfs"), b"alignment") => {
                if let Some(xf) = l_xfs.last_mut() {
                    xf.align = _attr_value(&e, b"horizontal");
                    xf.valign = _attr_value(&e, b"vertical").map(|val| match val.as_str() {
                        "center" => "vcenter".to_string(),
                        _ => val,
                    });
                    xf.text_wrap = _attr_value(&e, b"wrapText")
                        .is_some_and(|val| val == "1" || val == "true");
                }
            }
            _ => {}
        }
    }

    let font_base = l_fonts.first().cloned().unwrap_or_default();
    Ok(l_xfs
        .into_iter()
        .map(|xf| {
            let font = l_fonts.get(xf.font_id).cloned().unwrap_or_default();
            let num_format = match xf.num_fmt_id {
                0 => None,
                id => dict_num_fmts
                    .get(&id)
                    .cloned()
                    .or_else(|| derive_builtin_num_format(id).map(str::to_string)),
            };
            SpecCellFormat {
                font_name: font.name.clone().filter(|_| font.name != font_base.name),
                font_size: font
                    .size
                    .filter(|_| font.size != font_base.size)
                    .map(|val| val.round() as i64),
                bold: font.bold.then_some(true),
                italic: font.italic.then_some(true),
                align: xf.align,
                valign: xf.valign,
                border: l_borders.get(xf.border_id).copied().flatten(),
                text_wrap: xf.text_wrap.then_some(true),
                num_format,
                bg_color: l_fills.get(xf.fill_id).cloned().flatten(),
                font_color: font.color.clone().filter(|_| font.color != font_base.color),
            }
        })
        .collect())
}

fn parse_sheet_styles(xml: &str, l_xf_formats: &[SpecCellFormat]) -> Result<SpecSheetStyles, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut styles = SpecSheetStyles::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"c" => {
                    let Some(c_ref) = _attr_value(&e, b"r") else {
                        continue;
                    };
                    let n_style = _attr_value(&e, b"s")
                        .and_then(|val| val.parse::<usize>().ok())
                        .unwrap_or(0);
                    if n_style == 0 {
                        continue;
                    }
                    if let Some(fmt) = l_xf_formats.get(n_style)
                        && !fmt.is_empty()
                        && let Ok(key) = parse_cell_address(&c_ref)
                    {
                        styles.dict_cell_fmts.insert(key, fmt.clone());
                    }
                }
                b"col" => {
                    if !_attr_value(&e, b"customWidth").is_some_and(|val| val == "1" || val == "true") {
                        continue;
                    }
                    let n_min = _attr_value(&e, b"min").and_then(|val| val.parse::<u16>().ok());
                    let n_max = _attr_value(&e, b"max").and_then(|val| val.parse::<u16>().ok());
                    let width = _attr_value(&e, b"width").and_then(|val| val.parse::<f64>().ok());
                    if let (Some(n_min), Some(n_max), Some(width)) = (n_min, n_max, width)
                        && n_min >= 1
                    {
                        for n_col_1based in n_min..=n_max {
                            styles
                                .dict_col_widths
                                .insert(n_col_1based - 1, convert_xml_col_width_to_user(width));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse worksheet XML: {e}")),
            _ => {}
        }
    }
    Ok(styles)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    const XML_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="mm/dd/yyyy hh:mm"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><name val="Calibri"/></font>
  </fonts>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="1"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" xfId="0" applyFont="1" applyAlignment="1"><alignment horizontal="center"/></xf>
    <xf numFmtId="164" fontId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="14" fontId="0" xfId="0" applyNumberFormat="1"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><i/></font></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn cell_xfs_resolve_fonts_alignment_and_num_formats() {
        let l_formats = parse_cell_xf_formats(XML_STYLES).unwrap();
        assert_eq!(l_formats.len(), 4);
        assert!(l_formats[0].is_empty());
        assert_eq!(
            l_formats[1],
            SpecCellFormat {
                bold: Some(true),
                align: Some("center".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(l_formats[2].num_format.as_deref(), Some("mm/dd/yyyy hh:mm"));
        assert_eq!(l_formats[3].num_format.as_deref(), Some("mm-dd-yy"));
    }

    #[test]
    fn cell_xfs_resolve_fills_borders_and_font_overrides() {
        let xml_styles = r#"<styleSheet>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><sz val="14"/><color rgb="FFC00000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color auto="1"/></left><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border>
  </borders>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0"/>
    <xf numFmtId="0" fontId="0" fillId="1" borderId="0" xfId="0"><alignment vertical="top" wrapText="1"/></xf>
  </cellXfs>
</styleSheet>"#;

        let l_formats = parse_cell_xf_formats(xml_styles).unwrap();
        assert!(l_formats[0].is_empty());
        assert_eq!(
            l_formats[1],
            SpecCellFormat {
                font_name: Some("Arial".to_string()),
                font_size: Some(14),
                bold: Some(true),
                border: Some(1),
                bg_color: Some("#FFFF00".to_string()),
                font_color: Some("#C00000".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(
            l_formats[2],
            SpecCellFormat {
                valign: Some("top".to_string()),
                text_wrap: Some(true),
                ..Default::default()
            }
        );
    }

    #[test]
    fn sheet_styles_pick_styled_cells_and_custom_widths() {
        let l_formats = parse_cell_xf_formats(XML_STYLES).unwrap();
        let xml_sheet = r#"<worksheet>
  <cols>
    <col min="1" max="2" width="10.7109375" customWidth="1"/>
    <col min="3" max="3" width="9.140625"/>
  </cols>
  <sheetData>
    <row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
    <row r="2"><c r="A2" s="2"><v>45292.5</v></c><c r="B2" s="0"><v>1</v></c></row>
  </sheetData>
</worksheet>"#;

        let styles = parse_sheet_styles(xml_sheet, &l_formats).unwrap();
        assert_eq!(styles.dict_cell_fmts.len(), 2);
        assert_eq!(styles.dict_cell_fmts[&(0, 0)].bold, Some(true));
        assert_eq!(
            styles.dict_cell_fmts[&(1, 0)].num_format.as_deref(),
            Some("mm/dd/yyyy hh:mm")
        );
        assert_eq!(
            styles.dict_col_widths,
            BTreeMap::from([(0, 10.0), (1, 10.0)])
        );
    }

    #[test]
    fn workbook_and_rels_map_sheet_parts() {
        let xml_workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Employees" sheetId="1" r:id="rId1"/>
    <sheet name="R&amp;D" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let xml_rels = r#"<Relationships>
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

        let l_sheets = parse_workbook_sheets(xml_workbook).unwrap();
        assert_eq!(
            l_sheets,
            vec![
                ("Employees".to_string(), "rId1".to_string()),
                ("R&D".to_string(), "rId2".to_string())
            ]
        );
        let dict_targets = parse_relationship_targets(xml_rels).unwrap();
        assert_eq!(derive_part_path(&dict_targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(derive_part_path(&dict_targets["rId2"]), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn book_round_trip_keeps_values_formats_and_widths() {
        use chrono::NaiveDate;

        let fmt_header = SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        };
        let fmt_date = SpecCellFormat {
            num_format: Some("mm/dd/yyyy hh:mm".to_string()),
            ..Default::default()
        };
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let mut book = XlsxBook::new();
        let sheet = book.add_sheet("Events").unwrap();
        sheet.write_cell(0, 0, "Name".into(), Some(&fmt_header)).unwrap();
        sheet.write_cell(0, 1, "At".into(), Some(&fmt_header)).unwrap();
        sheet.write_cell(1, 0, "launch".into(), None).unwrap();
        sheet.write_cell(1, 1, dt.into(), Some(&fmt_date)).unwrap();
        sheet.write_cell(2, 0, EnumCellValue::Number(7.0), None).unwrap();
        sheet.set_col_width(0, 14.0);
        book.add_sheet("Empty").unwrap();

        let loaded = XlsxBook::from_bytes(&book.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.sheet_names(), vec!["Events", "Empty"]);

        let sheet = loaded.sheet("Events").unwrap();
        assert_eq!(sheet.value(0, 0), EnumCellValue::from("Name"));
        assert_eq!(sheet.format(0, 1), Some(&fmt_header));
        assert_eq!(sheet.value(1, 1), EnumCellValue::DateTime(dt));
        assert_eq!(
            sheet.format(1, 1).and_then(|fmt| fmt.num_format.as_deref()),
            Some("mm/dd/yyyy hh:mm")
        );
        assert_eq!(sheet.value(2, 0), EnumCellValue::Number(7.0));
        assert_eq!(sheet.idx_row_frontier(), 3);
        assert_eq!(sheet.col_width(0), Some(14.0));

        let sheet_empty = loaded.sheet("Empty").unwrap();
        assert_eq!(sheet_empty.idx_row_last(), None);
    }

    #[test]
    fn book_round_trip_keeps_custom_header_format() {
        let fmt_header = SpecCellFormat {
            font_name: Some("Arial".to_string()),
            font_size: Some(12),
            bold: Some(true),
            border: Some(1),
            text_wrap: Some(true),
            bg_color: Some("#FFFF00".to_string()),
            font_color: Some("#1F497D".to_string()),
            ..Default::default()
        };

        let mut book = XlsxBook::new();
        let sheet = book.add_sheet("S").unwrap();
        sheet.write_cell(0, 0, "Name".into(), Some(&fmt_header)).unwrap();
        sheet.write_cell(1, 0, "x".into(), None).unwrap();

        let loaded = XlsxBook::from_bytes(&book.to_bytes().unwrap()).unwrap();
        let sheet = loaded.sheet("S").unwrap();
        assert_eq!(sheet.format(0, 0), Some(&fmt_header));
        assert_eq!(sheet.format(1, 0), None);
    }

    #[test]
    fn garbage_bytes_are_a_read_error() {
        assert!(matches!(
            read_book(b"not a zip"),
            Err(XlsxExportError::Read(_))
        ));
    }
}
