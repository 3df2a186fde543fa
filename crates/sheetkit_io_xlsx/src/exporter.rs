//! Export orchestration.
//!
//! `Init → LoadOrCreateWorkbook → {ResolveSchema → LocateSheet → ProjectRows}
//! → SerializeWorkbook → RouteOutput`. The live [`XlsxBook`] is owned by one
//! [`XlsxExporter`]; serialization happens once per [`XlsxExporter::run`].

use sheetkit_io_fs::{EnumXlsxSource, SpecFileRoute};

use crate::book::XlsxBook;
use crate::locate::locate_sheet;
use crate::project::project_rows;
use crate::record::{SpecRecordCollection, SpecRecordType};
use crate::schema::SchemaResolver;
use crate::spec::{SpecSheetWrite, SpecXlsxExportOptions, SpecXlsxReport, XlsxExportError};
use crate::util::{parse_cell_address, sanitize_sheet_name};

////////////////////////////////////////////////////////////////////////////////
// #region CollectionPipeline

struct SpecExportPlan<'a> {
    collection: &'a SpecRecordCollection,
    record_type: SpecRecordType,
    sheet_name: String,
}

/// Explicit names are used verbatim; type-derived names are sanitized.
fn derive_target_sheet_name(
    collection: &SpecRecordCollection,
    record_type: &SpecRecordType,
    options: &SpecXlsxExportOptions,
) -> String {
    match collection.name() {
        Some(name) => name.to_string(),
        None => sanitize_sheet_name(record_type.type_name, &options.sheet_name_replace_to),
    }
}

/// Validate every collection and target sheet name before any mutation.
fn derive_export_plans<'a>(
    book: &XlsxBook,
    collections: &'a [SpecRecordCollection],
    options: &SpecXlsxExportOptions,
) -> Result<Vec<SpecExportPlan<'a>>, XlsxExportError> {
    let mut l_plans: Vec<SpecExportPlan<'a>> = Vec::with_capacity(collections.len());
    let mut l_names_new: Vec<String> = Vec::new();

    for collection in collections {
        let record_type = collection.record_type()?;
        let sheet_name = derive_target_sheet_name(collection, &record_type, options);

        if book.sheet(&sheet_name).is_none() && !l_names_new.contains(&sheet_name) {
            book.validate_new_sheet_name(&sheet_name)?;
            let c_name_lower = sheet_name.to_lowercase();
            if let Some(c_clash) = l_names_new
                .iter()
                .find(|c_name| c_name.to_lowercase() == c_name_lower)
            {
                return Err(XlsxExportError::InvalidSheetName {
                    name: sheet_name,
                    reason: format!("conflicts with sheet {c_clash:?} of the same run"),
                });
            }
            l_names_new.push(sheet_name.clone());
        }

        l_plans.push(SpecExportPlan {
            collection,
            record_type,
            sheet_name,
        });
    }
    Ok(l_plans)
}

/// Write `collections` into `book` in order.
///
/// Each collection resolves its schema, locates (or creates) its sheet and
/// appends its rows below the sheet's frontier. All collections are validated
/// first: an empty or mixed collection, or an unusable sheet name, fails the
/// call with `book` untouched.
pub fn export_collections(
    book: &mut XlsxBook,
    resolver: &mut SchemaResolver,
    collections: &[SpecRecordCollection],
    options: &SpecXlsxExportOptions,
    report: &mut SpecXlsxReport,
) -> Result<(), XlsxExportError> {
    let l_plans = derive_export_plans(book, collections, options)?;

    for plan in l_plans {
        let schema = resolver.resolve(&plan.record_type);
        let location = locate_sheet(book, &plan.sheet_name, &schema, &options.fmt_header)?;
        let sheet = book
            .sheet_mut(&plan.sheet_name)
            .ok_or_else(|| XlsxExportError::SheetNotFound(plan.sheet_name.clone()))?;
        let projection = project_rows(
            sheet,
            &schema,
            plan.collection.records(),
            location.idx_row_start,
            options,
        )?;

        tracing::debug!(
            sheet_name = %plan.sheet_name,
            type_name = plan.record_type.type_name,
            if_new_sheet = location.if_new_sheet,
            idx_row_start = projection.idx_row_start,
            n_rows = projection.n_rows,
            "Exported collection"
        );
        report.sheets.push(SpecSheetWrite {
            sheet_name: plan.sheet_name,
            type_name: plan.record_type.type_name.to_string(),
            if_new_sheet: location.if_new_sheet,
            idx_row_start: projection.idx_row_start,
            n_rows: projection.n_rows,
        });
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Exporter

/// Stateful exporter bound to one file route and one live workbook.
#[derive(Debug)]
pub struct XlsxExporter {
    route: SpecFileRoute,
    options: SpecXlsxExportOptions,
    book: XlsxBook,
    resolver: SchemaResolver,
    l_pending: Vec<SpecRecordCollection>,
    open_select: Option<(String, String)>,
    report: SpecXlsxReport,
}

impl XlsxExporter {
    /// Load or create the live workbook.
    ///
    /// A valid template source is loaded and `collections` are queued for
    /// [`Self::run`]. Otherwise a blank workbook is synthesized from
    /// `collections` (which it consumes), serialized and reopened; an invalid
    /// template is reported as a warning, never as an error.
    pub fn new(
        collections: Vec<SpecRecordCollection>,
        route: SpecFileRoute,
        options: SpecXlsxExportOptions,
    ) -> Result<Self, XlsxExportError> {
        let mut report = SpecXlsxReport::default();
        let mut resolver = SchemaResolver::new();

        let (book, l_pending) = match load_template(route.source(), &mut report) {
            Some(book) => (book, collections),
            None => {
                let book =
                    synthesize_blank_book(&collections, &mut resolver, &options, &mut report)?;
                (book, Vec::new())
            }
        };

        Ok(Self {
            route,
            options,
            book,
            resolver,
            l_pending,
            open_select: None,
            report,
        })
    }

    /// Select `cell_address` on `sheet_name` when the output is opened.
    pub fn with_open_select(
        mut self,
        sheet_name: impl Into<String>,
        cell_address: impl Into<String>,
    ) -> Self {
        self.open_select = Some((sheet_name.into(), cell_address.into()));
        self
    }

    /// Queue a collection for the next [`Self::run`].
    pub fn push_collection(&mut self, collection: SpecRecordCollection) {
        self.l_pending.push(collection);
    }

    /// Write queued collections, serialize once and route the bytes.
    ///
    /// Returns the serialized workbook even when the backup write fails.
    pub fn run(&mut self) -> Result<Vec<u8>, XlsxExportError> {
        let l_collections = std::mem::take(&mut self.l_pending);
        export_collections(
            &mut self.book,
            &mut self.resolver,
            &l_collections,
            &self.options,
            &mut self.report,
        )?;

        self.apply_open_select();

        let bytes = self.book.to_bytes()?;
        let outcome = self.route.save(bytes);
        if let Some(warning) = outcome.warning {
            self.report.warn(warning);
        }
        self.report.n_bytes = outcome.bytes.len();
        self.report.path_backup = outcome.path_backup;

        tracing::info!(
            file_name = %self.route.file_name(),
            n_sheets = self.book.sheets().len(),
            n_bytes = self.report.n_bytes,
            if_download = outcome.if_download,
            "Exported workbook"
        );
        Ok(outcome.bytes)
    }

    /// Cumulative report of every write and warning so far.
    pub fn report(&self) -> &SpecXlsxReport {
        &self.report
    }

    /// Live workbook.
    pub fn book(&self) -> &XlsxBook {
        &self.book
    }

    pub fn route(&self) -> &SpecFileRoute {
        &self.route
    }

    pub fn options(&self) -> &SpecXlsxExportOptions {
        &self.options
    }

    fn apply_open_select(&mut self) {
        let Some((sheet_name, cell_address)) = &self.open_select else {
            return;
        };
        let res_select = parse_cell_address(cell_address).and_then(|(idx_row, idx_col)| {
            self.book.select_cell(sheet_name, idx_row, idx_col)
        });
        if let Err(err) = res_select {
            tracing::warn!(
                sheet_name = %sheet_name,
                cell_address = %cell_address,
                error = %err,
                "Open selection skipped"
            );
            self.report.warn(format!("Open selection skipped: {err}"));
        }
    }
}

/// Load the template workbook, or `None` when blank synthesis is needed.
fn load_template(source: &EnumXlsxSource, report: &mut SpecXlsxReport) -> Option<XlsxBook> {
    let EnumXlsxSource::Template { lookup, .. } = source else {
        return None;
    };

    let mut fallback = |reason: String| {
        tracing::warn!(
            lookup = %lookup,
            reason = %reason,
            "Template unusable; generating a blank workbook"
        );
        report.warn(format!(
            "Template {lookup:?} unusable ({reason}); generated a blank workbook"
        ));
        None
    };

    if !source.is_valid() {
        return fallback("source is not valid".to_string());
    }
    let bytes = match source.load() {
        Ok(bytes) => bytes,
        Err(err) => return fallback(err.to_string()),
    };
    match XlsxBook::from_bytes(&bytes) {
        Ok(book) => {
            tracing::debug!(lookup = %lookup, n_sheets = book.sheets().len(), "Loaded template");
            Some(book)
        }
        Err(err) => fallback(err.to_string()),
    }
}

/// Build a workbook from `collections`, then reopen its serialized bytes.
///
/// Each reopened sheet keeps the frontier of the book it was built from, so
/// trailing all-blank rows are not reused by later appends.
fn synthesize_blank_book(
    collections: &[SpecRecordCollection],
    resolver: &mut SchemaResolver,
    options: &SpecXlsxExportOptions,
    report: &mut SpecXlsxReport,
) -> Result<XlsxBook, XlsxExportError> {
    let mut book = XlsxBook::new();
    if collections.is_empty() {
        return Ok(book);
    }
    export_collections(&mut book, resolver, collections, options, report)?;
    let bytes = book.to_bytes()?;
    tracing::debug!(n_bytes = bytes.len(), "Synthesized blank workbook");

    let mut book_reopened = XlsxBook::from_bytes(&bytes)?;
    for sheet in book.sheets() {
        if let Some(sheet_reopened) = book_reopened.sheet_mut(sheet.name()) {
            sheet_reopened.extend_row_last(sheet.idx_row_last());
        }
    }
    Ok(book_reopened)
}

/// One-shot export of `collections` through `route`.
pub fn export_xlsx(
    collections: Vec<SpecRecordCollection>,
    route: SpecFileRoute,
    options: SpecXlsxExportOptions,
) -> Result<(Vec<u8>, SpecXlsxReport), XlsxExportError> {
    let mut exporter = XlsxExporter::new(collections, route, options)?;
    let bytes = exporter.run()?;
    Ok((bytes, exporter.report))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use sheetkit_io_fs::EnumSaveMethod;

    use super::*;
    use crate::record::XlsxRecord;
    use crate::schema::SchemaBuilder;
    use crate::spec::EnumCellValue;

    struct Tag {
        label: &'static str,
    }

    impl XlsxRecord for Tag {
        fn describe(builder: &mut SchemaBuilder) {
            builder.field("label");
        }

        fn cell_value(&self, field_name: &str) -> EnumCellValue {
            match field_name {
                "label" => self.label.into(),
                _ => EnumCellValue::None,
            }
        }
    }

    struct Note;

    impl XlsxRecord for Note {
        fn type_name() -> &'static str {
            "Notes/2024"
        }

        fn describe(builder: &mut SchemaBuilder) {
            builder.field("text");
        }

        fn cell_value(&self, _field_name: &str) -> EnumCellValue {
            "n".into()
        }
    }

    fn tags(l_labels: &[&'static str]) -> SpecRecordCollection {
        SpecRecordCollection::from_records(l_labels.iter().map(|label| Tag { label: *label }))
    }

    #[test]
    fn invalid_collection_leaves_book_untouched() {
        let mut book = XlsxBook::new();
        let mut resolver = SchemaResolver::new();
        let mut report = SpecXlsxReport::default();
        let collections = vec![tags(&["a"]), SpecRecordCollection::default().with_name("Empty")];

        let err = export_collections(
            &mut book,
            &mut resolver,
            &collections,
            &SpecXlsxExportOptions::default(),
            &mut report,
        )
        .unwrap_err();
        assert!(matches!(err, XlsxExportError::EmptyCollection { .. }));
        assert!(book.sheets().is_empty());
        assert!(report.sheets.is_empty());
    }

    #[test]
    fn type_derived_names_are_sanitized_explicit_names_are_not() {
        let mut book = XlsxBook::new();
        let mut resolver = SchemaResolver::new();
        let mut report = SpecXlsxReport::default();
        let options = SpecXlsxExportOptions::default();

        export_collections(
            &mut book,
            &mut resolver,
            &[SpecRecordCollection::from_records(vec![Note])],
            &options,
            &mut report,
        )
        .unwrap();
        assert_eq!(book.sheet_names(), vec!["Notes_2024"]);

        let err = export_collections(
            &mut book,
            &mut resolver,
            &[SpecRecordCollection::new("Bad/Name", vec![Note])],
            &options,
            &mut report,
        )
        .unwrap_err();
        assert!(matches!(err, XlsxExportError::InvalidSheetName { .. }));
    }

    #[test]
    fn case_clash_within_one_run_is_rejected_up_front() {
        let mut book = XlsxBook::new();
        let collections = vec![
            SpecRecordCollection::new("Tags", vec![Tag { label: "a" }]),
            SpecRecordCollection::new("TAGS", vec![Tag { label: "b" }]),
        ];

        let err = export_collections(
            &mut book,
            &mut SchemaResolver::new(),
            &collections,
            &SpecXlsxExportOptions::default(),
            &mut SpecXlsxReport::default(),
        )
        .unwrap_err();
        assert!(matches!(err, XlsxExportError::InvalidSheetName { .. }));
        assert!(book.sheets().is_empty());
    }

    #[test]
    fn same_name_twice_in_one_run_appends() {
        let mut book = XlsxBook::new();
        let mut report = SpecXlsxReport::default();
        let collections = vec![tags(&["a", "b"]), tags(&["c"])];

        export_collections(
            &mut book,
            &mut SchemaResolver::new(),
            &collections,
            &SpecXlsxExportOptions::default(),
            &mut report,
        )
        .unwrap();
        let sheet = book.sheet("Tag").unwrap();
        assert_eq!(sheet.idx_row_frontier(), 4);
        assert_eq!(sheet.value(3, 0), EnumCellValue::from("c"));
        assert!(report.sheets[0].if_new_sheet);
        assert!(!report.sheets[1].if_new_sheet);
        assert_eq!(report.sheets[1].idx_row_start, 3);
    }

    #[test]
    fn bad_open_selection_warns_and_still_serializes() {
        let route = SpecFileRoute::blank("tags.xlsx", EnumSaveMethod::Download).unwrap();
        let mut exporter =
            XlsxExporter::new(vec![tags(&["a"])], route, SpecXlsxExportOptions::default())
                .unwrap()
                .with_open_select("Missing", "B2");

        let bytes = exporter.run().unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(exporter.report().warnings.len(), 1);
        assert!(exporter.book().selection().is_none());
    }
}
