//! Record traits and named record collections.
//!
//! A record type declares its exported fields once through
//! [`XlsxRecord::describe`] and hands out one [`EnumCellValue`] per field.
//! Collections box records as [`ExportRecord`] so one export run can carry
//! collections of different record types.

use std::any::TypeId;
use std::fmt;

use crate::schema::SchemaBuilder;
use crate::spec::{EnumCellValue, XlsxExportError};
use crate::util::derive_simple_type_name;

////////////////////////////////////////////////////////////////////////////////
// #region RecordTraits

/// A typed record exportable as one worksheet row.
pub trait XlsxRecord: 'static {
    /// Simple type name used as the default sheet name.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        derive_simple_type_name(std::any::type_name::<Self>())
    }

    /// Declare exported fields in order, with their direct annotations.
    fn describe(builder: &mut SchemaBuilder)
    where
        Self: Sized;

    /// Value of `field_name` for this record.
    fn cell_value(&self, field_name: &str) -> EnumCellValue;
}

/// Object-safe view of an [`XlsxRecord`].
pub trait ExportRecord {
    /// Identity of the concrete record type.
    fn record_type(&self) -> SpecRecordType;

    /// Value of `field_name` for this record.
    fn field_value(&self, field_name: &str) -> EnumCellValue;
}

impl<T: XlsxRecord> ExportRecord for T {
    fn record_type(&self) -> SpecRecordType {
        SpecRecordType::of::<T>()
    }

    fn field_value(&self, field_name: &str) -> EnumCellValue {
        self.cell_value(field_name)
    }
}

/// Record type identity plus its schema declaration.
#[derive(Clone, Copy)]
pub struct SpecRecordType {
    /// Concrete type id.
    pub type_id: TypeId,
    /// Simple type name.
    pub type_name: &'static str,
    /// Schema declaration entry point.
    pub describe: fn(&mut SchemaBuilder),
}

impl SpecRecordType {
    /// Identity of `T`.
    pub fn of<T: XlsxRecord>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            describe: T::describe,
        }
    }
}

impl PartialEq for SpecRecordType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for SpecRecordType {}

impl fmt::Debug for SpecRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRecordType")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordCollection

/// Named, homogeneous group of records destined for one worksheet.
#[derive(Default)]
pub struct SpecRecordCollection {
    name: Option<String>,
    items: Vec<Box<dyn ExportRecord>>,
}

impl SpecRecordCollection {
    /// Collection with an explicit sheet name.
    pub fn new<T: XlsxRecord>(name: impl Into<String>, records: Vec<T>) -> Self {
        Self::from_records(records).with_name(name)
    }

    /// Unnamed collection; the sheet name defaults to the record type name.
    pub fn from_records<T: XlsxRecord>(records: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::default();
        collection.extend(records);
        collection
    }

    /// Return the collection with `name` set.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append one record.
    pub fn push<T: XlsxRecord>(&mut self, record: T) {
        self.items.push(Box::new(record));
    }

    /// Append one already boxed record.
    pub fn push_boxed(&mut self, record: Box<dyn ExportRecord>) {
        self.items.push(record);
    }

    /// Append a range of records.
    pub fn extend<T: XlsxRecord>(&mut self, records: impl IntoIterator<Item = T>) {
        self.items.extend(
            records
                .into_iter()
                .map(|record| Box::new(record) as Box<dyn ExportRecord>),
        );
    }

    /// Explicit sheet name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn records(&self) -> &[Box<dyn ExportRecord>] {
        &self.items
    }

    /// Record type shared by every item.
    ///
    /// Empty collections and collections mixing record types are rejected.
    pub fn record_type(&self) -> Result<SpecRecordType, XlsxExportError> {
        let Some(first) = self.items.first() else {
            return Err(XlsxExportError::EmptyCollection {
                name: self.derive_display_name(),
            });
        };
        let record_type = first.record_type();

        for (idx_item, item) in self.items.iter().enumerate().skip(1) {
            let record_type_item = item.record_type();
            if record_type_item != record_type {
                return Err(XlsxExportError::HeterogeneousCollection {
                    name: self
                        .name
                        .clone()
                        .unwrap_or_else(|| record_type.type_name.to_string()),
                    expected: record_type.type_name.to_string(),
                    found: record_type_item.type_name.to_string(),
                    idx_item,
                });
            }
        }
        Ok(record_type)
    }

    /// Explicit name, or the simple name of the record type.
    pub fn effective_name(&self) -> Result<String, XlsxExportError> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.record_type()
            .map(|record_type| record_type.type_name.to_string())
    }

    fn derive_display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<unnamed>".to_string())
    }
}

impl fmt::Debug for SpecRecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRecordCollection")
            .field("name", &self.name)
            .field("n_items", &self.items.len())
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha {
        n: i64,
    }

    impl XlsxRecord for Alpha {
        fn describe(builder: &mut SchemaBuilder) {
            builder.field("n");
        }

        fn cell_value(&self, field_name: &str) -> EnumCellValue {
            match field_name {
                "n" => self.n.into(),
                _ => EnumCellValue::None,
            }
        }
    }

    struct Beta;

    impl XlsxRecord for Beta {
        fn type_name() -> &'static str {
            "BetaRows"
        }

        fn describe(_builder: &mut SchemaBuilder) {}

        fn cell_value(&self, _field_name: &str) -> EnumCellValue {
            EnumCellValue::None
        }
    }

    #[test]
    fn name_defaults_to_simple_type_name() {
        let collection = SpecRecordCollection::from_records(vec![Alpha { n: 1 }]);
        assert_eq!(collection.effective_name().unwrap(), "Alpha");
        assert_eq!(collection.name(), None);

        let collection = SpecRecordCollection::from_records(vec![Beta]);
        assert_eq!(collection.effective_name().unwrap(), "BetaRows");

        let collection = SpecRecordCollection::new("Custom", vec![Alpha { n: 1 }]);
        assert_eq!(collection.effective_name().unwrap(), "Custom");
    }

    #[test]
    fn empty_collection_is_rejected() {
        let collection = SpecRecordCollection::default();
        assert!(matches!(
            collection.record_type(),
            Err(XlsxExportError::EmptyCollection { .. })
        ));
        assert!(collection.effective_name().is_err());

        let named = SpecRecordCollection::default().with_name("Named");
        assert_eq!(named.effective_name().unwrap(), "Named");
        assert!(named.record_type().is_err());
    }

    #[test]
    fn mixed_collection_is_rejected() {
        let mut collection = SpecRecordCollection::from_records(vec![Alpha { n: 1 }]);
        collection.push(Beta);

        let err = collection.record_type().unwrap_err();
        assert_eq!(
            err,
            XlsxExportError::HeterogeneousCollection {
                name: "Alpha".to_string(),
                expected: "Alpha".to_string(),
                found: "BetaRows".to_string(),
                idx_item: 1,
            }
        );
    }

    #[test]
    fn extend_appends_in_order() {
        let mut collection = SpecRecordCollection::from_records(vec![Alpha { n: 1 }]);
        collection.extend(vec![Alpha { n: 2 }, Alpha { n: 3 }]);

        let l_values: Vec<EnumCellValue> = collection
            .records()
            .iter()
            .map(|record| record.field_value("n"))
            .collect();
        assert_eq!(
            l_values,
            vec![
                EnumCellValue::Number(1.0),
                EnumCellValue::Number(2.0),
                EnumCellValue::Number(3.0)
            ]
        );
        assert_eq!(collection.len(), 3);
    }
}
