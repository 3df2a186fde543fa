//! Column schema resolution.
//!
//! Record types declare fields and direct annotations through
//! [`SchemaBuilder`]; an optional companion type declares fallback annotations
//! for same-named members through [`CompanionBuilder`]. Resolution applies the
//! cascade direct annotation → companion annotation → default per field.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::record::{SpecRecordType, XlsxRecord};
use crate::spec::EnumDataKind;

////////////////////////////////////////////////////////////////////////////////
// #region Annotations

/// Annotations attached to one field or companion member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecFieldMeta {
    /// Exclude from the schema.
    pub ignore: Option<bool>,
    /// Friendly label, highest label priority.
    pub friendly_name: Option<String>,
    /// Display label.
    pub display_name: Option<String>,
    /// Semantic data kind.
    pub data_kind: Option<EnumDataKind>,
}

/// Chained annotation setter for one field.
pub struct FieldBuilder<'a> {
    meta: &'a mut SpecFieldMeta,
}

impl FieldBuilder<'_> {
    /// Exclude this field from the export.
    pub fn ignore(self) -> Self {
        self.meta.ignore = Some(true);
        self
    }

    /// Set the ignore flag explicitly; `false` overrides a companion `ignore`.
    pub fn ignore_as(self, value: bool) -> Self {
        self.meta.ignore = Some(value);
        self
    }

    pub fn friendly_name(self, label: impl Into<String>) -> Self {
        self.meta.friendly_name = Some(label.into());
        self
    }

    pub fn display_name(self, label: impl Into<String>) -> Self {
        self.meta.display_name = Some(label.into());
        self
    }

    pub fn kind(self, kind: EnumDataKind) -> Self {
        self.meta.data_kind = Some(kind);
        self
    }
}

fn _entry_meta<'a>(
    l_entries: &'a mut Vec<(String, SpecFieldMeta)>,
    name: &str,
) -> FieldBuilder<'a> {
    let n_idx = match l_entries.iter().position(|(c_name, _)| c_name == name) {
        Some(n_idx) => n_idx,
        None => {
            l_entries.push((name.to_string(), SpecFieldMeta::default()));
            l_entries.len() - 1
        }
    };
    FieldBuilder {
        meta: &mut l_entries[n_idx].1,
    }
}

/// Companion type carrying fallback annotations for a record type.
pub trait XlsxCompanion: 'static {
    /// Declare annotated members by field name.
    fn describe_members(builder: &mut CompanionBuilder);
}

/// Collects companion member annotations.
#[derive(Debug, Default)]
pub struct CompanionBuilder {
    l_members: Vec<(String, SpecFieldMeta)>,
}

impl CompanionBuilder {
    /// Annotate the member matching record field `name`.
    pub fn member(&mut self, name: &str) -> FieldBuilder<'_> {
        _entry_meta(&mut self.l_members, name)
    }
}

/// Collects a record type's fields in declaration order.
#[derive(Default)]
pub struct SchemaBuilder {
    l_fields: Vec<(String, SpecFieldMeta)>,
    companion: Option<fn(&mut CompanionBuilder)>,
}

impl SchemaBuilder {
    /// Declare the next field; declaring a name twice edits the first entry.
    pub fn field(&mut self, name: &str) -> FieldBuilder<'_> {
        _entry_meta(&mut self.l_fields, name)
    }

    /// Attach a companion type as annotation fallback.
    pub fn companion<C: XlsxCompanion>(&mut self) -> &mut Self {
        self.companion = Some(C::describe_members);
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnSchema

/// One exported column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumn {
    /// Record field the value is read from.
    pub source_field: String,
    /// Header label.
    pub label: String,
    /// Semantic data kind.
    pub kind: EnumDataKind,
}

/// Ordered exported columns of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnSchema {
    /// Record type the schema was derived from.
    pub type_id: TypeId,
    /// Simple record type name.
    pub type_name: &'static str,
    /// Columns in field declaration order, ignored fields removed.
    pub columns: Vec<SpecColumn>,
}

impl SpecColumnSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Header labels in column order.
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.label.as_str()).collect()
    }
}

fn resolve_label(direct: &SpecFieldMeta, companion: Option<&SpecFieldMeta>, raw: &str) -> String {
    direct
        .friendly_name
        .as_ref()
        .or(direct.display_name.as_ref())
        .or_else(|| companion.and_then(|meta| meta.friendly_name.as_ref()))
        .or_else(|| companion.and_then(|meta| meta.display_name.as_ref()))
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

/// Resolve the column schema of `record_type`.
pub fn resolve_schema(record_type: &SpecRecordType) -> SpecColumnSchema {
    let mut builder = SchemaBuilder::default();
    (record_type.describe)(&mut builder);

    let mut builder_companion = CompanionBuilder::default();
    if let Some(describe_members) = builder.companion {
        describe_members(&mut builder_companion);
    }
    let dict_companion: HashMap<&str, &SpecFieldMeta> = builder_companion
        .l_members
        .iter()
        .map(|(c_name, meta)| (c_name.as_str(), meta))
        .collect();

    let columns = builder
        .l_fields
        .iter()
        .filter_map(|(c_field, meta_direct)| {
            let meta_companion = dict_companion.get(c_field.as_str()).copied();

            let if_ignore = meta_direct
                .ignore
                .or_else(|| meta_companion.and_then(|meta| meta.ignore))
                .unwrap_or(false);
            if if_ignore {
                return None;
            }

            Some(SpecColumn {
                source_field: c_field.clone(),
                label: resolve_label(meta_direct, meta_companion, c_field),
                kind: meta_direct
                    .data_kind
                    .or_else(|| meta_companion.and_then(|meta| meta.data_kind))
                    .unwrap_or_default(),
            })
        })
        .collect();

    SpecColumnSchema {
        type_id: record_type.type_id,
        type_name: record_type.type_name,
        columns,
    }
}

/// Memoizing resolver keyed by record type.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    dict_cache: HashMap<TypeId, Arc<SpecColumnSchema>>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema of `record_type`, resolving it on first use.
    pub fn resolve(&mut self, record_type: &SpecRecordType) -> Arc<SpecColumnSchema> {
        self.dict_cache
            .entry(record_type.type_id)
            .or_insert_with(|| {
                tracing::debug!(type_name = record_type.type_name, "Resolving column schema");
                Arc::new(resolve_schema(record_type))
            })
            .clone()
    }

    /// Cached schema of `T`.
    pub fn resolve_for<T: XlsxRecord>(&mut self) -> Arc<SpecColumnSchema> {
        self.resolve(&SpecRecordType::of::<T>())
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.dict_cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_cache.is_empty()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
