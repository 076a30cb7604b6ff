//! Derived Views
//!
//! Pure functions over a resolved [`Context`]: the deduplicated set of
//! nullable payload types, the per-record reference files, and the wrapper
//! schema fragments synthesized for each nullable payload. Nothing is
//! cached; every call recomputes from the context.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;
use tracing::warn;

use crate::checksum::Checksum;
use crate::context::{Context, ContextStats, TypeClass, TypeRef};
use crate::scope::{RecordId, Scope};
use crate::types::{FieldType, TypeKey, TypeKind};

// =============================================================================
// Nullable Fields
// =============================================================================

/// One distinct nullable payload type
#[derive(Debug, Clone, Serialize)]
pub struct NullableField {
    /// Structural key with the namespace pinned; unique within the view
    pub key: TypeKey,
    /// Payload type as declared by the first field that used it
    #[serde(rename = "type")]
    pub ty: FieldType,
    /// Namespace the payload lives in; empty for primitives
    pub namespace: Vec<String>,
    pub type_name: String,
    pub class: TypeClass,
    /// First declaring record
    pub record: RecordId,
    /// First declaring field
    pub field: String,
}

impl NullableField {
    /// `demo.Color`, or `int` for primitives
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}.{}", self.namespace.join("."), self.type_name)
        }
    }
}

/// Every distinct nullable, non-string, non-array payload type in the context
///
/// Fields are walked in parse and declaration order, element chains
/// included; the first field to use a key decides the entry.
pub fn nullable_fields(ctx: &Context) -> Vec<NullableField> {
    let mut seen: HashSet<TypeKey> = HashSet::new();
    let mut entries = Vec::new();

    for (scope, record, field) in ctx.fields() {
        let mut current = Some(&field.ty);
        while let Some(ty) = current {
            current = ty.element();
            if !ty.nullable || ty.is_array() || ty.primitive_kind().is_some_and(|p| p.is_string()) {
                continue;
            }

            let key = ty.key_in(&scope.namespace);
            if !seen.insert(key.clone()) {
                continue;
            }

            let (namespace, type_name) = match &ty.kind {
                TypeKind::Named { name } => (
                    name.effective_namespace(&scope.namespace).to_vec(),
                    name.name.clone(),
                ),
                _ => (Vec::new(), ty.base_name().unwrap_or_default().to_string()),
            };

            entries.push(NullableField {
                key,
                ty: ty.clone(),
                namespace,
                type_name,
                class: ctx.classify_type(ty, scope.id),
                record: record.id,
                field: field.name.clone(),
            });
        }
    }

    entries
}

// =============================================================================
// Reference Files
// =============================================================================

/// Lowercase dotted identifiers of every record and enum `record` refers to
///
/// Array element chains are followed to the innermost type. A record that
/// refers to itself lists its own identifier.
pub fn reference_files(ctx: &Context, record: RecordId) -> BTreeSet<String> {
    ctx.record(record)
        .fields
        .iter()
        .filter_map(|field| ctx.classify_element(field).type_ref())
        .map(|type_ref| ctx.type_identifier(type_ref))
        .collect()
}

// =============================================================================
// Nullable Wrappers
// =============================================================================

/// Synthesized single-field table carrying one nullable payload
#[derive(Debug, Clone, Serialize)]
pub struct NullableWrapper {
    pub key: TypeKey,
    pub namespace: Vec<String>,
    /// Payload type name as written inside the wrapper
    pub payload: String,
    /// Raw file stem to include, when the payload is a record or enum
    pub include: Option<String>,
    pub text: String,
    pub checksum: Checksum,
}

impl NullableWrapper {
    pub fn from_field(ctx: &Context, field: &NullableField) -> Self {
        let include = field.class.type_ref().map(|t| ctx.type_identifier(t));
        let text = render_wrapper(field, include.as_deref());
        Self {
            key: field.key.clone(),
            namespace: field.namespace.clone(),
            payload: field.type_name.clone(),
            include,
            checksum: Checksum::of_text(&text),
            text,
        }
    }

    /// `nullable_demo_color.fbs`
    pub fn file_name(&self) -> String {
        let parts: Vec<&str> = self
            .namespace
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.payload.as_str()))
            .collect();
        format!("nullable_{}.fbs", parts.join("_")).to_lowercase()
    }

    /// `NullableColor`
    pub fn type_name(&self) -> String {
        wrapper_type_name(&self.payload)
    }
}

/// One wrapper per entry of [`nullable_fields`], same order
///
/// Distinct keys can map to one file name (`a_b.C?` and `a.b_C?`); each
/// such clash is logged.
pub fn nullable_wrappers(ctx: &Context) -> Vec<NullableWrapper> {
    let wrappers: Vec<NullableWrapper> = nullable_fields(ctx)
        .iter()
        .map(|field| NullableWrapper::from_field(ctx, field))
        .collect();

    for (file_name, keys) in file_name_collisions(&wrappers) {
        let keys: Vec<&str> = keys.iter().map(TypeKey::as_str).collect();
        warn!(file = %file_name, keys = %keys.join(", "), "nullable wrappers share a file name");
    }
    wrappers
}

/// File names claimed by more than one wrapper, with the clashing keys
pub fn file_name_collisions(wrappers: &[NullableWrapper]) -> BTreeMap<String, Vec<TypeKey>> {
    let mut by_name: BTreeMap<String, Vec<TypeKey>> = BTreeMap::new();
    for wrapper in wrappers {
        by_name.entry(wrapper.file_name()).or_default().push(wrapper.key.clone());
    }
    by_name.retain(|_, keys| keys.len() > 1);
    by_name
}

fn wrapper_type_name(payload: &str) -> String {
    let mut chars = payload.chars();
    match chars.next() {
        Some(first) => format!("Nullable{}{}", first.to_uppercase(), chars.as_str()),
        None => "Nullable".to_string(),
    }
}

fn render_wrapper(field: &NullableField, include: Option<&str>) -> String {
    let mut text = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(text, "// Nullable wrapper for {}", field.qualified_name());
    if let Some(include) = include {
        let _ = writeln!(text, "include \"{}.fbs\";", include);
    }
    text.push('\n');
    if !field.namespace.is_empty() {
        let _ = writeln!(text, "namespace {};", field.namespace.join("."));
        text.push('\n');
    }
    let _ = writeln!(text, "table {} {{", wrapper_type_name(&field.type_name));
    let _ = writeln!(text, "  value:{};", field.type_name);
    text.push_str("}\n");
    text
}

// =============================================================================
// Export
// =============================================================================

/// References of one record, for export
#[derive(Debug, Clone, Serialize)]
pub struct RecordReferences {
    pub record: String,
    pub scope: String,
    pub references: BTreeSet<String>,
}

/// Plain-data snapshot of a context and its views
#[derive(Debug, Serialize)]
pub struct GraphExport<'a> {
    pub bundle_hash: &'a Checksum,
    pub stats: ContextStats,
    pub scopes: &'a [Scope],
    pub nullable_fields: Vec<NullableField>,
    pub reference_files: Vec<RecordReferences>,
}

impl<'a> GraphExport<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        let reference_files = ctx
            .records()
            .map(|record| RecordReferences {
                record: ctx.qualified_name(TypeRef::Record(record.id)),
                scope: ctx.scope(record.scope()).file_stem.clone(),
                references: reference_files(ctx, record.id),
            })
            .collect();

        Self {
            bundle_hash: ctx.bundle_hash(),
            stats: ctx.stats(),
            scopes: ctx.scopes(),
            nullable_fields: nullable_fields(ctx),
            reference_files,
        }
    }
}
