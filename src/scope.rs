//! Scopes and the Schema Model
//!
//! A [`Scope`] is the namespace-tagged content of one schema file. Records,
//! enums and fields point back at their owners through index handles
//! ([`ScopeId`], [`RecordId`], [`EnumId`]) into collections owned by the
//! context; they never own their parents.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::extract::{EnumFragment, RecordFragment, SchemaFragments};
use crate::types::FieldType;

// =============================================================================
// Handles
// =============================================================================

/// Position of a scope in parse order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScopeId(pub(crate) usize);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId {
    pub scope: ScopeId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumId {
    pub scope: ScopeId,
    pub index: usize,
}

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Table,
    Struct,
}

impl RecordKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            RecordKind::Table => "table",
            RecordKind::Struct => "struct",
        }
    }
}

/// `key` or `key: value` from a parenthesised attribute list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value: value.map(String::from),
        }
    }
}

/// One member of a record
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    /// Owning record (lookup only)
    pub record: RecordId,
}

impl Field {
    /// Owning scope (lookup only)
    pub fn scope(&self) -> ScopeId {
        self.record.scope
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }
}

/// A table or struct
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    pub name: String,
    pub is_root: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    pub fields: Vec<Field>,
    /// Dropped deprecated fields, kept for diagnostics only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deprecated_fields: Vec<String>,
}

impl Record {
    pub fn scope(&self) -> ScopeId {
        self.id.scope
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// An enum and its member names in source order
#[derive(Debug, Clone, Serialize)]
pub struct Enumeration {
    pub id: EnumId,
    pub name: String,
    pub underlying_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    pub values: Vec<String>,
}

impl Enumeration {
    pub fn scope(&self) -> ScopeId {
        self.id.scope
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Parsed content of one schema file
#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub id: ScopeId,
    /// File name without extension; unique within a context
    pub file_stem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Empty for the global namespace
    pub namespace: Vec<String>,
    /// Include stems as written
    pub include_stems: Vec<String>,
    /// Include stems resolved by the context, same order as `include_stems`
    pub(crate) included: Vec<ScopeId>,
    pub records: Vec<Record>,
    pub enums: Vec<Enumeration>,
}

impl Scope {
    /// Wrap one file's fragments, wiring every back-reference to `id`
    ///
    /// No cross-file resolution happens here; `included` stays empty until
    /// the context links scopes together.
    pub fn build(id: ScopeId, file_stem: impl Into<String>, fragments: SchemaFragments) -> Self {
        let file_stem = file_stem.into();
        let root_name = fragments
            .root_type
            .as_deref()
            .map(|r| r.rsplit('.').next().unwrap_or(r).to_string());

        let records: Vec<Record> = fragments
            .records
            .into_iter()
            .enumerate()
            .map(|(index, fragment)| build_record(RecordId { scope: id, index }, fragment, root_name.as_deref()))
            .collect();

        if let Some(root) = &root_name {
            if !records.iter().any(|r| &r.name == root) {
                tracing::warn!(scope = %file_stem, root_type = %root, "root_type does not name a record in this file");
            }
        }

        let enums = fragments
            .enums
            .into_iter()
            .enumerate()
            .map(|(index, fragment)| build_enum(EnumId { scope: id, index }, fragment))
            .collect();

        Self {
            id,
            file_stem,
            path: None,
            namespace: fragments.namespace,
            include_stems: fragments.includes,
            included: Vec::new(),
            records,
            enums,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Dotted namespace, empty for the global namespace
    pub fn namespace_path(&self) -> String {
        self.namespace.join(".")
    }

    /// Resolved includes (empty before linking)
    pub fn included(&self) -> &[ScopeId] {
        &self.included
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Enumeration> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// `demo.Item` for `Item` declared here
    pub fn qualified_name(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.namespace_path(), name)
        }
    }

    /// Lowercase dotted identifier of a type declared here (`demo.item`)
    ///
    /// Doubles as the stem of the per-type raw schema file.
    pub fn type_identifier(&self, name: &str) -> String {
        self.qualified_name(name).to_lowercase()
    }

    pub fn field_count(&self) -> usize {
        self.records.iter().map(|r| r.fields.len()).sum()
    }
}

fn build_record(id: RecordId, fragment: RecordFragment, root_name: Option<&str>) -> Record {
    let fields = fragment
        .fields
        .into_iter()
        .map(|f| Field {
            name: f.name,
            ty: f.ty,
            init: f.init,
            attributes: f.attributes,
            record: id,
        })
        .collect();

    Record {
        id,
        kind: fragment.kind,
        is_root: root_name == Some(fragment.name.as_str()),
        name: fragment.name,
        attributes: fragment.attributes,
        fields,
        deprecated_fields: fragment.deprecated,
    }
}

fn build_enum(id: EnumId, fragment: EnumFragment) -> Enumeration {
    Enumeration {
        id,
        name: fragment.name,
        underlying_type: fragment.underlying_type,
        attributes: fragment.attributes,
        values: fragment.values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SchemaExtractor;

    fn scope(stem: &str, text: &str) -> Scope {
        let fragments = SchemaExtractor::new().extract(text).unwrap();
        Scope::build(ScopeId(3), stem, fragments)
    }

    #[test]
    fn test_back_references_point_at_owner() {
        let s = scope("item", "namespace demo;\ntable Item { a:int; b:string; }\nenum E : int { X }");
        assert_eq!(s.id, ScopeId(3));
        let item = s.record("Item").unwrap();
        assert_eq!(item.scope(), ScopeId(3));
        assert_eq!(item.id.index, 0);
        for field in &item.fields {
            assert_eq!(field.record, item.id);
            assert_eq!(field.scope(), s.id);
        }
        assert_eq!(s.enumeration("E").unwrap().scope(), s.id);
    }

    #[test]
    fn test_root_type_marks_record() {
        let s = scope("m", "namespace g;\ntable A { x:int; }\ntable B { y:int; }\nroot_type g.B;");
        assert!(!s.record("A").unwrap().is_root);
        assert!(s.record("B").unwrap().is_root);
    }

    #[test]
    fn test_includes_unresolved_after_build() {
        let s = scope("item", "include \"color.fbs\";\ntable Item { a:int; }");
        assert_eq!(s.include_stems, vec!["color"]);
        assert!(s.included().is_empty());
    }

    #[test]
    fn test_names_and_identifiers() {
        let s = scope("item", "namespace Demo.Game;\ntable Item { a:int; }");
        assert_eq!(s.namespace_path(), "Demo.Game");
        assert_eq!(s.qualified_name("Item"), "Demo.Game.Item");
        assert_eq!(s.type_identifier("Item"), "demo.game.item");

        let global = scope("g", "table Item { a:int; }");
        assert_eq!(global.qualified_name("Item"), "Item");
        assert_eq!(global.type_identifier("Item"), "item");
    }

    #[test]
    fn test_field_lookup_and_attributes() {
        let s = scope("t", "table T { id:ulong (key); old:int (deprecated); }");
        let t = s.record("T").unwrap();
        assert!(t.field("id").unwrap().attribute("key").is_some());
        assert!(t.field("old").is_none());
        assert_eq!(t.deprecated_fields, vec!["old"]);
        assert_eq!(s.field_count(), 1);
    }
}
