//! Schema Text Extraction
//!
//! Scans one schema file for its namespace declaration, include statements,
//! `root_type`, enum blocks and table/struct blocks. The output is a set of
//! unresolved fragments; nothing here looks at other files.

use regex::Regex;
use std::path::Path;

use crate::error::Result;
use crate::scope::{Attribute, RecordKind};
use crate::types::{decompose, FieldType};

/// Everything extracted from one file
#[derive(Debug, Clone, Default)]
pub struct SchemaFragments {
    /// Declared namespace, empty for the global namespace
    pub namespace: Vec<String>,
    /// Included file stems, first-seen order, no duplicates
    pub includes: Vec<String>,
    /// Name given to `root_type`, as written
    pub root_type: Option<String>,
    pub records: Vec<RecordFragment>,
    pub enums: Vec<EnumFragment>,
}

/// A table or struct block
#[derive(Debug, Clone)]
pub struct RecordFragment {
    pub kind: RecordKind,
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Live fields in declaration order
    pub fields: Vec<FieldFragment>,
    /// Names of fields dropped for carrying `deprecated`
    pub deprecated: Vec<String>,
}

/// One live field of a record block
#[derive(Debug, Clone)]
pub struct FieldFragment {
    pub name: String,
    pub ty: FieldType,
    /// Default value, verbatim
    pub init: Option<String>,
    pub attributes: Vec<Attribute>,
}

/// An enum block
#[derive(Debug, Clone)]
pub struct EnumFragment {
    pub name: String,
    pub underlying_type: String,
    pub attributes: Vec<Attribute>,
    pub values: Vec<String>,
}

/// Regex-driven scanner for schema text
pub struct SchemaExtractor {
    comment: Regex,
    namespace: Regex,
    include: Regex,
    root_type: Regex,
    record: Regex,
    field: Regex,
    enumeration: Regex,
}

impl Default for SchemaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaExtractor {
    pub fn new() -> Self {
        Self {
            comment: Regex::new(r"//[^\n]*|/\*[\s\S]*?\*/").expect("comment pattern"),
            namespace: Regex::new(r"\bnamespace\s+([_a-zA-Z][_a-zA-Z0-9.]*)\s*;")
                .expect("namespace pattern"),
            include: Regex::new(r#"\binclude\s*"([^"]+)"\s*;"#).expect("include pattern"),
            root_type: Regex::new(r"\broot_type\s+([_a-zA-Z][_a-zA-Z0-9.]*)\s*;")
                .expect("root_type pattern"),
            record: Regex::new(
                r"\b(table|struct)\s+([_a-zA-Z][_a-zA-Z0-9]*)\s*(?:\(([^)]*)\))?\s*\{([^}]*)\}",
            )
            .expect("record pattern"),
            field: Regex::new(
                r"([_a-zA-Z][_a-zA-Z0-9]*)\s*:\s*([^;=(]*?)\s*(?:=\s*([^;(]*?)\s*)?(?:\(([^)]*)\))?\s*;",
            )
            .expect("field pattern"),
            enumeration: Regex::new(
                r"\benum\s+([_a-zA-Z][_a-zA-Z0-9]*)\s*:\s*([_a-zA-Z][_a-zA-Z0-9]*)\s*(?:\(([^)]*)\))?\s*\{([^}]*)\}",
            )
            .expect("enum pattern"),
        }
    }

    /// Extract all fragments from one file's text
    pub fn extract(&self, text: &str) -> Result<SchemaFragments> {
        let text = self.strip_comments(text);

        Ok(SchemaFragments {
            namespace: self.namespace(&text),
            includes: self.includes(&text),
            root_type: self
                .root_type
                .captures(&text)
                .map(|c| c[1].to_string()),
            records: self.records(&text)?,
            enums: self.enums(&text),
        })
    }

    /// Line and block comments in one left-to-right pass, so a comment
    /// opener inside the other kind of comment is inert
    fn strip_comments(&self, text: &str) -> String {
        self.comment.replace_all(text, " ").into_owned()
    }

    /// First declaration wins; none means the global namespace
    fn namespace(&self, text: &str) -> Vec<String> {
        self.namespace
            .captures(text)
            .map(|c| c[1].split('.').filter(|p| !p.is_empty()).map(String::from).collect())
            .unwrap_or_default()
    }

    fn includes(&self, text: &str) -> Vec<String> {
        let mut stems: Vec<String> = Vec::new();
        for captures in self.include.captures_iter(text) {
            let stem = file_stem(&captures[1]);
            if !stem.is_empty() && !stems.contains(&stem) {
                stems.push(stem);
            }
        }
        stems
    }

    fn records(&self, text: &str) -> Result<Vec<RecordFragment>> {
        let mut records = Vec::new();
        for captures in self.record.captures_iter(text) {
            let kind = match &captures[1] {
                "struct" => RecordKind::Struct,
                _ => RecordKind::Table,
            };
            let mut record = RecordFragment {
                kind,
                name: captures[2].to_string(),
                attributes: captures.get(3).map(|m| parse_attributes(m.as_str())).unwrap_or_default(),
                fields: Vec::new(),
                deprecated: Vec::new(),
            };

            for field in self.field.captures_iter(&captures[4]) {
                let name = field[1].to_string();
                let attributes = field.get(4).map(|m| parse_attributes(m.as_str())).unwrap_or_default();
                if attributes.iter().any(|a| a.key == "deprecated") {
                    record.deprecated.push(name);
                    continue;
                }

                let ty = decompose(&field[2])?;
                record.fields.push(FieldFragment {
                    name,
                    ty,
                    init: field.get(3).map(|m| m.as_str().trim().to_string()).filter(|s| !s.is_empty()),
                    attributes,
                });
            }

            records.push(record);
        }
        Ok(records)
    }

    fn enums(&self, text: &str) -> Vec<EnumFragment> {
        self.enumeration
            .captures_iter(text)
            .map(|captures| EnumFragment {
                name: captures[1].to_string(),
                underlying_type: captures[2].to_string(),
                attributes: captures.get(3).map(|m| parse_attributes(m.as_str())).unwrap_or_default(),
                values: captures[4]
                    .split(',')
                    .map(|v| v.split('=').next().unwrap_or("").trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            })
            .collect()
    }
}

/// `id: 2, required` → `[("id", Some("2")), ("required", None)]`
fn parse_attributes(text: &str) -> Vec<Attribute> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| match item.split_once(':') {
            Some((key, value)) => Attribute::new(key.trim(), Some(value.trim())),
            None => Attribute::new(item, None),
        })
        .collect()
}

/// `"sub/common.fbs"` → `common`
fn file_stem(include: &str) -> String {
    Path::new(include.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::types::Primitive;

    fn extract(text: &str) -> SchemaFragments {
        SchemaExtractor::new().extract(text).unwrap()
    }

    #[test]
    fn test_namespace_first_declaration_wins() {
        let fragments = extract("namespace fb.game;\nnamespace other;\n");
        assert_eq!(fragments.namespace, vec!["fb", "game"]);
    }

    #[test]
    fn test_missing_namespace_is_global() {
        let fragments = extract("table A { x:int; }");
        assert!(fragments.namespace.is_empty());
    }

    #[test]
    fn test_includes_are_stems_deduplicated_in_order() {
        let fragments = extract(
            r#"include "b.fbs";
include "sub/a.fbs";
include "b.fbs";
"#,
        );
        assert_eq!(fragments.includes, vec!["b", "a"]);
    }

    #[test]
    fn test_table_and_struct_blocks() {
        let fragments = extract(
            "struct Vec3 (force_align: 16) { x:float; y:float; z:float; }\n\
             table Monster { pos:Vec3; hp:short = 100; name:string (required); }",
        );
        assert_eq!(fragments.records.len(), 2);

        let vec3 = &fragments.records[0];
        assert_eq!(vec3.kind, RecordKind::Struct);
        assert_eq!(vec3.attributes, vec![Attribute::new("force_align", Some("16"))]);
        assert_eq!(vec3.fields.len(), 3);

        let monster = &fragments.records[1];
        assert_eq!(monster.kind, RecordKind::Table);
        let names: Vec<_> = monster.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["pos", "hp", "name"]);
        assert_eq!(monster.fields[1].init.as_deref(), Some("100"));
        assert_eq!(monster.fields[1].ty.primitive_kind(), Some(Primitive::Short));
        assert_eq!(monster.fields[2].attributes, vec![Attribute::new("required", None)]);
    }

    #[test]
    fn test_deprecated_fields_are_dropped() {
        let fragments = extract("table T { a:int; old:int (deprecated); b:[string]; }");
        let record = &fragments.records[0];
        let names: Vec<_> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(record.deprecated, vec!["old"]);
    }

    #[test]
    fn test_deprecated_with_other_attributes() {
        let fragments = extract("table T { old:int = 3 (id: 1, deprecated); }");
        assert!(fragments.records[0].fields.is_empty());
        assert_eq!(fragments.records[0].deprecated, vec!["old"]);
    }

    #[test]
    fn test_enum_values_drop_assignments() {
        let fragments = extract("enum Color : ubyte { Red = 1, Green, Blue = 8, }");
        let e = &fragments.enums[0];
        assert_eq!(e.name, "Color");
        assert_eq!(e.underlying_type, "ubyte");
        assert_eq!(e.values, vec!["Red", "Green", "Blue"]);
    }

    #[test]
    fn test_enum_duplicates_preserved() {
        let fragments = extract("enum E : int { A, B, A }");
        assert_eq!(fragments.enums[0].values, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_comments_are_ignored() {
        let fragments = extract(
            "// table Ghost { x:int; }\n\
             /* namespace wrong; */\n\
             namespace right;\n\
             table Real { x:int; // trailing\n y:int; }",
        );
        assert_eq!(fragments.namespace, vec!["right"]);
        assert_eq!(fragments.records.len(), 1);
        assert_eq!(fragments.records[0].fields.len(), 2);
    }

    #[test]
    fn test_block_opener_inside_line_comment_is_inert() {
        let fragments = extract(
            "namespace n;\n// old layout: /* moved to B\ntable A { x:int; }\n/* note */\ntable B { y:int; }\n",
        );
        let names: Vec<_> = fragments.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_line_opener_inside_block_comment_is_inert() {
        let fragments = extract("/* see http://example.com\n table Ghost { x:int; } */\ntable Real { x:int; }");
        let names: Vec<_> = fragments.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Real"]);
    }

    #[test]
    fn test_fixed_length_array_fields() {
        let fragments = extract("struct Vec3 { v:[float:3]; }\nstruct S { a:[int:3]; b:int; ps:[Vec3:2]; }");
        let s = &fragments.records[1];
        let names: Vec<_> = s.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "ps"]);
        assert_eq!(s.fields[0].ty.fixed_length(), Some(3));
        assert_eq!(s.fields[2].ty.element().unwrap().base_name(), Some("Vec3"));
    }

    #[test]
    fn test_root_type_captured() {
        let fragments = extract("table Monster { hp:int; }\nroot_type Monster;");
        assert_eq!(fragments.root_type.as_deref(), Some("Monster"));
    }

    #[test]
    fn test_init_captured_verbatim() {
        let fragments = extract("table T { c:Color = Color.Blue; f:float = -1.5e3; }");
        let fields = &fragments.records[0].fields;
        assert_eq!(fields[0].init.as_deref(), Some("Color.Blue"));
        assert_eq!(fields[1].init.as_deref(), Some("-1.5e3"));
    }

    #[test]
    fn test_bad_field_type_fails() {
        let err = SchemaExtractor::new()
            .extract("table T { xs:[int]?; }")
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));

        let err = SchemaExtractor::new()
            .extract("table T { xs:[int; }")
            .unwrap_err();
        assert!(matches!(err, SchemaError::MalformedFieldType { .. }));
    }

    #[test]
    fn test_attribute_parsing() {
        assert_eq!(
            parse_attributes(" id: 2 , required ,"),
            vec![Attribute::new("id", Some("2")), Attribute::new("required", None)]
        );
        assert!(parse_attributes("").is_empty());
    }
}
