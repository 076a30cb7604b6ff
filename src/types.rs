//! Field Type Expressions
//!
//! Decomposes a declared field type such as `[foo.Bar]` or `Color?` into a
//! [`FieldType`]. Decomposition is purely syntactic: it knows nothing about
//! other files, so a named type is only resolved later by the context.
//!
//! Markers are stripped in a fixed order:
//! 1. a trailing `?` sets the nullable flag
//! 2. surrounding `[...]` makes an array and the inner text is decomposed again
//! 3. otherwise the text is split on its last `.` into namespace and base name

use serde::Serialize;
use std::fmt;

use crate::error::{Result, SchemaError};

// =============================================================================
// Primitive
// =============================================================================

/// Built-in scalar and string types
///
/// These names are reserved: a record or enum with the same name never
/// shadows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    String,
}

impl Primitive {
    /// Look up a primitive by its schema spelling, including sized aliases
    pub fn from_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "bool" => Primitive::Bool,
            "byte" | "int8" => Primitive::Byte,
            "ubyte" | "uint8" => Primitive::UByte,
            "short" | "int16" => Primitive::Short,
            "ushort" | "uint16" => Primitive::UShort,
            "int" | "int32" => Primitive::Int,
            "uint" | "uint32" => Primitive::UInt,
            "long" | "int64" => Primitive::Long,
            "ulong" | "uint64" => Primitive::ULong,
            "float" | "float32" => Primitive::Float,
            "double" | "float64" => Primitive::Double,
            "string" => Primitive::String,
            _ => return None,
        };
        Some(primitive)
    }

    /// Canonical schema spelling
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Byte => "byte",
            Primitive::UByte => "ubyte",
            Primitive::Short => "short",
            Primitive::UShort => "ushort",
            Primitive::Int => "int",
            Primitive::UInt => "uint",
            Primitive::Long => "long",
            Primitive::ULong => "ulong",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "string",
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Primitive::String)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Type Name
// =============================================================================

/// A possibly namespace-qualified reference to a record or enum
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeName {
    /// Present only when the source spelled out a namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Vec<String>>,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: Option<Vec<String>>, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Namespace the name is looked up in: its own qualifier, else the fallback
    pub fn effective_namespace<'a>(&'a self, fallback: &'a [String]) -> &'a [String] {
        self.namespace.as_deref().unwrap_or(fallback)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            for part in namespace {
                write!(f, "{}.", part)?;
            }
        }
        f.write_str(&self.name)
    }
}

// =============================================================================
// Field Type
// =============================================================================

/// Shape of a declared field type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Primitive { primitive: Primitive },
    Named { name: TypeName },
    Array {
        element: Box<FieldType>,
        /// Fixed length of a struct array (`[int:3]`)
        #[serde(skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
}

/// A decomposed field type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldType {
    pub nullable: bool,
    #[serde(flatten)]
    pub kind: TypeKind,
}

impl FieldType {
    pub fn primitive(primitive: Primitive) -> Self {
        Self {
            nullable: false,
            kind: TypeKind::Primitive { primitive },
        }
    }

    pub fn named(name: TypeName) -> Self {
        Self {
            nullable: false,
            kind: TypeKind::Named { name },
        }
    }

    pub fn array(element: FieldType) -> Self {
        Self {
            nullable: false,
            kind: TypeKind::Array {
                element: Box::new(element),
                length: None,
            },
        }
    }

    /// Fixed-length array, as allowed inside structs
    pub fn fixed_array(element: FieldType, length: usize) -> Self {
        Self {
            nullable: false,
            kind: TypeKind::Array {
                element: Box::new(element),
                length: Some(length),
            },
        }
    }

    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    /// Element type, present iff this is an array
    pub fn element(&self) -> Option<&FieldType> {
        match &self.kind {
            TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Declared length of a fixed-length array
    pub fn fixed_length(&self) -> Option<usize> {
        match &self.kind {
            TypeKind::Array { length, .. } => *length,
            _ => None,
        }
    }

    /// Follow the element chain down to the first non-array type
    pub fn innermost(&self) -> &FieldType {
        let mut current = self;
        while let Some(element) = current.element() {
            current = element;
        }
        current
    }

    /// Number of array wrappers around the innermost type
    pub fn array_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(element) = current.element() {
            depth += 1;
            current = element;
        }
        depth
    }

    pub fn primitive_kind(&self) -> Option<Primitive> {
        match &self.kind {
            TypeKind::Primitive { primitive } => Some(*primitive),
            _ => None,
        }
    }

    pub fn type_name(&self) -> Option<&TypeName> {
        match &self.kind {
            TypeKind::Named { name } => Some(name),
            _ => None,
        }
    }

    /// Base name of a non-array type (`None` for arrays)
    pub fn base_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Primitive { primitive } => Some(primitive.name()),
            TypeKind::Named { name } => Some(&name.name),
            TypeKind::Array { .. } => None,
        }
    }

    /// Namespace qualifier as written in the source
    pub fn namespace_qualifier(&self) -> Option<&[String]> {
        self.type_name().and_then(|n| n.namespace.as_deref())
    }

    /// Structural key of the type exactly as written
    pub fn key(&self) -> TypeKey {
        TypeKey(self.to_string())
    }

    /// Structural key with unqualified names pinned to `namespace`
    ///
    /// Two fields written as `Common?` in namespace `a` and `a.Common?`
    /// anywhere produce the same key.
    pub fn key_in(&self, namespace: &[String]) -> TypeKey {
        TypeKey(self.qualified_in(namespace).to_string())
    }

    /// Copy of this type with every named type explicitly qualified
    pub fn qualified_in(&self, namespace: &[String]) -> FieldType {
        let kind = match &self.kind {
            TypeKind::Primitive { primitive } => TypeKind::Primitive {
                primitive: *primitive,
            },
            TypeKind::Named { name } => TypeKind::Named {
                name: TypeName::new(
                    Some(name.effective_namespace(namespace).to_vec()),
                    name.name.clone(),
                ),
            },
            TypeKind::Array { element, length } => TypeKind::Array {
                element: Box::new(element.qualified_in(namespace)),
                length: *length,
            },
        };
        FieldType {
            nullable: self.nullable,
            kind,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive { primitive } => write!(f, "{}", primitive)?,
            TypeKind::Named { name } => write!(f, "{}", name)?,
            TypeKind::Array {
                element,
                length: Some(length),
            } => write!(f, "[{}:{}]", element, length)?,
            TypeKind::Array { element, .. } => write!(f, "[{}]", element)?,
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

// =============================================================================
// Type Key
// =============================================================================

/// Structural identity of a field type
///
/// Derived only from namespace, base name, array nesting and nullability;
/// the declaring field's name never takes part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeKey(String);

impl TypeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Decomposition
// =============================================================================

/// Decompose a raw type expression into a [`FieldType`]
pub fn decompose(expr: &str) -> Result<FieldType> {
    let text = expr.trim();
    if text.is_empty() {
        return Err(SchemaError::malformed(expr, "empty type expression"));
    }

    let (body, nullable) = match text.strip_suffix('?') {
        Some(rest) => (rest.trim_end(), true),
        None => (text, false),
    };

    if let Some(open) = body.strip_prefix('[') {
        let inner = open
            .strip_suffix(']')
            .ok_or_else(|| SchemaError::malformed(expr, "unterminated `[`"))?;
        if nullable {
            return Err(SchemaError::invalid(expr, "array types cannot be nullable"));
        }
        let (inner, length) = split_array_length(inner);
        let element = decompose(inner)?;
        if element.nullable {
            return Err(SchemaError::invalid(expr, "array elements cannot be nullable"));
        }
        return match length {
            Some(0) => Err(SchemaError::malformed(expr, "fixed array length must be positive")),
            Some(length) => Ok(FieldType::fixed_array(element, length)),
            None => Ok(FieldType::array(element)),
        };
    }

    if body.contains(|c| c == '[' || c == ']') {
        return Err(SchemaError::malformed(expr, "mismatched brackets"));
    }

    let (namespace, name) = match body.rsplit_once('.') {
        Some((namespace, name)) => {
            let parts: Vec<String> = namespace.split('.').map(|p| p.trim().to_string()).collect();
            (Some(parts), name.trim())
        }
        None => (None, body),
    };

    for part in namespace.iter().flatten().map(String::as_str).chain(std::iter::once(name)) {
        if !is_identifier(part) {
            return Err(SchemaError::malformed(
                expr,
                format!("`{}` is not a valid identifier", part),
            ));
        }
    }

    let ty = match Primitive::from_name(name) {
        Some(primitive) => FieldType::primitive(primitive),
        None => FieldType::named(TypeName::new(namespace, name)),
    };

    Ok(if nullable { ty.into_nullable() } else { ty })
}

/// `int:3` → (`int`, Some(3)); anything without a numeric suffix is untouched
fn split_array_length(inner: &str) -> (&str, Option<usize>) {
    match inner.rsplit_once(':') {
        Some((element, length)) => match length.trim().parse::<usize>() {
            Ok(length) => (element.trim_end(), Some(length)),
            Err(_) => (inner, None),
        },
        None => (inner, None),
    }
}

/// `[_a-zA-Z][_a-zA-Z0-9]*`
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_named_type() {
        let ty = decompose("Monster").unwrap();
        assert!(!ty.nullable);
        assert!(!ty.is_array());
        assert_eq!(ty.base_name(), Some("Monster"));
        assert_eq!(ty.namespace_qualifier(), None);
    }

    #[test]
    fn test_qualified_name_splits_on_last_dot() {
        let ty = decompose("fb.game.Monster").unwrap();
        assert_eq!(ty.base_name(), Some("Monster"));
        assert_eq!(ty.namespace_qualifier(), Some(&ns(&["fb", "game"])[..]));
    }

    #[test]
    fn test_primitives_and_aliases() {
        assert_eq!(decompose("int").unwrap().primitive_kind(), Some(Primitive::Int));
        assert_eq!(decompose("int32").unwrap().primitive_kind(), Some(Primitive::Int));
        assert_eq!(decompose("float64").unwrap().primitive_kind(), Some(Primitive::Double));
        assert_eq!(decompose("string").unwrap().primitive_kind(), Some(Primitive::String));
        assert_eq!(decompose("uint8").unwrap().key(), decompose("ubyte").unwrap().key());
    }

    #[test]
    fn test_qualified_primitive_is_still_primitive() {
        let ty = decompose("demo.int").unwrap();
        assert_eq!(ty.primitive_kind(), Some(Primitive::Int));
    }

    #[test]
    fn test_nullable_scalar() {
        let ty = decompose("Color?").unwrap();
        assert!(ty.nullable);
        assert_eq!(ty.base_name(), Some("Color"));
        assert!(decompose("int?").unwrap().nullable);
    }

    #[test]
    fn test_arrays_and_nesting() {
        let ty = decompose("[int]").unwrap();
        assert!(ty.is_array());
        assert_eq!(ty.base_name(), None);
        assert_eq!(ty.element().unwrap().primitive_kind(), Some(Primitive::Int));

        let nested = decompose("[[foo.Bar]]").unwrap();
        assert_eq!(nested.array_depth(), 2);
        assert_eq!(nested.innermost().base_name(), Some("Bar"));
    }

    #[test]
    fn test_nullable_array_rejected() {
        for expr in ["[int]?", "[foo.Bar]?"] {
            let err = decompose(expr).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidSchema { .. }), "{}: {:?}", expr, err);
        }
    }

    #[test]
    fn test_array_of_nullable_rejected() {
        let err = decompose("[Color?]").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_fixed_length_arrays() {
        let ints = decompose("[int:3]").unwrap();
        assert_eq!(ints.fixed_length(), Some(3));
        assert_eq!(ints.element().unwrap().primitive_kind(), Some(Primitive::Int));
        assert_eq!(ints.to_string(), "[int:3]");

        let points = decompose("[Vec3 : 2]").unwrap();
        assert_eq!(points.fixed_length(), Some(2));
        assert_eq!(points.element().unwrap().base_name(), Some("Vec3"));
        assert_ne!(points.key(), decompose("[Vec3]").unwrap().key());

        assert_eq!(decompose("[Vec3]").unwrap().fixed_length(), None);
        for expr in ["[int:0]", "[int:]", "[int:x]", "[int:3]?"] {
            assert!(decompose(expr).is_err(), "{:?} should fail", expr);
        }
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in ["", "  ", "?", "[int", "int]", "[]", "foo..Bar", ".Bar", "foo.", "1abc", "a-b", "int??"] {
            let err = decompose(expr).unwrap_err();
            assert!(
                matches!(err, SchemaError::MalformedFieldType { .. }),
                "{:?} should be malformed, got {:?}",
                expr,
                err
            );
        }
    }

    #[test]
    fn test_canonical_round_trip_keeps_key() {
        for expr in ["int", "int32?", "Color?", "[string]", "[[demo.Item]]", "a.b.C?", " [ubyte] ", "[float:4]"] {
            let first = decompose(expr).unwrap();
            let again = decompose(&first.to_string()).unwrap();
            assert_eq!(first.key(), again.key(), "round trip of {:?}", expr);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_key_pins_unqualified_names() {
        let here = ns(&["demo"]);
        let local = decompose("Common?").unwrap();
        let qualified = decompose("demo.Common?").unwrap();
        assert_ne!(local.key(), qualified.key());
        assert_eq!(local.key_in(&here), qualified.key_in(&ns(&["other"])));
        assert_eq!(local.key_in(&here).as_str(), "demo.Common?");
    }

    #[test]
    fn test_key_distinguishes_shape() {
        let here = ns(&["demo"]);
        let keys: Vec<TypeKey> = ["Item", "Item?", "[Item]", "[[Item]]", "other.Item"]
            .iter()
            .map(|e| decompose(e).unwrap().key_in(&here))
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
