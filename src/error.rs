//! Error types for schema extraction and resolution

use std::path::PathBuf;

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema extraction and resolution errors
///
/// Every variant is fatal to a run: a half-resolved graph is never returned.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Malformed field type `{expr}`: {reason}")]
    MalformedFieldType { expr: String, reason: String },

    #[error("Invalid schema construct `{fragment}`: {reason}")]
    InvalidSchema { fragment: String, reason: String },

    #[error("Scope `{scope}` includes `{include}`, which is not among the parsed files{}",
        .suggestion.as_ref().map(|s| format!(" (did you mean `{}`?)", s)).unwrap_or_default())]
    UnresolvedInclude {
        scope: String,
        include: String,
        suggestion: Option<String>,
    },

    #[error("Type `{type_name}` referenced from scope `{scope}` is ambiguous: declared in {}", .candidates.join(", "))]
    AmbiguousType {
        scope: String,
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("Type `{type_name}` referenced from scope `{scope}` does not resolve to any record or enum")]
    UnresolvedType { scope: String, type_name: String },

    #[error("Duplicate schema file stem `{stem}`: {first:?} and {second:?}")]
    DuplicateScope {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{file}: {source}")]
    InFile {
        file: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid file pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Attach the offending file to an error
    pub fn in_file(self, file: impl Into<String>) -> Self {
        SchemaError::InFile {
            file: file.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error with any file context peeled off
    pub fn root(&self) -> &SchemaError {
        match self {
            SchemaError::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    /// File the error was raised in, if known
    pub fn file(&self) -> Option<&str> {
        match self {
            SchemaError::InFile { file, .. } => Some(file),
            _ => None,
        }
    }

    pub(crate) fn malformed(expr: &str, reason: impl Into<String>) -> Self {
        SchemaError::MalformedFieldType {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(fragment: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidSchema {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_peels_file_context() {
        let err = SchemaError::invalid("[int]?", "nullable array").in_file("item.fbs");
        assert_eq!(err.file(), Some("item.fbs"));
        assert!(matches!(err.root(), SchemaError::InvalidSchema { .. }));
        assert!(err.to_string().starts_with("item.fbs: Invalid schema construct `[int]?`"));
    }

    #[test]
    fn test_unresolved_include_suggestion_in_message() {
        let err = SchemaError::UnresolvedInclude {
            scope: "item".to_string(),
            include: "colr".to_string(),
            suggestion: Some("color".to_string()),
        };
        assert!(err.to_string().contains("did you mean `color`?"));

        let err = SchemaError::UnresolvedInclude {
            scope: "item".to_string(),
            include: "zzz".to_string(),
            suggestion: None,
        };
        assert!(!err.to_string().contains("did you mean"));
    }
}
