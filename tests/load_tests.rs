//! Directory Loading Tests
//!
//! Exercises file selection and the fatal error paths of a directory load
//! against throwaway schema trees.

use std::fs;
use std::path::Path;

use fbs_graph::{Context, LoadConfig, SchemaError};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, text) in files {
        write(dir.path(), relative, text);
    }
    dir
}

fn stems(ctx: &Context) -> Vec<&str> {
    ctx.scopes().iter().map(|s| s.file_stem.as_str()).collect()
}

#[test]
fn test_flat_load_ignores_subdirectories_and_other_files() {
    let dir = tree(&[
        ("b.fbs", "table B { x:int; }"),
        ("a.fbs", "table A { x:int; }"),
        ("notes.txt", "table Ghost { x:int; }"),
        ("nested/c.fbs", "table C { x:int; }"),
    ]);

    let ctx = Context::from_directory(dir.path()).unwrap();
    assert_eq!(stems(&ctx), vec!["a", "b"]);
}

#[test]
fn test_recursive_load_with_skip_prefixes() {
    let dir = tree(&[
        ("a.fbs", "table A { x:int; }"),
        ("nested/c.fbs", "table C { x:int; }"),
        ("vendor/v.fbs", "table V { x:int; }"),
    ]);

    let config = LoadConfig {
        recursive: true,
        skip_prefixes: vec!["vendor".to_string()],
        ..LoadConfig::default()
    };
    let ctx = Context::load(dir.path(), &config).unwrap();
    assert_eq!(stems(&ctx), vec!["a", "c"]);
}

#[test]
fn test_custom_pattern() {
    let dir = tree(&[
        ("a.fbs", "table A { x:int; }"),
        ("b.schema", "table B { x:int; }"),
    ]);

    let config = LoadConfig {
        pattern: "*.schema".to_string(),
        ..LoadConfig::default()
    };
    let ctx = Context::load(dir.path(), &config).unwrap();
    assert_eq!(stems(&ctx), vec!["b"]);
}

#[cfg(unix)]
#[test]
fn test_symlinked_schema_files_are_loaded() {
    let shared = tree(&[("color.fbs", "namespace demo;\nenum Color : int { Red }")]);
    let dir = tree(&[("item.fbs", "include \"color.fbs\";\nnamespace demo;\ntable Item { c:Color; }")]);
    std::os::unix::fs::symlink(shared.path().join("color.fbs"), dir.path().join("color.fbs")).unwrap();

    let ctx = Context::from_directory(dir.path()).unwrap();
    assert_eq!(stems(&ctx), vec!["color", "item"]);
    let item = ctx.find_record("demo.Item").unwrap();
    assert!(ctx.is_enum(&item.fields[0]));
}

#[test]
fn test_empty_directory_gives_empty_context() {
    let dir = tree(&[]);
    let ctx = Context::from_directory(dir.path()).unwrap();
    assert!(ctx.scopes().is_empty());
    assert_eq!(ctx.stats().records, 0);
}

#[test]
fn test_unresolved_include_fails_whole_load() {
    let dir = tree(&[
        ("good.fbs", "namespace n;\ntable Good { x:int; }"),
        ("weapon.fbs", "namespace n;\ntable Weapon { x:int; }"),
        ("user.fbs", "include \"wepon.fbs\";\nnamespace n;\ntable User { w:Weapon; }"),
    ]);

    let err = Context::from_directory(dir.path()).unwrap_err();
    match &err {
        SchemaError::UnresolvedInclude { scope, include, suggestion } => {
            assert_eq!(scope, "user");
            assert_eq!(include, "wepon");
            assert_eq!(suggestion.as_deref(), Some("weapon"));
        }
        other => panic!("expected UnresolvedInclude, got {:?}", other),
    }
    assert!(err.to_string().contains("did you mean `weapon`?"));
}

#[test]
fn test_duplicate_stems_in_recursive_load() {
    let dir = tree(&[
        ("a.fbs", "table A { x:int; }"),
        ("more/a.fbs", "table B { x:int; }"),
    ]);

    let config = LoadConfig {
        recursive: true,
        ..LoadConfig::default()
    };
    let err = Context::load(dir.path(), &config).unwrap_err();
    match err {
        SchemaError::DuplicateScope { stem, first, second } => {
            assert_eq!(stem, "a");
            assert_ne!(first, second);
        }
        other => panic!("expected DuplicateScope, got {:?}", other),
    }
}

#[test]
fn test_bad_field_type_names_file() {
    let dir = tree(&[
        ("fine.fbs", "table Fine { x:int; }"),
        ("broken.fbs", "table Broken { xs:[int]?; }"),
    ]);

    let err = Context::from_directory(dir.path()).unwrap_err();
    assert!(err.file().unwrap().ends_with("broken.fbs"));
    assert!(matches!(err.root(), SchemaError::InvalidSchema { .. }));
}

#[test]
fn test_missing_directory_is_an_error() {
    let dir = tree(&[]);
    let missing = dir.path().join("absent");
    let err = Context::from_directory(&missing).unwrap_err();
    assert!(matches!(err, SchemaError::Walk(_)));
}

#[test]
fn test_bad_pattern_is_an_error() {
    let dir = tree(&[("a.fbs", "table A { x:int; }")]);
    let config = LoadConfig {
        pattern: "[".to_string(),
        ..LoadConfig::default()
    };
    let err = Context::load(dir.path(), &config).unwrap_err();
    assert!(matches!(err, SchemaError::Glob(_)));
}
