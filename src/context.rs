//! Schema Context
//!
//! Loads every schema file of a directory into [`Scope`]s, links include
//! statements to the scopes they name, and answers cross-scope questions
//! such as "is this field's type a record or an enum?".
//!
//! Loading is one pass then link: every file is extracted first, and
//! resolution starts only once every scope exists. Any failure aborts the
//! whole load.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::extract::SchemaExtractor;
use crate::scope::{EnumId, Enumeration, Field, Record, RecordId, Scope, ScopeId};
use crate::types::{FieldType, Primitive, TypeKind, TypeName};

// =============================================================================
// Load Configuration
// =============================================================================

/// How same-named types and unknown names are treated during linking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// First match in parse order wins; collisions and unknown names are logged
    #[default]
    FirstMatch,
    /// Collisions fail with `AmbiguousType`, unknown names with `UnresolvedType`
    Strict,
}

/// Configuration for directory loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Glob matched against paths relative to the schema directory
    pub pattern: String,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Skip files whose relative path starts with one of these
    pub skip_prefixes: Vec<String>,
    pub policy: ResolvePolicy,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            pattern: "*.fbs".to_string(),
            recursive: false,
            skip_prefixes: Vec::new(),
            policy: ResolvePolicy::FirstMatch,
        }
    }
}

/// Raw text of one schema file
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub stem: String,
    pub path: Option<PathBuf>,
    pub text: String,
}

impl SchemaSource {
    pub fn new(stem: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            path: None,
            text: text.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SchemaError::from(e).in_file(path.display().to_string()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            stem,
            path: Some(path.to_path_buf()),
            text,
        })
    }

    fn display_name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("{}.fbs", self.stem),
        }
    }
}

// =============================================================================
// Type Classification
// =============================================================================

/// A record or enum somewhere in the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Record(RecordId),
    Enum(EnumId),
}

impl TypeRef {
    pub fn scope(&self) -> ScopeId {
        match self {
            TypeRef::Record(id) => id.scope,
            TypeRef::Enum(id) => id.scope,
        }
    }
}

/// What a field's declared type turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    Primitive(Primitive),
    Enum(EnumId),
    Record(RecordId),
    /// Array wrapper; classify the element type instead
    Array,
    /// Named type that resolves nowhere
    Unknown,
}

impl TypeClass {
    pub fn type_ref(&self) -> Option<TypeRef> {
        match self {
            TypeClass::Record(id) => Some(TypeRef::Record(*id)),
            TypeClass::Enum(id) => Some(TypeRef::Enum(*id)),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, TypeClass::Record(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, TypeClass::Enum(_))
    }
}

impl From<TypeRef> for TypeClass {
    fn from(type_ref: TypeRef) -> Self {
        match type_ref {
            TypeRef::Record(id) => TypeClass::Record(id),
            TypeRef::Enum(id) => TypeClass::Enum(id),
        }
    }
}

/// Size of a resolved context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub scopes: usize,
    pub records: usize,
    pub enums: usize,
    pub fields: usize,
}

// =============================================================================
// Context
// =============================================================================

/// The resolved schema graph of one input directory
///
/// Owns every scope; handles held by records and fields index into it.
/// Immutable once built.
#[derive(Debug)]
pub struct Context {
    scopes: Vec<Scope>,
    by_stem: HashMap<String, ScopeId>,
    policy: ResolvePolicy,
    bundle_hash: Checksum,
}

impl Context {
    /// Load `*.fbs` files from a directory with default settings
    pub fn from_directory(dir: &Path) -> Result<Self> {
        Self::load(dir, &LoadConfig::default())
    }

    /// Load matching files from a directory
    pub fn load(dir: &Path, config: &LoadConfig) -> Result<Self> {
        let sources = collect_sources(dir, config)?;
        info!(dir = %dir.display(), files = sources.len(), "loading schema directory");
        Self::from_sources(sources, config.policy)
    }

    /// Build from in-memory sources; parse order is iteration order
    pub fn from_sources(
        sources: impl IntoIterator<Item = SchemaSource>,
        policy: ResolvePolicy,
    ) -> Result<Self> {
        let sources: Vec<SchemaSource> = sources.into_iter().collect();
        let extractor = SchemaExtractor::new();

        let mut scopes: Vec<Scope> = Vec::with_capacity(sources.len());
        let mut by_stem: HashMap<String, ScopeId> = HashMap::with_capacity(sources.len());

        for source in &sources {
            if let Some(&existing) = by_stem.get(&source.stem) {
                let first: &Scope = &scopes[existing.index()];
                return Err(SchemaError::DuplicateScope {
                    stem: source.stem.clone(),
                    first: first.path.clone().unwrap_or_else(|| PathBuf::from(&first.file_stem)),
                    second: source.path.clone().unwrap_or_else(|| PathBuf::from(&source.stem)),
                });
            }

            let fragments = extractor
                .extract(&source.text)
                .map_err(|e| e.in_file(source.display_name()))?;
            debug!(
                file = %source.display_name(),
                records = fragments.records.len(),
                enums = fragments.enums.len(),
                "extracted schema file"
            );

            let id = ScopeId(scopes.len());
            let mut scope = Scope::build(id, source.stem.clone(), fragments);
            if let Some(path) = &source.path {
                scope = scope.with_path(path.clone());
            }
            by_stem.insert(source.stem.clone(), id);
            scopes.push(scope);
        }

        let bundle_hash = Checksum::of_texts(sources.iter().map(|s| s.text.as_str()));
        let mut context = Self {
            scopes,
            by_stem,
            policy,
            bundle_hash,
        };
        context.link_includes()?;
        context.check_types()?;

        let stats = context.stats();
        info!(
            scopes = stats.scopes,
            records = stats.records,
            enums = stats.enums,
            bundle = %context.bundle_hash.short(),
            "resolved schema context"
        );
        Ok(context)
    }

    fn link_includes(&mut self) -> Result<()> {
        let mut resolved = Vec::with_capacity(self.scopes.len());
        for scope in &self.scopes {
            let mut included = Vec::with_capacity(scope.include_stems.len());
            for stem in &scope.include_stems {
                let Some(&target) = self.by_stem.get(stem) else {
                    return Err(SchemaError::UnresolvedInclude {
                        scope: scope.file_stem.clone(),
                        include: stem.clone(),
                        suggestion: self.suggest_stem(stem),
                    });
                };
                debug!(scope = %scope.file_stem, include = %stem, "linked include");
                included.push(target);
            }
            resolved.push(included);
        }

        for (scope, included) in self.scopes.iter_mut().zip(resolved) {
            scope.included = included;
        }
        Ok(())
    }

    fn suggest_stem(&self, stem: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.scopes
            .iter()
            .filter_map(|s| matcher.fuzzy_match(&s.file_stem, stem).map(|score| (score, &s.file_stem)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, name)| name.clone())
    }

    /// Report collisions and unknown names per the resolve policy
    fn check_types(&self) -> Result<()> {
        for (scope, _, field) in self.fields() {
            let Some(name) = field.ty.innermost().type_name() else {
                continue;
            };
            let matches = self.matches(name, scope.id);

            match matches.len() {
                0 => {
                    if self.policy == ResolvePolicy::Strict {
                        return Err(SchemaError::UnresolvedType {
                            scope: scope.file_stem.clone(),
                            type_name: name.to_string(),
                        });
                    }
                    warn!(scope = %scope.file_stem, field = %field.name, type_name = %name, "type does not resolve");
                }
                1 => {}
                _ => {
                    let candidates: Vec<String> = matches.iter().map(|t| self.describe(*t)).collect();
                    if self.policy == ResolvePolicy::Strict {
                        return Err(SchemaError::AmbiguousType {
                            scope: scope.file_stem.clone(),
                            type_name: name.to_string(),
                            candidates,
                        });
                    }
                    warn!(
                        scope = %scope.file_stem,
                        field = %field.name,
                        type_name = %name,
                        chosen = %candidates[0],
                        "ambiguous type, first match wins"
                    );
                }
            }
        }
        Ok(())
    }

    // ========== Lookup ==========

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Scope by handle; handles come from this context
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_by_stem(&self, stem: &str) -> Option<&Scope> {
        self.by_stem.get(stem).map(|id| self.scope(*id))
    }

    pub fn record(&self, id: RecordId) -> &Record {
        &self.scope(id.scope).records[id.index]
    }

    pub fn enumeration(&self, id: EnumId) -> &Enumeration {
        &self.scope(id.scope).enums[id.index]
    }

    /// Scopes linked from `id`'s include statements
    pub fn included_scopes(&self, id: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        self.scope(id).included().iter().map(move |i| self.scope(*i))
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.scopes.iter().flat_map(|s| s.records.iter())
    }

    pub fn enums(&self) -> impl Iterator<Item = &Enumeration> + '_ {
        self.scopes.iter().flat_map(|s| s.enums.iter())
    }

    /// Every field with its scope and record, in parse and declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&Scope, &Record, &Field)> + '_ {
        self.scopes.iter().flat_map(|scope| {
            scope
                .records
                .iter()
                .flat_map(move |record| record.fields.iter().map(move |field| (scope, record, field)))
        })
    }

    /// Find a record by `Name` (first in parse order) or `ns.Name`
    pub fn find_record(&self, query: &str) -> Option<&Record> {
        match query.rsplit_once('.') {
            Some((namespace, name)) => self
                .scopes
                .iter()
                .filter(|s| s.namespace_path() == namespace)
                .find_map(|s| s.record(name)),
            None => self.scopes.iter().find_map(|s| s.record(query)),
        }
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// SHA256 over every source text in parse order
    pub fn bundle_hash(&self) -> &Checksum {
        &self.bundle_hash
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            scopes: self.scopes.len(),
            records: self.scopes.iter().map(|s| s.records.len()).sum(),
            enums: self.scopes.iter().map(|s| s.enums.len()).sum(),
            fields: self.scopes.iter().map(|s| s.field_count()).sum(),
        }
    }

    // ========== Resolution ==========

    /// Every record then every enum named `name` in the namespace it is
    /// looked up in, each group in parse order
    fn matches(&self, name: &TypeName, from: ScopeId) -> Vec<TypeRef> {
        let namespace = name.effective_namespace(&self.scope(from).namespace);
        let candidates: Vec<&Scope> = self
            .scopes
            .iter()
            .filter(|s| s.namespace.as_slice() == namespace)
            .collect();

        let records = candidates
            .iter()
            .filter_map(|s| s.record(&name.name))
            .map(|r| TypeRef::Record(r.id));
        let enums = candidates
            .iter()
            .filter_map(|s| s.enumeration(&name.name))
            .map(|e| TypeRef::Enum(e.id));
        records.chain(enums).collect()
    }

    /// Resolve a type name as seen from scope `from`
    pub fn resolve(&self, name: &TypeName, from: ScopeId) -> Option<TypeRef> {
        self.matches(name, from).into_iter().next()
    }

    /// Classify a type expression declared in scope `from`
    pub fn classify_type(&self, ty: &FieldType, from: ScopeId) -> TypeClass {
        match &ty.kind {
            TypeKind::Primitive { primitive } => TypeClass::Primitive(*primitive),
            TypeKind::Array { .. } => TypeClass::Array,
            TypeKind::Named { name } => self
                .resolve(name, from)
                .map(TypeClass::from)
                .unwrap_or(TypeClass::Unknown),
        }
    }

    pub fn classify(&self, field: &Field) -> TypeClass {
        self.classify_type(&field.ty, field.scope())
    }

    /// Classification of the innermost element, or of the field itself
    pub fn classify_element(&self, field: &Field) -> TypeClass {
        self.classify_type(field.ty.innermost(), field.scope())
    }

    pub fn is_custom_record(&self, field: &Field) -> bool {
        self.classify(field).is_record()
    }

    pub fn is_enum(&self, field: &Field) -> bool {
        self.classify(field).is_enum()
    }

    /// Array whose innermost element is a record or enum
    pub fn is_custom_array(&self, field: &Field) -> bool {
        field.ty.is_array() && self.classify_element(field).type_ref().is_some()
    }

    // ========== Naming ==========

    pub fn type_name(&self, type_ref: TypeRef) -> &str {
        match type_ref {
            TypeRef::Record(id) => &self.record(id).name,
            TypeRef::Enum(id) => &self.enumeration(id).name,
        }
    }

    /// `demo.Color`
    pub fn qualified_name(&self, type_ref: TypeRef) -> String {
        self.scope(type_ref.scope()).qualified_name(self.type_name(type_ref))
    }

    /// `demo.color`; the stem of the type's raw schema file
    pub fn type_identifier(&self, type_ref: TypeRef) -> String {
        self.scope(type_ref.scope()).type_identifier(self.type_name(type_ref))
    }

    fn describe(&self, type_ref: TypeRef) -> String {
        let kind = match type_ref {
            TypeRef::Record(_) => "record",
            TypeRef::Enum(_) => "enum",
        };
        format!(
            "{} {} ({})",
            kind,
            self.qualified_name(type_ref),
            self.scope(type_ref.scope()).file_stem
        )
    }
}

/// Read every matching file under `dir`, sorted by file name
fn collect_sources(dir: &Path, config: &LoadConfig) -> Result<Vec<SchemaSource>> {
    let matcher = Glob::new(&config.pattern)?.compile_matcher();

    let mut walker = WalkDir::new(dir).follow_links(true).sort_by_file_name();
    if !config.recursive {
        walker = walker.max_depth(1);
    }

    let mut sources = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        let relative_str = relative.to_string_lossy();
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p.as_str())) {
            continue;
        }
        if !matcher.is_match(relative) {
            continue;
        }

        sources.push(SchemaSource::read(path)?);
    }
    Ok(sources)
}
