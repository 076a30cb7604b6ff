//! FlatBuffers Schema Graph
//!
//! Reads a directory of `.fbs` schema files and resolves them into one
//! immutable type graph that code generators can walk.
//!
//! ## Pipeline
//!
//! ```text
//! text ─▶ extract ─▶ fragments ─▶ Scope ─▶ Context (linked, resolved) ─▶ views
//!           │                                  │
//!           └─ decompose field types           └─ TypeGraph (order, cycles)
//! ```
//!
//! - **types**: field type expressions (`[ns.Bar]`, `Color?`) and structural keys
//! - **extract**: regex scan of namespace, includes, tables, structs and enums
//! - **scope**: per-file model with index handles back to owners
//! - **context**: include linking and record/enum classification
//! - **views**: nullable payloads, reference files and nullable wrappers
//! - **graph**: record/enum dependency graph
//!
//! ## Example
//!
//! ```no_run
//! use fbs_graph::{Context, views};
//! use std::path::Path;
//!
//! let ctx = Context::from_directory(Path::new("schemas"))?;
//! for wrapper in views::nullable_wrappers(&ctx) {
//!     println!("{} ({})", wrapper.file_name(), wrapper.checksum.short());
//! }
//! # Ok::<(), fbs_graph::SchemaError>(())
//! ```

pub mod checksum;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod graph;
pub mod scope;
pub mod types;
pub mod views;

pub use checksum::Checksum;
pub use config::GraphConfig;
pub use context::{Context, LoadConfig, ResolvePolicy, SchemaSource, TypeClass, TypeRef};
pub use error::{Result, SchemaError};
pub use graph::TypeGraph;
pub use scope::{Enumeration, Field, Record, RecordKind, Scope};
pub use types::{decompose, FieldType, Primitive, TypeKey};
pub use views::{nullable_fields, nullable_wrappers, reference_files, NullableField, NullableWrapper};
