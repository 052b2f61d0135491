//! sheetgen - compiles spreadsheet-authored schemas into the documents a code
//! emitter renders backend sources from.
//!
//! The pipeline runs once per invocation, strictly in order:
//! [`extract`] turns a [`Workbook`] into a raw schema and partial bundle, and
//! [`Compiler::compile`] resolves partials, types and relationships, segregates
//! CRUD permissions, projects routes and orders models for emission.

pub mod api;
pub mod compiler;
pub mod config;
pub mod emit;
pub mod error;
pub mod extract;
pub mod hierarchy;
pub mod partials;
pub mod persist;
pub mod relations;
pub mod routes;
pub mod schema;
pub mod types;
pub mod workbook;

pub use compiler::{extract_to, Compilation, Compiler};
pub use config::{CompilerConfig, ProjectConfig, SortStrategy};
pub use emit::{CodeEmitter, EmitContext, EmitManifest};
pub use error::{Result, SheetGenError};
pub use extract::extract;
pub use schema::{CompiledSchema, Extraction, RouteSchema};
pub use types::TypeRegistry;
pub use workbook::Workbook;
