//! The contract handed to the code emitter.
//!
//! The emitter renders target-language sources from the compiled schema, the
//! route schema and the manifest. It never re-derives type widths,
//! relationships or permission segregation; everything it needs is here.

use crate::error::{Result, SheetGenError};
use crate::persist::{read_document, MANIFEST_DOCUMENT, ROUTES_DOCUMENT, SCHEMA_DOCUMENT};
use crate::schema::{qualified_name, CompiledModel, CompiledSchema, ImportTable, ModelRoutes, RouteSchema};
use heck::ToSnakeCase;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-model emission facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub package: String,
    pub model: String,
    /// Source file stem for the model, e.g. `user_profile` for `UserProfile`.
    pub file_stem: String,
    /// Deduplicated imports the model's source needs.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Fields flagged `Primary`, in declaration order.
    #[serde(default)]
    pub primary_key: Vec<String>,
}

/// Third output document: module path, emission order and per-model facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitManifest {
    pub module_path: String,
    /// Qualified model names, parents before children.
    pub order: Vec<String>,
    pub models: IndexMap<String, ModelManifest>,
}

impl EmitManifest {
    pub fn build(
        module_path: &str,
        schema: &CompiledSchema,
        imports: &ImportTable,
        order: Vec<String>,
    ) -> Self {
        let models = schema
            .models()
            .map(|(package, model, fields)| {
                let qualified = qualified_name(package, model);
                let primary_key = fields
                    .iter()
                    .filter(|(_, field)| field.primary_key)
                    .map(|(name, _)| name.clone())
                    .collect::<Vec<_>>();
                if primary_key.is_empty() {
                    log::debug!("{qualified} declares no primary key");
                }
                let manifest = ModelManifest {
                    package: package.to_string(),
                    model: model.to_string(),
                    file_stem: model.to_snake_case(),
                    imports: imports.for_model(&qualified),
                    primary_key,
                };
                (qualified, manifest)
            })
            .collect();

        EmitManifest {
            module_path: module_path.to_string(),
            order,
            models,
        }
    }
}

/// Everything one emitter run consumes, loaded from the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitContext {
    pub schema: CompiledSchema,
    pub routes: RouteSchema,
    pub manifest: EmitManifest,
}

/// One model as seen by the emitter, in emission order.
#[derive(Debug, Clone, Copy)]
pub struct EmitModel<'a> {
    pub manifest: &'a ModelManifest,
    pub fields: &'a CompiledModel,
    pub routes: &'a ModelRoutes,
}

impl EmitContext {
    /// Load the three documents, failing fast if any is missing or does not
    /// line up with the others.
    pub fn load(dir: &Path) -> Result<Self> {
        let schema: CompiledSchema = serde_json::from_str(&read_document(dir, SCHEMA_DOCUMENT)?)?;
        let routes: RouteSchema = serde_json::from_str(&read_document(dir, ROUTES_DOCUMENT)?)?;
        let manifest: EmitManifest = serde_json::from_str(&read_document(dir, MANIFEST_DOCUMENT)?)?;
        let context = EmitContext {
            schema,
            routes,
            manifest,
        };
        context.check()?;
        Ok(context)
    }

    /// Every model is ordered exactly once and has fields, routes and a
    /// manifest entry.
    pub fn check(&self) -> Result<()> {
        let mut ordered = IndexSet::with_capacity(self.manifest.order.len());
        for qualified in &self.manifest.order {
            if !ordered.insert(qualified.as_str()) {
                return Err(SheetGenError::Schema(format!(
                    "{MANIFEST_DOCUMENT} orders {qualified} more than once"
                )));
            }
            let manifest = self.manifest.models.get(qualified).ok_or_else(|| {
                SheetGenError::Schema(format!("{MANIFEST_DOCUMENT} orders unknown model {qualified}"))
            })?;
            if self.schema.model(&manifest.package, &manifest.model).is_none() {
                return Err(SheetGenError::Schema(format!(
                    "{SCHEMA_DOCUMENT} has no entry for {qualified}"
                )));
            }
            if self.routes.model(&manifest.package, &manifest.model).is_none() {
                return Err(SheetGenError::Schema(format!(
                    "{ROUTES_DOCUMENT} has no entry for {qualified}"
                )));
            }
        }
        if let Some(missing) = self
            .manifest
            .models
            .keys()
            .find(|qualified| !ordered.contains(qualified.as_str()))
        {
            return Err(SheetGenError::Schema(format!(
                "{MANIFEST_DOCUMENT} describes {missing} but never orders it"
            )));
        }
        Ok(())
    }

    /// Models in emission order.
    pub fn models(&self) -> impl Iterator<Item = EmitModel<'_>> {
        self.manifest.order.iter().filter_map(move |qualified| {
            let manifest = self.manifest.models.get(qualified)?;
            let fields = self.schema.model(&manifest.package, &manifest.model)?;
            let routes = self.routes.model(&manifest.package, &manifest.model)?;
            Some(EmitModel {
                manifest,
                fields,
                routes,
            })
        })
    }
}

/// Seam for the template renderer that turns the context into source files.
pub trait CodeEmitter {
    fn emit(&mut self, context: &EmitContext) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{to_document, write_documents};
    use crate::schema::FieldSpec;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> (CompiledSchema, RouteSchema, EmitManifest) {
        let mut schema = CompiledSchema::default();
        let id = FieldSpec {
            resolved_type: Some("uuid.UUID".to_string()),
            primary_key: true,
            ..Default::default()
        };
        schema
            .packages
            .entry("users".to_string())
            .or_default()
            .insert("UserProfile".to_string(), CompiledModel::from([("id".to_string(), id)]));

        let routes = crate::routes::project_routes(&schema);
        let mut imports = ImportTable::default();
        imports.add("users.UserProfile", "github.com/google/uuid");
        let manifest = EmitManifest::build(
            "github.com/acme/app",
            &schema,
            &imports,
            vec!["users.UserProfile".to_string()],
        );
        (schema, routes, manifest)
    }

    fn write(dir: &Path, schema: &CompiledSchema, routes: &RouteSchema, manifest: &EmitManifest) {
        write_documents(
            dir,
            &[
                (SCHEMA_DOCUMENT, to_document(schema).unwrap()),
                (ROUTES_DOCUMENT, to_document(routes).unwrap()),
                (MANIFEST_DOCUMENT, to_document(manifest).unwrap()),
            ],
        )
        .unwrap();
    }

    struct Recorder {
        seen: Vec<String>,
    }

    impl CodeEmitter for Recorder {
        fn emit(&mut self, context: &EmitContext) -> Result<()> {
            for model in context.models() {
                self.seen.push(format!(
                    "{}/{} {:?}",
                    model.manifest.package, model.manifest.file_stem, model.manifest.imports
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_manifest_build() {
        let (_, _, manifest) = sample();
        let model = &manifest.models["users.UserProfile"];
        assert_eq!(model.file_stem, "user_profile");
        assert_eq!(model.primary_key, vec!["id"]);
        assert_eq!(model.imports, vec!["github.com/google/uuid"]);
    }

    #[test]
    fn test_load_and_emit() {
        let tmp = TempDir::new().unwrap();
        let (schema, routes, manifest) = sample();
        write(tmp.path(), &schema, &routes, &manifest);

        let context = EmitContext::load(tmp.path()).unwrap();
        assert_eq!(context.schema, schema);

        let mut recorder = Recorder { seen: Vec::new() };
        recorder.emit(&context).unwrap();
        assert_eq!(
            recorder.seen,
            vec!["users/user_profile [\"github.com/google/uuid\"]"]
        );
    }

    #[test]
    fn test_load_fails_fast_on_missing_document() {
        let tmp = TempDir::new().unwrap();
        let (schema, routes, _) = sample();
        write_documents(
            tmp.path(),
            &[
                (SCHEMA_DOCUMENT, to_document(&schema).unwrap()),
                (ROUTES_DOCUMENT, to_document(&routes).unwrap()),
            ],
        )
        .unwrap();

        let err = EmitContext::load(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(MANIFEST_DOCUMENT), "{err}");
    }

    #[test]
    fn test_load_fails_on_mismatched_documents() {
        let tmp = TempDir::new().unwrap();
        let (schema, _, manifest) = sample();
        write(tmp.path(), &schema, &RouteSchema::default(), &manifest);

        let err = EmitContext::load(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(ROUTES_DOCUMENT), "{err}");
    }

    #[test]
    fn test_check_rejects_duplicate_order() {
        let (mut schema, _, mut manifest) = sample();
        let second = schema.packages["users"]["UserProfile"].clone();
        schema.packages["users"].insert("Account".to_string(), second);
        let routes = crate::routes::project_routes(&schema);
        let mut account = manifest.models["users.UserProfile"].clone();
        account.model = "Account".to_string();
        account.file_stem = "account".to_string();
        manifest.models.insert("users.Account".to_string(), account);
        manifest.order = vec!["users.UserProfile".to_string(), "users.UserProfile".to_string()];

        let context = EmitContext {
            schema: schema.clone(),
            routes: routes.clone(),
            manifest: manifest.clone(),
        };
        let err = context.check().unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");

        manifest.order = vec!["users.UserProfile".to_string()];
        let context = EmitContext {
            schema,
            routes,
            manifest,
        };
        let err = context.check().unwrap_err();
        assert!(err.to_string().contains("users.Account"), "{err}");
    }

    #[test]
    fn test_load_fails_on_malformed_document() {
        let tmp = TempDir::new().unwrap();
        let (schema, routes, manifest) = sample();
        write(tmp.path(), &schema, &routes, &manifest);
        std::fs::write(tmp.path().join(ROUTES_DOCUMENT), "[]").unwrap();

        assert!(matches!(
            EmitContext::load(tmp.path()),
            Err(SheetGenError::Json(_))
        ));
    }
}
