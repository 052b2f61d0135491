use crate::api::segregate_schema;
use crate::config::CompilerConfig;
use crate::emit::EmitManifest;
use crate::error::Result;
use crate::extract::extract;
use crate::hierarchy::{discovery_order, sort_models};
use crate::partials::resolve_partials;
use crate::persist::{
    to_document, write_documents, MANIFEST_DOCUMENT, RAW_DOCUMENT, ROUTES_DOCUMENT,
    SCHEMA_DOCUMENT,
};
use crate::relations::expand_relationships;
use crate::routes::project_routes;
use crate::schema::{
    parse_extraction, CompiledSchema, Extraction, HierarchyGraph, ImportTable, RouteSchema,
};
use crate::types::{resolve_schema, Diagnostic, TypeRegistry};
use crate::workbook::Workbook;
use std::path::{Path, PathBuf};

/// Everything one compilation produced.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub schema: CompiledSchema,
    pub routes: RouteSchema,
    pub hierarchy: HierarchyGraph,
    pub imports: ImportTable,
    pub manifest: EmitManifest,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// Emission order, parents first.
    pub fn order(&self) -> &[String] {
        &self.manifest.order
    }

    /// Overwrite the compiled schema, route schema and manifest in `dir`.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let documents = [
            (SCHEMA_DOCUMENT, to_document(&self.schema)?),
            (ROUTES_DOCUMENT, to_document(&self.routes)?),
            (MANIFEST_DOCUMENT, to_document(&self.manifest)?),
        ];
        write_documents(dir, &documents)
    }
}

/// Runs the phases after extraction against an explicit `Extraction` value.
pub struct Compiler {
    registry: TypeRegistry,
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Result<Self> {
        Ok(Compiler {
            registry: TypeRegistry::standard()?,
            config,
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Partials, types, relationships, API segregation, routes, hierarchy.
    pub fn compile(&self, extraction: &Extraction) -> Result<Compilation> {
        let resolved = resolve_partials(&extraction.schema, &extraction.partials)?;
        log::debug!("Resolved partials for {} packages", resolved.packages.len());

        let mut imports = ImportTable::default();
        let mut diagnostics = Vec::new();
        let typed = resolve_schema(&self.registry, &resolved, &mut imports, &mut diagnostics)?;

        let expansion = expand_relationships(typed, &mut imports, &self.config)?;
        log::debug!(
            "Expanded relationships; {} parent models referenced",
            expansion.hierarchy.edges.len()
        );

        let schema = segregate_schema(expansion.schema);
        let routes = project_routes(&schema);

        let discovered = discovery_order(&schema);
        let order = sort_models(&discovered, &expansion.hierarchy, self.config.sort);
        let manifest = EmitManifest::build(&self.config.module_path, &schema, &imports, order);

        log::info!(
            "Compiled {} models ({} diagnostics)",
            manifest.models.len(),
            diagnostics.len()
        );

        Ok(Compilation {
            schema,
            routes,
            hierarchy: expansion.hierarchy,
            imports,
            manifest,
            diagnostics,
        })
    }

    /// Load a persisted raw-schema document and compile it.
    pub fn compile_file(&self, raw_path: &Path) -> Result<Compilation> {
        let extraction = parse_extraction(raw_path)?;
        self.compile(&extraction)
    }
}

/// Extract a workbook file and persist the raw-schema document into `dir`.
/// Nothing is written if extraction fails.
pub fn extract_to(workbook_path: &Path, dir: &Path) -> Result<(Extraction, PathBuf)> {
    let workbook = Workbook::open(workbook_path)?;
    let extraction = extract(&workbook)?;
    let mut written = write_documents(dir, &[(RAW_DOCUMENT, to_document(&extraction)?)])?;
    let path = written.pop().unwrap_or_else(|| dir.join(RAW_DOCUMENT));
    Ok((extraction, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortStrategy;
    use crate::error::SheetGenError;
    use crate::schema::{ModelRoutes, Permission};
    use crate::types::registry::UUID_TYPE;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn compiler() -> Compiler {
        Compiler::new(CompilerConfig::new("github.com/acme/app")).unwrap()
    }

    fn compile_json(workbook: &str) -> Compilation {
        let workbook = Workbook::from_json_str(workbook).unwrap();
        let extraction = extract(&workbook).unwrap();
        compiler().compile(&extraction).unwrap()
    }

    const USERS: &str = r#"{
        "users": [
            { "Model": "User", "Field": "id", "Type": "uuid", "Primary": true },
            { "Field": "name", "Type": "string", "Create": "required", "Read": "required" },
            { "Field": "createdAt", "Type": "time", "AutoCreate": true }
        ]
    }"#;

    #[test]
    fn test_end_to_end_users() {
        let compilation = compile_json(USERS);
        let user = compilation.schema.model("users", "User").unwrap();

        assert_eq!(user.len(), 3);
        assert_eq!(
            serde_json::to_value(&user["name"].api).unwrap(),
            json!({ "create": "required", "read": "required" })
        );
        assert_eq!(user["id"].resolved_type.as_deref(), Some(UUID_TYPE));
        assert!(user["id"].primary_key);
        assert_eq!(user["createdAt"].resolved_type.as_deref(), Some("*time.Time"));
        assert!(user["createdAt"].auto_create_time);

        assert_eq!(
            compilation.routes.model("users", "User").unwrap(),
            &ModelRoutes {
                create: Some(vec!["name".to_string()]),
                read: Some(vec!["name".to_string()]),
                ..Default::default()
            }
        );
        assert_eq!(
            serde_json::to_value(&compilation.routes).unwrap(),
            json!({ "users": { "User": { "create": ["name"], "read": ["name"] } } })
        );

        let manifest = &compilation.manifest.models["users.User"];
        assert_eq!(manifest.primary_key, vec!["id"]);
        assert_eq!(manifest.imports, vec!["github.com/google/uuid", "time"]);
    }

    #[test]
    fn test_compiled_document_shape() {
        let compilation = compile_json(USERS);
        let document = serde_json::to_value(&compilation.schema).unwrap();
        assert_eq!(
            document["users"]["User"]["name"],
            json!({
                "Type": "string",
                "type": "string",
                "Length": 255,
                "api": { "create": "required", "read": "required" }
            })
        );
        assert_eq!(
            document["users"]["User"]["createdAt"],
            json!({
                "Type": "time",
                "AutoCreate": true,
                "type": "*time.Time",
                "autoCreateTime": true
            })
        );
    }

    const BLOG: &str = r#"{
        "partials": [
            { "Model": "Timestamps", "Field": "createdAt", "Type": "time", "NotNull": true, "AutoCreate": true },
            { "Field": "updatedAt", "Type": "time" }
        ],
        "blog": [
            { "Model": "Comment", "Field": "id", "Type": "uuid", "Primary": true },
            { "Field": "body", "Type": "text", "Create": "required", "Read": "required" },
            { "Field": "blog.Post", "Create": "required", "Read": "optional" },
            { "Model": "Post", "Field": "id", "Type": "uuid", "Primary": true },
            { "Field": "title", "Type": "string", "MaximumLength": 120, "Create": "required", "Update": "optional" },
            { "Field": "views", "Type": "integer", "Minimum": 0, "Maximum": 4294967295 },
            { "Field": "users.User", "Read": "required" },
            { "Field": "partials.Timestamps" }
        ],
        "users": [
            { "Model": "User", "Field": "id", "Type": "uuid", "Primary": true },
            { "Field": "email", "Type": "email", "DefaultValue": "nobody@example.com", "Read": "required" }
        ]
    }"#;

    #[test]
    fn test_end_to_end_blog() {
        let compilation = compile_json(BLOG);

        let post = compilation.schema.model("blog", "Post").unwrap();
        assert_eq!(
            post.keys().collect::<Vec<_>>(),
            vec!["id", "title", "views", "User", "UserId", "createdAt", "updatedAt"]
        );
        assert_eq!(post["title"].length, Some(120));
        assert_eq!(post["views"].resolved_type.as_deref(), Some("uint32"));
        assert_eq!(post["User"].resolved_type.as_deref(), Some("users.User"));
        assert_eq!(post["UserId"].resolved_type.as_deref(), Some(UUID_TYPE));
        assert_eq!(post["UserId"].api.read, Some(Permission::Required));
        assert!(post["User"].api.is_empty());
        assert_eq!(post["createdAt"].resolved_type.as_deref(), Some("time.Time"));

        let comment = compilation.schema.model("blog", "Comment").unwrap();
        assert_eq!(comment["Post"].resolved_type.as_deref(), Some("Post"));
        assert_eq!(comment["PostId"].api.create, Some(Permission::Required));

        let email = &compilation.schema.model("users", "User").unwrap()["email"];
        assert_eq!(email.default_value, Some(json!("nobody@example.com")));
        assert_eq!(email.length, Some(320));

        // Parents precede children.
        let order = compilation.order();
        let pos = |m: &str| order.iter().position(|o| o == m).unwrap();
        assert!(pos("users.User") < pos("blog.Post"));
        assert!(pos("blog.Post") < pos("blog.Comment"));
        assert_eq!(order.len(), 3);

        assert_eq!(
            compilation.manifest.models["blog.Post"].imports,
            vec!["github.com/google/uuid", "time", "github.com/acme/app/models/users"]
        );
        assert_eq!(
            compilation.manifest.models["blog.Comment"].imports,
            vec!["github.com/google/uuid"]
        );
    }

    #[test]
    fn test_routes_exclude_reference_fields() {
        let compilation = compile_json(BLOG);
        for (package, model, fields) in compilation.schema.models() {
            let routes = compilation.routes.model(package, model).unwrap();
            for action in crate::schema::Action::ALL {
                for name in routes.get(action).unwrap_or_default() {
                    let field = &fields[name.as_str()];
                    assert!(!field.is_reference(), "{package}.{model}.{name}");
                    assert!(field.api.get(action).is_some());
                }
            }
        }
    }

    #[test]
    fn test_unresolved_partial_aborts() {
        let workbook = Workbook::from_json_str(
            r#"{ "blog": [ { "Model": "Post", "Field": "partials.Missing" } ] }"#,
        )
        .unwrap();
        let extraction = extract(&workbook).unwrap();
        assert!(matches!(
            compiler().compile(&extraction),
            Err(SheetGenError::UnresolvedPartial { .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_diagnostic() {
        let compilation = compile_json(
            r#"{ "shop": [ { "Model": "Item", "Field": "price", "Type": "money" } ] }"#,
        );
        assert_eq!(compilation.diagnostics.len(), 1);
        assert_eq!(
            compilation.schema.model("shop", "Item").unwrap()["price"].resolved_type,
            None
        );
    }

    #[test]
    fn test_topological_strategy() {
        let mut config = CompilerConfig::new("github.com/acme/app");
        config.sort = SortStrategy::Topological;
        let compiler = Compiler::new(config).unwrap();
        let workbook = Workbook::from_json_str(BLOG).unwrap();
        let compilation = compiler.compile(&extract(&workbook).unwrap()).unwrap();
        assert_eq!(compilation.order(), ["users.User", "blog.Post", "blog.Comment"]);
    }

    #[test]
    fn test_extract_then_compile_files() {
        let tmp = TempDir::new().unwrap();
        let workbook_path = tmp.path().join("workbook.json");
        std::fs::write(&workbook_path, BLOG).unwrap();

        let (_, raw_path) = extract_to(&workbook_path, tmp.path()).unwrap();
        assert_eq!(raw_path, tmp.path().join(RAW_DOCUMENT));

        let compilation = compiler().compile_file(&raw_path).unwrap();
        let out = tmp.path().join("out");
        compilation.write(&out).unwrap();

        let context = crate::emit::EmitContext::load(&out).unwrap();
        assert_eq!(context.schema, compilation.schema);
        assert_eq!(context.models().count(), 3);
    }

    #[test]
    fn test_failed_extraction_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let workbook_path = tmp.path().join("workbook.json");
        std::fs::write(
            &workbook_path,
            r#"{ "users": [ { "Model": "User", "Field": "id" }, { "Type": "uuid" } ] }"#,
        )
        .unwrap();

        let out = tmp.path().join("out");
        assert!(extract_to(&workbook_path, &out).is_err());
        assert!(!out.join(RAW_DOCUMENT).exists());
    }
}
