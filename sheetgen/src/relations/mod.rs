use crate::config::CompilerConfig;
use crate::error::{Result, SheetGenError};
use crate::schema::value::is_identifier;
use crate::schema::{
    qualified_name, CompiledModel, CompiledSchema, FieldSpec, HierarchyGraph, ImportTable,
};
use crate::types::registry::{UUID_IMPORT, UUID_TYPE};
use indexmap::IndexMap;
use serde_json::Value;

/// Constraint attached to every parent-reference field.
pub const CASCADE_DELETE: &str = "OnDelete:CASCADE";

/// Suffix of the foreign-key identifier field.
pub const ID_SUFFIX: &str = "Id";

/// Compiled schema with relationships expanded, plus the parent -> children table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub schema: CompiledSchema,
    pub hierarchy: HierarchyGraph,
}

/// A dotted field key split into the model it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    pub package: String,
    pub model: String,
}

impl RelationshipTarget {
    /// Parse `<package>.<Model>`. Keys without a dot are not relationships.
    pub fn parse(key: &str) -> Option<Result<Self>> {
        let (package, model) = key.split_once('.')?;
        if package.is_empty() || !is_identifier(model) {
            return Some(Err(SheetGenError::Schema(format!(
                "Relationship key '{key}' must have the form <package>.<Model>"
            ))));
        }
        Some(Ok(RelationshipTarget {
            package: package.to_string(),
            model: model.to_string(),
        }))
    }

    pub fn qualified(&self) -> String {
        qualified_name(&self.package, &self.model)
    }
}

/// Replace every dotted field with a parent reference and an `<Model>Id` field.
pub fn expand_relationships(
    schema: CompiledSchema,
    imports: &mut ImportTable,
    config: &CompilerConfig,
) -> Result<Expansion> {
    let mut hierarchy = HierarchyGraph::default();
    let mut expanded = CompiledSchema::default();

    for (package, models) in &schema.packages {
        let package_models = expanded.packages.entry(package.clone()).or_default();
        for (model, fields) in models {
            let child = qualified_name(package, model);
            let mut out = CompiledModel::new();
            // output field -> source key that produced it
            let mut origins: IndexMap<String, &str> = IndexMap::new();

            for (field, spec) in fields {
                let target = match RelationshipTarget::parse(field) {
                    None => {
                        claim(&mut origins, &child, field, field)?;
                        out.insert(field.clone(), spec.clone());
                        continue;
                    }
                    Some(target) => target?,
                };

                let id_field = format!("{}{ID_SUFFIX}", target.model);
                claim(&mut origins, &child, &target.model, field)?;
                claim(&mut origins, &child, &id_field, field)?;

                if schema.model(&target.package, &target.model).is_none() {
                    log::warn!(
                        "{child}.{field} references {} which is not defined in this workbook",
                        target.qualified()
                    );
                }

                let reference_type = if target.package == *package {
                    target.model.clone()
                } else {
                    imports.add(&child, &config.package_import(&target.package));
                    target.qualified()
                };

                let reference = FieldSpec {
                    resolved_type: Some(reference_type),
                    references: Some(target.qualified()),
                    constraint: Some(CASCADE_DELETE.to_string()),
                    ..Default::default()
                };

                let mut identifier = spec.clone();
                identifier
                    .properties
                    .insert("Type".to_string(), Value::String("uuid".to_string()));
                identifier.resolved_type = Some(UUID_TYPE.to_string());
                identifier.length = None;
                identifier.auto_create_time = false;
                imports.add(&child, UUID_IMPORT);

                log::debug!("Expanded {child}.{field} into {} and {id_field}", target.model);
                out.insert(target.model.clone(), reference);
                out.insert(id_field, identifier);
                hierarchy.add_edge(&target.qualified(), &child);
            }

            package_models.insert(model.clone(), out);
        }
    }

    Ok(Expansion {
        schema: expanded,
        hierarchy,
    })
}

/// Record that `source` produces `output` in `model`; two keys may not produce the same field.
fn claim<'a>(
    origins: &mut IndexMap<String, &'a str>,
    model: &str,
    output: &str,
    source: &'a str,
) -> Result<()> {
    if let Some(previous) = origins.get(output) {
        return Err(SheetGenError::Schema(format!(
            "{model}: fields '{previous}' and '{source}' both expand to '{output}'"
        )));
    }
    origins.insert(output.to_string(), source);
    Ok(())
}
