use crate::error::{Result, SheetGenError};
use crate::schema::{PartialBundle, RawFields, RawSchema};

/// Prefix marking a field row as a reference to a partial.
pub const PARTIAL_PREFIX: &str = "partials.";

/// Inline every `partials.<Name>` field reference across the schema.
pub fn resolve_partials(schema: &RawSchema, bundle: &PartialBundle) -> Result<RawSchema> {
    let mut resolved = RawSchema::default();

    for (package, models) in &schema.packages {
        let package_models = resolved.packages.entry(package.clone()).or_default();
        for (model, fields) in models {
            let fields = resolve_model(package, model, fields, bundle)?;
            package_models.insert(model.clone(), fields);
        }
    }

    Ok(resolved)
}

/// Build a fresh field map for one model with partial references expanded at
/// the position they were declared.
pub fn resolve_model(
    package: &str,
    model: &str,
    fields: &RawFields,
    bundle: &PartialBundle,
) -> Result<RawFields> {
    let mut resolved = RawFields::new();
    let mut stack = Vec::new();
    inline_fields(package, model, fields, bundle, &mut stack, &mut resolved)?;
    Ok(resolved)
}

fn inline_fields(
    package: &str,
    model: &str,
    fields: &RawFields,
    bundle: &PartialBundle,
    stack: &mut Vec<String>,
    out: &mut RawFields,
) -> Result<()> {
    for (field, properties) in fields {
        let Some(name) = field.strip_prefix(PARTIAL_PREFIX) else {
            out.insert(field.clone(), properties.clone());
            continue;
        };

        if stack.iter().any(|seen| seen == name) {
            return Err(SheetGenError::Schema(format!(
                "Partial '{name}' includes itself (via {}) in {package}.{model}",
                stack.join(" -> ")
            )));
        }

        let partial = bundle.partials.get(name).ok_or_else(|| SheetGenError::UnresolvedPartial {
            package: package.to_string(),
            model: model.to_string(),
            partial: name.to_string(),
        })?;

        log::debug!("Inlining partial '{name}' ({} fields) into {package}.{model}", partial.len());
        stack.push(name.to_string());
        inline_fields(package, model, partial, bundle, stack, out)?;
        stack.pop();
    }
    Ok(())
}
