//! Domain type resolution.
//!
//! Each field's declared `Type` is looked up in the [`TypeRegistry`] and then
//! refined: integers get the narrowest width covering `[Minimum, Maximum]`,
//! floats pick 32 or 64 bits by magnitude, and temporal fields become optional
//! unless `NotNull`. Types with a non-primitive representation record their
//! import on the model.

pub mod registry;

pub use registry::{DomainType, Refinement, TypeDescriptor, TypeRegistry};

use crate::error::{Result, SheetGenError};
use crate::schema::value::{cell_text, is_blank, is_truthy, parse_float, parse_integer};
use crate::schema::{
    qualified_name, CompiledModel, CompiledSchema, FieldSpec, ImportTable, Properties, RawFields,
    RawSchema,
};
use registry::{
    FLOAT32, FLOAT64, INT32, INT64, OPTIONAL_TEMPORAL_TYPE, TEMPORAL_TYPE, UINT32, UINT64,
};
use serde::Serialize;

/// 2^64 - 1, the default for a missing bound.
const U64_SPAN: i128 = u64::MAX as i128;

/// A lenient-path finding that did not abort compilation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub package: String,
    pub model: String,
    pub field: String,
    pub message: String,
}

/// Where a field lives, for error messages and import bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct FieldScope<'a> {
    pub package: &'a str,
    pub model: &'a str,
    pub field: &'a str,
}

/// Outcome of resolving one declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub type_name: String,
    pub length: Option<u64>,
    pub auto_create_time: bool,
    pub import: Option<&'static str>,
}

/// Resolve types across the whole schema, producing compiled field specs.
pub fn resolve_schema(
    registry: &TypeRegistry,
    schema: &RawSchema,
    imports: &mut ImportTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CompiledSchema> {
    let mut compiled = CompiledSchema::default();
    for (package, models) in &schema.packages {
        let package_models = compiled.packages.entry(package.clone()).or_default();
        for (model, fields) in models {
            let resolved = resolve_model(registry, package, model, fields, imports, diagnostics)?;
            package_models.insert(model.clone(), resolved);
        }
    }
    Ok(compiled)
}

/// Resolve one model's fields. Relationship keys (containing a dot) are lifted
/// untouched; the relationship expander types them.
pub fn resolve_model(
    registry: &TypeRegistry,
    package: &str,
    model: &str,
    fields: &RawFields,
    imports: &mut ImportTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CompiledModel> {
    let qualified = qualified_name(package, model);
    let mut compiled = CompiledModel::new();

    for (field, properties) in fields {
        let mut spec = FieldSpec::from_properties(properties.clone());
        spec.primary_key = properties.get("Primary").map(is_truthy).unwrap_or(false);

        if !field.contains('.') {
            let scope = FieldScope { package, model, field };
            match resolve_field(registry, scope, properties) {
                Ok(Some(resolved)) => {
                    if let Some(import) = resolved.import {
                        imports.add(&qualified, import);
                    }
                    spec.resolved_type = Some(resolved.type_name);
                    spec.length = resolved.length;
                    spec.auto_create_time = resolved.auto_create_time;
                }
                Ok(None) => {}
                Err(SheetGenError::TypeResolution { declared, .. }) => {
                    log::warn!("Unknown type '{declared}' on {qualified}.{field}; leaving it untyped");
                    diagnostics.push(Diagnostic {
                        package: package.to_string(),
                        model: model.to_string(),
                        field: field.clone(),
                        message: format!("unknown type '{declared}'"),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        compiled.insert(field.clone(), spec);
    }

    Ok(compiled)
}

/// Resolve a single field's declared type. `Ok(None)` means no `Type` was
/// declared; an unregistered type is a `TypeResolution` error the caller may
/// downgrade to a diagnostic.
pub fn resolve_field(
    registry: &TypeRegistry,
    scope: FieldScope<'_>,
    properties: &Properties,
) -> Result<Option<ResolvedType>> {
    let Some(declared) = properties.get("Type").and_then(cell_text) else {
        return Ok(None);
    };

    let domain_type = registry
        .lookup(&declared)
        .ok_or_else(|| SheetGenError::TypeResolution {
            package: scope.package.to_string(),
            model: scope.model.to_string(),
            field: scope.field.to_string(),
            declared: declared.clone(),
        })?;

    let descriptor = domain_type.descriptor();
    let mut resolved = ResolvedType {
        type_name: descriptor.base().to_string(),
        length: declared_length(scope, properties)?.or(descriptor.length()),
        auto_create_time: false,
        import: domain_type.import(),
    };

    match domain_type.refinement() {
        Refinement::None => {}
        Refinement::Temporal => {
            let not_null = properties.get("NotNull").map(is_truthy).unwrap_or(false);
            resolved.type_name = if not_null {
                TEMPORAL_TYPE.to_string()
            } else {
                OPTIONAL_TEMPORAL_TYPE.to_string()
            };
            resolved.auto_create_time = properties.get("AutoCreate").map(is_truthy).unwrap_or(false);
        }
        Refinement::Integer => {
            let minimum = integer_bound(scope, properties, "Minimum")?;
            let maximum = integer_bound(scope, properties, "Maximum")?;
            resolved.type_name = integer_width(minimum, maximum).to_string();
        }
        Refinement::Float => {
            let minimum = float_bound(scope, properties, "Minimum")?;
            let maximum = float_bound(scope, properties, "Maximum")?;
            resolved.type_name = float_width(minimum, maximum).to_string();
        }
    }

    Ok(Some(resolved))
}

/// Narrowest integer width for the declared range.
///
/// | Minimum | Maximum      | Width  |
/// |---------|--------------|--------|
/// | >= 0    | <= 2^32 - 1  | uint32 |
/// | >= 0    | >  2^32 - 1  | uint64 |
/// | < 0     | <= 2^31 - 1  | int32  |
/// | < 0     | >  2^31 - 1  | int64  |
///
/// Without bounds the widest signed width is used. A missing bound defaults to
/// 0 or +/-(2^64 - 1). A minimum below `i32::MIN` also needs `int64`.
pub fn integer_width(minimum: Option<i128>, maximum: Option<i128>) -> &'static str {
    let (minimum, maximum) = match (minimum, maximum) {
        (None, None) => return INT64,
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, U64_SPAN),
        (None, Some(max)) => (if max >= 0 { 0 } else { -U64_SPAN }, max),
    };

    if minimum >= 0 {
        if maximum <= i128::from(u32::MAX) {
            UINT32
        } else {
            UINT64
        }
    } else if maximum <= i128::from(i32::MAX) && minimum >= i128::from(i32::MIN) {
        INT32
    } else {
        INT64
    }
}

/// 32-bit float when every given bound fits in single precision, else 64-bit.
/// Without a `Maximum` the 64-bit form is used.
pub fn float_width(minimum: Option<f64>, maximum: Option<f64>) -> &'static str {
    let Some(maximum) = maximum else {
        return FLOAT64;
    };
    let magnitude = minimum.map(f64::abs).unwrap_or(0.0).max(maximum.abs());
    if magnitude <= f64::from(f32::MAX) {
        FLOAT32
    } else {
        FLOAT64
    }
}

fn declared_length(scope: FieldScope<'_>, properties: &Properties) -> Result<Option<u64>> {
    let Some((key, value)) = ["MaximumLength", "length"]
        .into_iter()
        .find_map(|key| properties.get(key).filter(|v| !is_blank(v)).map(|v| (key, v)))
    else {
        return Ok(None);
    };

    parse_integer(value)
        .ok()
        .and_then(|length| u64::try_from(length).ok())
        .map(Some)
        .ok_or_else(|| invalid_bound(scope, key, value.to_string()))
}

fn integer_bound(scope: FieldScope<'_>, properties: &Properties, key: &'static str) -> Result<Option<i128>> {
    match properties.get(key).filter(|value| !is_blank(value)) {
        None => Ok(None),
        Some(value) => parse_integer(value)
            .map(Some)
            .map_err(|text| invalid_bound(scope, key, text)),
    }
}

fn float_bound(scope: FieldScope<'_>, properties: &Properties, key: &'static str) -> Result<Option<f64>> {
    match properties.get(key).filter(|value| !is_blank(value)) {
        None => Ok(None),
        Some(value) => parse_float(value)
            .map(Some)
            .map_err(|text| invalid_bound(scope, key, text)),
    }
}

fn invalid_bound(scope: FieldScope<'_>, bound: &'static str, value: String) -> SheetGenError {
    SheetGenError::InvalidBound {
        package: scope.package.to_string(),
        model: scope.model.to_string(),
        field: scope.field.to_string(),
        bound,
        value,
    }
}
