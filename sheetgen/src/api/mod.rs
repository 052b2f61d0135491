use crate::schema::{Action, CompiledModel, CompiledSchema, FieldSpec, Permission};

/// Move CRUD permission markers out of every field's properties into its
/// `api` section.
pub fn segregate_schema(schema: CompiledSchema) -> CompiledSchema {
    let mut segregated = CompiledSchema::default();
    for (package, models) in schema.packages {
        let package_models = segregated.packages.entry(package).or_default();
        for (model, fields) in models {
            let fields: CompiledModel = fields
                .into_iter()
                .map(|(name, field)| (name, segregate_field(field)))
                .collect();
            package_models.insert(model, fields);
        }
    }
    segregated
}

/// A property moves when its key is a CRUD action and its value is
/// `required`/`optional`, both compared case-insensitively. Anything else
/// stays where it is.
pub fn segregate_field(mut field: FieldSpec) -> FieldSpec {
    let markers: Vec<(String, Action, Permission)> = field
        .properties
        .iter()
        .filter_map(|(key, value)| {
            let action = Action::from_key(key)?;
            let permission = Permission::from_value(value.as_str()?.trim())?;
            Some((key.clone(), action, permission))
        })
        .collect();

    for (key, action, permission) in markers {
        field.properties.shift_remove(&key);
        field.api.set(action, permission);
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ApiSection, Properties};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn field(entries: &[(&str, serde_json::Value)]) -> FieldSpec {
        FieldSpec {
            properties: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_markers_move_into_api() {
        let segregated = segregate_field(field(&[
            ("Type", json!("string")),
            ("Create", json!("REQUIRED")),
            ("read", json!("Optional")),
        ]));

        assert_eq!(segregated.properties.keys().collect::<Vec<_>>(), vec!["Type"]);
        assert_eq!(
            segregated.api,
            ApiSection {
                create: Some(Permission::Required),
                read: Some(Permission::Optional),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_non_permission_values_stay() {
        let segregated = segregate_field(field(&[
            ("Update", json!("never")),
            ("Delete", json!(true)),
            ("Created", json!("required")),
        ]));
        assert!(segregated.api.is_empty());
        assert_eq!(segregated.properties.len(), 3);
    }

    #[test]
    fn test_empty_api_not_serialized() {
        let segregated = segregate_field(field(&[("Type", json!("string"))]));
        let value = serde_json::to_value(&segregated).unwrap();
        assert!(value.get("api").is_none());

        let with_api = segregate_field(field(&[("Delete", json!("optional"))]));
        let value = serde_json::to_value(&with_api).unwrap();
        assert_eq!(value["api"], json!({ "delete": "optional" }));
    }

    #[test]
    fn test_round_trip_restores_markers_case_folded() {
        let original = field(&[
            ("Type", json!("string")),
            ("CREATE", json!("Required")),
            ("Update", json!("optional")),
            ("Delete", json!("no")),
        ]);
        let segregated = segregate_field(original.clone());

        let mut merged: Properties = segregated.properties.clone();
        merged.extend(segregated.api.to_properties());

        let folded: Properties = original
            .properties
            .iter()
            .map(|(k, v)| match (Action::from_key(k), v.as_str().and_then(Permission::from_value)) {
                (Some(action), Some(permission)) => (
                    action.as_str().to_string(),
                    json!(permission.as_str()),
                ),
                _ => (k.clone(), v.clone()),
            })
            .collect();

        let mut merged_sorted: Vec<_> = merged.into_iter().collect();
        let mut folded_sorted: Vec<_> = folded.into_iter().collect();
        merged_sorted.sort_by(|a, b| a.0.cmp(&b.0));
        folded_sorted.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(merged_sorted, folded_sorted);
    }

    #[test]
    fn test_segregate_schema_applies_everywhere() {
        let mut schema = CompiledSchema::default();
        schema.packages.entry("users".to_string()).or_default().insert(
            "User".to_string(),
            CompiledModel::from([
                ("name".to_string(), field(&[("Read", json!("required"))])),
                ("bio".to_string(), field(&[("Type", json!("text"))])),
            ]),
        );

        let segregated = segregate_schema(schema);
        let user = segregated.model("users", "User").unwrap();
        assert_eq!(user["name"].api.read, Some(Permission::Required));
        assert!(user["name"].properties.is_empty());
        assert!(user["bio"].api.is_empty());
    }
}
