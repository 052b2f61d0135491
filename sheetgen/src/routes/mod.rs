use crate::schema::{Action, ApiSection, CompiledModel, CompiledSchema, ModelRoutes, RouteSchema};
use indexmap::IndexMap;

/// Derive the route schema: for every model, the fields permitted per action.
pub fn project_routes(schema: &CompiledSchema) -> RouteSchema {
    let mut routes = RouteSchema::default();
    for (package, models) in &schema.packages {
        let package_routes = routes.packages.entry(package.clone()).or_default();
        for (model, fields) in models {
            package_routes.insert(model.clone(), project_model(fields));
        }
    }
    routes
}

/// Fields reduced to their `api` section; fields without one drop out.
pub fn permission_view(fields: &CompiledModel) -> IndexMap<&str, &ApiSection> {
    fields
        .iter()
        .filter(|(_, field)| !field.api.is_empty())
        .map(|(name, field)| (name.as_str(), &field.api))
        .collect()
}

pub fn project_model(fields: &CompiledModel) -> ModelRoutes {
    let view = permission_view(fields);
    let mut routes = ModelRoutes::default();
    for action in Action::ALL {
        let permitted = view
            .iter()
            .filter(|(_, api)| api.get(action).is_some())
            .map(|(name, _)| name.to_string())
            .collect();
        routes.set(action, permitted);
    }
    routes
}
