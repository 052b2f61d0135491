use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Raw column name -> cell value map for one field, as read from the sheet.
pub type Properties = IndexMap<String, serde_json::Value>;

/// Field name -> raw properties, for one model or one partial.
pub type RawFields = IndexMap<String, Properties>;

/// Model name -> raw fields, for one package.
pub type RawModels = IndexMap<String, RawFields>;

/// Field name -> compiled field, for one model.
pub type CompiledModel = IndexMap<String, FieldSpec>;

/// Raw schema extracted from the workbook: package -> model -> field -> properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSchema {
    pub packages: IndexMap<String, RawModels>,
}

/// Reusable field bundles from the `partials` sheet: partial -> field -> properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialBundle {
    pub partials: IndexMap<String, RawFields>,
}

/// The persisted result of sheet extraction. Every later phase starts from this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub schema: RawSchema,
    #[serde(default)]
    pub partials: PartialBundle,
}

/// Compiled schema: package -> model -> field -> field spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompiledSchema {
    pub packages: IndexMap<String, IndexMap<String, CompiledModel>>,
}

impl CompiledSchema {
    pub fn model(&self, package: &str, model: &str) -> Option<&CompiledModel> {
        self.packages.get(package).and_then(|models| models.get(model))
    }

    /// Iterate `(package, model, fields)` in schema order.
    pub fn models(&self) -> impl Iterator<Item = (&str, &str, &CompiledModel)> {
        self.packages.iter().flat_map(|(package, models)| {
            models
                .iter()
                .map(move |(model, fields)| (package.as_str(), model.as_str(), fields))
        })
    }
}

/// One CRUD action a field can be exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Match a property key case-insensitively against the four action names.
    pub fn from_key(key: &str) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|action| key.eq_ignore_ascii_case(action.as_str()))
    }
}

/// Whether a field must or may be supplied for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Required,
    Optional,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Required => "required",
            Permission::Optional => "optional",
        }
    }

    pub fn from_value(value: &str) -> Option<Permission> {
        if value.eq_ignore_ascii_case("required") {
            Some(Permission::Required)
        } else if value.eq_ignore_ascii_case("optional") {
            Some(Permission::Optional)
        } else {
            None
        }
    }
}

/// The `api` sub-object of a compiled field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Permission>,
}

impl ApiSection {
    pub fn is_empty(&self) -> bool {
        self.create.is_none() && self.read.is_none() && self.update.is_none() && self.delete.is_none()
    }

    pub fn get(&self, action: Action) -> Option<Permission> {
        match action {
            Action::Create => self.create,
            Action::Read => self.read,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    pub fn set(&mut self, action: Action, permission: Permission) {
        let slot = match action {
            Action::Create => &mut self.create,
            Action::Read => &mut self.read,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        };
        *slot = Some(permission);
    }

    /// Actions present in this section, in create/read/update/delete order.
    pub fn actions(&self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.get(*action).is_some())
            .collect()
    }

    /// Render the section back into lower-cased permission properties.
    pub fn to_properties(&self) -> Properties {
        self.actions()
            .into_iter()
            .filter_map(|action| {
                self.get(action).map(|permission| {
                    (
                        action.as_str().to_string(),
                        serde_json::Value::String(permission.as_str().to_string()),
                    )
                })
            })
            .collect()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A compiled field: the raw properties plus everything the compiler derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub properties: Properties,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resolved_type: Option<String>,
    #[serde(rename = "Length", default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(rename = "DefaultValue", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(rename = "primaryKey", default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(rename = "autoCreateTime", default, skip_serializing_if = "is_false")]
    pub auto_create_time: bool,
    /// Qualified `package.Model` key of the parent this field points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default, skip_serializing_if = "ApiSection::is_empty")]
    pub api: ApiSection,
}

/// Keys the compiler owns on a serialized field. A raw column with one of these
/// names would collide with the derived value.
pub const RESERVED_KEYS: [&str; 8] = [
    "type",
    "Length",
    "DefaultValue",
    "primaryKey",
    "autoCreateTime",
    "references",
    "constraint",
    "api",
];

impl FieldSpec {
    /// Lift raw properties into a field spec. `DefaultValue` moves out of the
    /// property map into its own slot, keeping its cell type; other reserved
    /// keys are dropped.
    pub fn from_properties(mut properties: Properties) -> Self {
        let default_value = properties
            .shift_remove("DefaultValue")
            .filter(|value| !super::value::is_blank(value));

        for key in RESERVED_KEYS {
            if properties.shift_remove(key).is_some() {
                log::warn!("Column '{key}' collides with a compiled field key and was dropped");
            }
        }

        FieldSpec {
            properties,
            default_value,
            ..Default::default()
        }
    }

    /// Whether this field is the parent-reference half of an expanded relationship.
    pub fn is_reference(&self) -> bool {
        self.references.is_some()
    }
}

/// Route schema: package -> model -> per-action field lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteSchema {
    pub packages: IndexMap<String, IndexMap<String, ModelRoutes>>,
}

impl RouteSchema {
    pub fn model(&self, package: &str, model: &str) -> Option<&ModelRoutes> {
        self.packages.get(package).and_then(|models| models.get(model))
    }
}

/// Permitted field names per action for one model. Empty actions are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRoutes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Vec<String>>,
}

impl ModelRoutes {
    pub fn get(&self, action: Action) -> Option<&[String]> {
        let slot = match action {
            Action::Create => &self.create,
            Action::Read => &self.read,
            Action::Update => &self.update,
            Action::Delete => &self.delete,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, action: Action, fields: Vec<String>) {
        let value = if fields.is_empty() { None } else { Some(fields) };
        match action {
            Action::Create => self.create = value,
            Action::Read => self.read = value,
            Action::Update => self.update = value,
            Action::Delete => self.delete = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        Action::ALL.into_iter().all(|action| self.get(action).is_none())
    }
}

/// Parent -> children table built while expanding relationships.
/// Keys and children are qualified `package.Model` names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyGraph {
    pub edges: IndexMap<String, IndexSet<String>>,
}

impl HierarchyGraph {
    pub fn add_edge(&mut self, parent: &str, child: &str) {
        self.edges
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
    }

    pub fn children(&self, parent: &str) -> Option<&IndexSet<String>> {
        self.edges.get(parent)
    }

    /// Invert the table: child -> recorded parents, in edge order.
    pub fn parents(&self) -> IndexMap<&str, Vec<&str>> {
        let mut parents: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (parent, children) in &self.edges {
            for child in children {
                parents.entry(child.as_str()).or_default().push(parent.as_str());
            }
        }
        parents
    }

    pub fn is_child(&self, model: &str) -> bool {
        self.edges.values().any(|children| children.contains(model))
    }
}

/// Deduplicated import strings per qualified model, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportTable {
    pub models: IndexMap<String, IndexSet<String>>,
}

impl ImportTable {
    pub fn add(&mut self, qualified_model: &str, import: &str) {
        self.models
            .entry(qualified_model.to_string())
            .or_default()
            .insert(import.to_string());
    }

    pub fn for_model(&self, qualified_model: &str) -> Vec<String> {
        self.models
            .get(qualified_model)
            .map(|imports| imports.iter().cloned().collect())
            .unwrap_or_default()
    }
}
