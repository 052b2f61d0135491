use crate::error::{Result, SheetGenError};
use indexmap::IndexMap;

/// Target type of the unique-identifier domain type.
pub const UUID_TYPE: &str = "uuid.UUID";
/// Import required by `UUID_TYPE`.
pub const UUID_IMPORT: &str = "github.com/google/uuid";
/// Target type of the temporal domain type.
pub const TEMPORAL_TYPE: &str = "time.Time";
/// Optional form of `TEMPORAL_TYPE`, used unless the field is `NotNull`.
pub const OPTIONAL_TEMPORAL_TYPE: &str = "*time.Time";
/// Import required by `TEMPORAL_TYPE`.
pub const TEMPORAL_IMPORT: &str = "time";

pub const INT32: &str = "int32";
pub const INT64: &str = "int64";
pub const UINT32: &str = "uint32";
pub const UINT64: &str = "uint64";
pub const FLOAT32: &str = "float32";
pub const FLOAT64: &str = "float64";

/// Domain types a sheet may declare in its `Type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainType {
    Uuid,
    String,
    Text,
    Email,
    Url,
    Phone,
    Boolean,
    Integer,
    Float,
    Time,
    Bytes,
}

/// How a domain type maps onto the target: a bare name or a sized string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDescriptor {
    Scalar(&'static str),
    Sized { base: &'static str, length: u64 },
}

impl TypeDescriptor {
    pub fn base(&self) -> &'static str {
        match self {
            TypeDescriptor::Scalar(base) | TypeDescriptor::Sized { base, .. } => base,
        }
    }

    pub fn length(&self) -> Option<u64> {
        match self {
            TypeDescriptor::Scalar(_) => None,
            TypeDescriptor::Sized { length, .. } => Some(*length),
        }
    }
}

/// Which refinement rule applies after the registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    None,
    Integer,
    Float,
    Temporal,
}

impl DomainType {
    pub fn descriptor(self) -> TypeDescriptor {
        match self {
            DomainType::Uuid => TypeDescriptor::Scalar(UUID_TYPE),
            DomainType::String => TypeDescriptor::Sized { base: "string", length: 255 },
            DomainType::Text => TypeDescriptor::Scalar("string"),
            DomainType::Email => TypeDescriptor::Sized { base: "string", length: 320 },
            DomainType::Url => TypeDescriptor::Sized { base: "string", length: 2048 },
            DomainType::Phone => TypeDescriptor::Sized { base: "string", length: 32 },
            DomainType::Boolean => TypeDescriptor::Scalar("bool"),
            DomainType::Integer => TypeDescriptor::Scalar(INT64),
            DomainType::Float => TypeDescriptor::Scalar(FLOAT64),
            DomainType::Time => TypeDescriptor::Scalar(TEMPORAL_TYPE),
            DomainType::Bytes => TypeDescriptor::Scalar("[]byte"),
        }
    }

    pub fn refinement(self) -> Refinement {
        match self {
            DomainType::Integer => Refinement::Integer,
            DomainType::Float => Refinement::Float,
            DomainType::Time => Refinement::Temporal,
            _ => Refinement::None,
        }
    }

    /// Fixed import a non-primitive representation needs.
    pub fn import(self) -> Option<&'static str> {
        match self {
            DomainType::Uuid => Some(UUID_IMPORT),
            DomainType::Time => Some(TEMPORAL_IMPORT),
            _ => None,
        }
    }
}

/// Declared names accepted in the `Type` column, already case-folded.
pub const STANDARD_NAMES: &[(&str, DomainType)] = &[
    ("uuid", DomainType::Uuid),
    ("guid", DomainType::Uuid),
    ("string", DomainType::String),
    ("varchar", DomainType::String),
    ("text", DomainType::Text),
    ("email", DomainType::Email),
    ("url", DomainType::Url),
    ("phone", DomainType::Phone),
    ("boolean", DomainType::Boolean),
    ("bool", DomainType::Boolean),
    ("integer", DomainType::Integer),
    ("int", DomainType::Integer),
    ("float", DomainType::Float),
    ("double", DomainType::Float),
    ("decimal", DomainType::Float),
    ("number", DomainType::Float),
    ("time", DomainType::Time),
    ("datetime", DomainType::Time),
    ("timestamp", DomainType::Time),
    ("date", DomainType::Time),
    ("bytes", DomainType::Bytes),
];

/// Closed lookup table from declared type names to domain types.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    names: IndexMap<String, DomainType>,
}

impl TypeRegistry {
    /// The built-in registry.
    pub fn standard() -> Result<Self> {
        Self::from_entries(STANDARD_NAMES)
    }

    /// Build a registry, rejecting names that are not case-folded or that
    /// appear twice.
    pub fn from_entries(entries: &[(&str, DomainType)]) -> Result<Self> {
        let mut names = IndexMap::new();
        for (name, domain_type) in entries {
            let folded = name.trim().to_lowercase();
            if folded != *name || folded.is_empty() {
                return Err(SheetGenError::Configuration(format!(
                    "Type registry name '{name}' must be non-empty and lower-case"
                )));
            }
            if names.insert(folded, *domain_type).is_some() {
                return Err(SheetGenError::Configuration(format!(
                    "Type registry name '{name}' is registered twice"
                )));
            }
        }
        Ok(TypeRegistry { names })
    }

    /// Case-folded lookup of a declared type name.
    pub fn lookup(&self, declared: &str) -> Option<DomainType> {
        self.names.get(&declared.trim().to_lowercase()).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, DomainType)> {
        self.names.iter().map(|(name, domain_type)| (name.as_str(), *domain_type))
    }
}
