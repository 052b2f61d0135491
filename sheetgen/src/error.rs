use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetGenError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unresolved partial '{partial}' referenced by {package}.{model}")]
    UnresolvedPartial {
        package: String,
        model: String,
        partial: String,
    },

    #[error("Invalid {bound} '{value}' on {package}.{model}.{field}")]
    InvalidBound {
        package: String,
        model: String,
        field: String,
        bound: &'static str,
        value: String,
    },

    #[error("Type resolution error: unknown type '{declared}' on {package}.{model}.{field}")]
    TypeResolution {
        package: String,
        model: String,
        field: String,
        declared: String,
    },

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SheetGenError>;
