use crate::error::{Result, SheetGenError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "sheetgen.yaml";

/// Environment variable overriding `module_path`.
pub const MODULE_PATH_ENV: &str = "SHEETGEN_MODULE_PATH";

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_output_dir() -> String {
    "build".to_string()
}

/// How the hierarchy sorter orders models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    /// Seed with root models, then a fixed number of single-parent passes.
    #[default]
    BoundedPasses,
    /// Full dependency ordering (Kahn's algorithm).
    Topological,
}

/// Contents of `sheetgen.yaml`. Every key is optional on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub module_path: Option<String>,
    #[serde(default)]
    pub models_dir: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub sort: Option<SortStrategy>,
}

impl ProjectConfig {
    /// Load a config file. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ProjectConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply a value taken from `SHEETGEN_MODULE_PATH`, if set.
    pub fn with_env_module_path(mut self, value: Option<String>) -> Self {
        if let Some(module_path) = value.filter(|v| !v.trim().is_empty()) {
            self.module_path = Some(module_path);
        }
        self
    }

    /// Apply the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_module_path(std::env::var(MODULE_PATH_ENV).ok())
    }

    pub fn output_dir(&self) -> String {
        self.output_dir.clone().unwrap_or_else(default_output_dir)
    }

    /// Validate into the settings the compiler needs.
    pub fn compiler_config(&self) -> Result<CompilerConfig> {
        let module_path = self
            .module_path
            .as_deref()
            .map(|p| p.trim().trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                SheetGenError::Configuration(format!(
                    "module_path is not set; add it to {CONFIG_FILE}, set {MODULE_PATH_ENV}, or pass --module-path"
                ))
            })?;

        let models_dir = self
            .models_dir
            .as_deref()
            .map(|d| d.trim().trim_matches('/'))
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_models_dir);

        Ok(CompilerConfig {
            module_path: module_path.to_string(),
            models_dir,
            sort: self.sort.unwrap_or_default(),
        })
    }
}

/// Validated settings threaded through the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Import path of the generated application module.
    pub module_path: String,
    /// Directory under the module that holds one sub-package per sheet.
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    #[serde(default)]
    pub sort: SortStrategy,
}

impl CompilerConfig {
    pub fn new(module_path: impl Into<String>) -> Self {
        CompilerConfig {
            module_path: module_path.into(),
            models_dir: default_models_dir(),
            sort: SortStrategy::default(),
        }
    }

    /// Import path of the generated package for a sheet.
    pub fn package_import(&self, package: &str) -> String {
        format!("{}/{}/{}", self.module_path, self.models_dir, package)
    }
}
