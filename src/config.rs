use crate::agents::installer_selector::SelectionPreferences;
use crate::catalog::manifest::{Architecture, Scope};
use crate::error::{Result, UpliftError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "uplift.toml";

/// Optional `uplift.toml` in the workspace directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpliftConfig {
    pub selection: SelectionConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub architecture: Option<String>,
    pub locale: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub catalog: String,
    pub installed: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            catalog: "catalog.toml".to_string(),
            installed: "installed.toml".to_string(),
        }
    }
}

impl UpliftConfig {
    /// Loads `uplift.toml` from the workspace, falling back to defaults when absent.
    pub fn load<P: AsRef<Path>>(workspace: P) -> Result<Self> {
        let path = workspace.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| UpliftError::Config(format!("Failed to read {CONFIG_FILE}: {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| UpliftError::Config(format!("Invalid {CONFIG_FILE}: {e}")))
    }

    pub fn preferences(&self) -> Result<SelectionPreferences> {
        let architecture = match &self.selection.architecture {
            Some(arch) => arch.parse::<Architecture>()?,
            None => Architecture::host(),
        };
        let scope = self
            .selection
            .scope
            .as_deref()
            .map(str::parse::<Scope>)
            .transpose()?;

        Ok(SelectionPreferences {
            architecture,
            locale: self.selection.locale.clone(),
            scope,
        })
    }
}
