use crate::config::UpliftConfig;
use crate::error::{Result, UpliftError};
use crate::utils::path_validator::PathValidator;
use std::path::{Path, PathBuf};
use tracing::debug;

/// WorkspaceScannerAgent validates the workspace layout
pub struct WorkspaceScannerAgent {
    workspace_path: PathBuf,
}

impl WorkspaceScannerAgent {
    pub fn new<P: AsRef<Path>>(workspace_path: P) -> Self {
        Self {
            workspace_path: workspace_path.as_ref().to_path_buf(),
        }
    }

    /// Validates the workspace and locates its catalog and installed-state files
    pub fn validate(&self) -> Result<WorkspaceInfo> {
        let root = PathValidator::validate_workspace_path(&self.workspace_path)?;
        let config = UpliftConfig::load(&root)?;

        let catalog_path = Self::locate(&root, &config.files.catalog, "catalog")?;
        let installed_path = Self::locate(&root, &config.files.installed, "installed-state")?;

        debug!(
            "Workspace {} uses {} and {}",
            root.display(),
            catalog_path.display(),
            installed_path.display()
        );

        Ok(WorkspaceInfo {
            root,
            config,
            catalog_path,
            installed_path,
        })
    }

    fn locate(root: &Path, name: &str, what: &str) -> Result<PathBuf> {
        let path = root.join(name);
        if !path.is_file() {
            return Err(UpliftError::Workspace(format!(
                "{what} file '{name}' not found"
            )));
        }
        PathValidator::validate_file_path(&path, root)
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceInfo {
    pub root: PathBuf,
    pub config: UpliftConfig,
    pub catalog_path: PathBuf,
    pub installed_path: PathBuf,
}
