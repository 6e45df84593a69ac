use crate::agents::installer_selector::SelectionPreferences;
use crate::agents::workspace_scanner::WorkspaceInfo;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::installed::InstalledState;
use tracing::debug;

/// Collaborators loaded from one workspace.
pub struct Workspace {
    pub info: WorkspaceInfo,
    pub catalog: Catalog,
    pub installed: InstalledState,
    pub preferences: SelectionPreferences,
}

pub struct RepositoryFactory;

impl RepositoryFactory {
    pub fn open(info: WorkspaceInfo) -> Result<Workspace> {
        let preferences = info.config.preferences()?;
        let catalog = Catalog::load(&info.catalog_path)?;
        let installed = InstalledState::load(&info.installed_path)?;

        debug!(
            "Opened workspace with {} catalog package(s), preferring {}",
            catalog.len(),
            preferences.architecture
        );

        Ok(Workspace {
            info,
            catalog,
            installed,
            preferences,
        })
    }
}
