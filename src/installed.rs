use crate::catalog::manifest::{Architecture, InstallerType, Scope};
use crate::error::{Result, UpliftError};
use crate::repository::{AvailablePackage, InstalledDiscovery};
use crate::utils::toml::TomlUtils;
use jiff::Timestamp;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table};
use tracing::debug;

const PACKAGES: &str = "packages";

/// Snapshot of one installed package. Never mutated while a resolution runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledPackage {
    pub id: String,
    pub version: String,
    pub installer_type: InstallerType,
    pub architecture: Architecture,
    pub scope: Option<Scope>,
    pub source: Option<String>,
}

impl InstalledPackage {
    fn from_item(id: &str, item: &Item) -> Result<Self> {
        let field = |key: &str| TomlUtils::get_str(item, key);
        let invalid = |what: &str| {
            UpliftError::Workspace(format!("Installed package '{id}' has no {what}"))
        };

        let version = field("version").ok_or_else(|| invalid("version"))?;
        let installer_type = field("installer_type")
            .ok_or_else(|| invalid("installer_type"))?
            .parse::<InstallerType>()?;
        let architecture = match field("architecture") {
            Some(arch) => arch.parse::<Architecture>()?,
            None => Architecture::Neutral,
        };
        let scope = field("scope").map(|s| s.parse::<Scope>()).transpose()?;

        Ok(Self {
            id: id.to_string(),
            version,
            installer_type,
            architecture,
            scope,
            source: field("source"),
        })
    }
}

/// The installed-state file, kept as an editable document so writes preserve formatting.
#[derive(Debug)]
pub struct InstalledState {
    path: PathBuf,
    doc: DocumentMut,
}

impl InstalledState {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UpliftError::TomlParsing(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(path, &content)
    }

    pub fn parse<P: AsRef<Path>>(path: P, content: &str) -> Result<Self> {
        let doc = content
            .parse::<DocumentMut>()
            .map_err(|e| UpliftError::TomlParsing(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            doc,
        })
    }

    fn table(&self) -> Option<&Table> {
        self.doc.get(PACKAGES).and_then(|v| v.as_table())
    }

    /// All installed packages, in file order.
    pub fn packages(&self) -> Result<Vec<InstalledPackage>> {
        let Some(table) = self.table() else {
            return Ok(Vec::new());
        };

        table
            .iter()
            .map(|(id, item)| InstalledPackage::from_item(id, item))
            .collect()
    }

    /// Looks a package up by case-insensitive id.
    pub fn find(&self, id: &str) -> Result<Option<InstalledPackage>> {
        let Some(table) = self.table() else {
            return Ok(None);
        };

        table
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(id))
            .map(|(key, item)| InstalledPackage::from_item(key, item))
            .transpose()
    }

    /// Records a completed update for `id`.
    pub fn record_update(
        &mut self,
        id: &str,
        version: &str,
        installer_type: InstallerType,
        at: Timestamp,
    ) -> Result<()> {
        let item = self
            .doc
            .get_mut(PACKAGES)
            .and_then(|v| v.as_table_mut())
            .and_then(|table| {
                let key = table
                    .iter()
                    .map(|(k, _)| k.to_string())
                    .find(|k| k.eq_ignore_ascii_case(id))?;
                table.get_mut(&key)
            })
            .ok_or_else(|| UpliftError::NotInstalled(id.to_string()))?;

        let updated = TomlUtils::set_str(item, "version", version)
            && TomlUtils::set_str(item, "installer_type", &installer_type.to_string())
            && TomlUtils::set_str(item, "updated_at", &at.to_string());

        if !updated {
            return Err(UpliftError::TomlParsing(format!(
                "Installed entry for '{id}' is not a table"
            )));
        }

        debug!("Recorded {} -> {}", id, version);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<InstalledSnapshot> {
        self.packages().map(InstalledSnapshot::new)
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.doc.to_string()).map_err(|e| {
            UpliftError::TomlParsing(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// Read-only copy of the installed packages, taken before a run.
#[derive(Debug, Clone, Default)]
pub struct InstalledSnapshot {
    packages: Vec<InstalledPackage>,
}

impl InstalledSnapshot {
    pub fn new(packages: Vec<InstalledPackage>) -> Self {
        Self { packages }
    }

    pub fn packages(&self) -> &[InstalledPackage] {
        &self.packages
    }
}

impl InstalledDiscovery for InstalledSnapshot {
    fn installed_version(&self, package: &dyn AvailablePackage) -> Result<InstalledPackage> {
        self.packages
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(package.id()))
            .cloned()
            .ok_or_else(|| UpliftError::NotInstalled(package.id().to_string()))
    }
}

impl InstalledDiscovery for InstalledState {
    fn installed_version(&self, package: &dyn AvailablePackage) -> Result<InstalledPackage> {
        self.find(package.id())?
            .ok_or_else(|| UpliftError::NotInstalled(package.id().to_string()))
    }
}
