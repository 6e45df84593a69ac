pub mod manifest;
pub mod version;

pub use manifest::Manifest;
pub use version::Version;

use crate::error::{Result, UpliftError};
use crate::installed::InstalledPackage;
use crate::repository::{AvailablePackage, CatalogMatch};
use crate::utils::pattern::PatternMatcher;
use manifest::{Installer, Localization};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_SOURCE: &str = "default";

/// Identifies one available version within a package's catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionKey {
    pub version: String,
    pub channel: String,
}

impl VersionKey {
    pub fn new(version: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            channel: channel.into(),
        }
    }

    pub fn parsed_version(&self) -> Version {
        Version::parse(&self.version)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "package")]
    packages: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, rename = "version")]
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct VersionEntry {
    version: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "installer")]
    installers: Vec<Installer>,
    #[serde(default, rename = "localization")]
    localizations: Vec<Localization>,
}

/// A package entry loaded from `catalog.toml`, versions sorted newest first.
#[derive(Debug)]
pub struct CatalogPackage {
    id: String,
    name: String,
    publisher: Option<String>,
    source: String,
    keys: Vec<VersionKey>,
    versions: Vec<VersionEntry>,
}

impl CatalogPackage {
    fn from_entry(entry: PackageEntry) -> Result<Self> {
        let mut versions = entry.versions;
        versions.sort_by(|a, b| Version::parse(&b.version).cmp(&Version::parse(&a.version)));

        // Equal versions are adjacent after the sort, but their channels may interleave.
        let same_version = |a: &VersionEntry, b: &VersionEntry| {
            Version::parse(&a.version) == Version::parse(&b.version)
        };
        for run in versions.chunk_by(same_version) {
            let mut channels = HashSet::new();
            if let Some(dup) = run.iter().find(|v| !channels.insert(v.channel.as_str())) {
                return Err(UpliftError::Workspace(format!(
                    "Package '{}' lists version '{}' more than once",
                    entry.id, dup.version
                )));
            }
        }

        let keys = versions
            .iter()
            .map(|v| VersionKey::new(v.version.as_str(), v.channel.as_str()))
            .collect();

        Ok(Self {
            name: entry.name.unwrap_or_else(|| entry.id.clone()),
            id: entry.id,
            publisher: entry.publisher,
            source: entry.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            keys,
            versions,
        })
    }
}

impl AvailablePackage for CatalogPackage {
    fn id(&self) -> &str {
        &self.id
    }

    fn source_identifier(&self) -> &str {
        &self.source
    }

    fn available_version_keys(&self) -> &[VersionKey] {
        &self.keys
    }

    fn manifest(&self, key: &VersionKey) -> Result<Manifest> {
        let entry = self
            .versions
            .iter()
            .find(|v| v.version == key.version && v.channel == key.channel)
            .ok_or_else(|| UpliftError::VersionNotFound {
                package_id: self.id.clone(),
                version: key.version.clone(),
            })?;

        Ok(Manifest {
            id: self.id.clone(),
            name: self.name.clone(),
            publisher: self.publisher.clone(),
            version: entry.version.clone(),
            channel: entry.channel.clone(),
            installers: entry.installers.clone(),
            dependencies: entry.dependencies.clone(),
            localizations: entry.localizations.clone(),
            locale: None,
        })
    }
}

/// All packages known to the workspace catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    packages: Vec<Arc<CatalogPackage>>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UpliftError::TomlParsing(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let packages = file
            .packages
            .into_iter()
            .map(|entry| CatalogPackage::from_entry(entry).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} catalog packages", packages.len());
        Ok(Self { packages })
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Finds a package by case-insensitive id, optionally restricted to one source.
    pub fn find(&self, id: &str, source: Option<&str>) -> Option<Arc<CatalogPackage>> {
        self.packages
            .iter()
            .find(|p| {
                p.id.eq_ignore_ascii_case(id)
                    && source.is_none_or(|s| p.source.eq_ignore_ascii_case(s))
            })
            .cloned()
    }

    /// Builds the match set for the given installed packages, in their order.
    pub fn matches_for_installed(
        &self,
        installed: &[InstalledPackage],
        filter: Option<&PatternMatcher>,
    ) -> Vec<CatalogMatch> {
        installed
            .iter()
            .filter(|pkg| filter.is_none_or(|m| m.matches(&pkg.id)))
            .filter_map(|pkg| {
                let found = self.find(&pkg.id, pkg.source.as_deref());
                if found.is_none() {
                    debug!("No catalog entry for installed package {}", pkg.id);
                }
                found
            })
            .map(|package| CatalogMatch::new(package as Arc<dyn AvailablePackage>))
            .collect()
    }
}
