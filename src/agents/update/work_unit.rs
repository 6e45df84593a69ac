use crate::agents::update::resolver::ResolvedUpdate;
use crate::catalog::manifest::{Installer, Manifest};
use crate::catalog::VersionKey;
use crate::installed::InstalledPackage;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

static NEXT_SUB_EXECUTION_ID: AtomicU32 = AtomicU32::new(1);

/// Correlation id tagging one per-package sub-operation in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SubExecutionId(u32);

impl SubExecutionId {
    /// Process-unique and increasing.
    pub fn next() -> Self {
        Self(NEXT_SUB_EXECUTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One package fully resolved and queued for installation.
#[derive(Debug, Clone, Serialize)]
pub struct PackageWorkUnit {
    manifest: Manifest,
    version: VersionKey,
    source_identifier: String,
    installed: InstalledPackage,
    installer: Installer,
    correlation_id: SubExecutionId,
}

impl PackageWorkUnit {
    pub fn new(
        update: ResolvedUpdate,
        installed: InstalledPackage,
        correlation_id: SubExecutionId,
    ) -> Self {
        Self {
            manifest: update.manifest,
            version: update.version,
            source_identifier: update.source_identifier,
            installed,
            installer: update.installer,
            correlation_id,
        }
    }

    pub fn package_id(&self) -> &str {
        &self.manifest.id
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn version(&self) -> &VersionKey {
        &self.version
    }

    pub fn source_identifier(&self) -> &str {
        &self.source_identifier
    }

    pub fn installed(&self) -> &InstalledPackage {
        &self.installed
    }

    pub fn installer(&self) -> &Installer {
        &self.installer
    }

    pub fn correlation_id(&self) -> SubExecutionId {
        self.correlation_id
    }

    /// Two units describe the same install when id, version and source all match.
    pub fn same_target(&self, other: &PackageWorkUnit) -> bool {
        self.manifest.id == other.manifest.id
            && self.version == other.version
            && self.source_identifier == other.source_identifier
    }
}

/// Appends `unit` unless an entry with the same target is already present.
///
/// Returns whether the unit was admitted. Existing entries are never reordered.
pub fn add_if_absent(units: &mut Vec<PackageWorkUnit>, unit: PackageWorkUnit) -> bool {
    if let Some(existing) = units.iter().find(|u| u.same_target(&unit)) {
        debug!(
            "Dropping duplicate {} {} from {} ({} already queued as {})",
            unit.package_id(),
            unit.version.version,
            unit.source_identifier,
            unit.correlation_id,
            existing.correlation_id
        );
        return false;
    }

    units.push(unit);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::update::resolver::fixtures::{installed, installer};

    fn unit(id: &str, version: &str, source: &str) -> PackageWorkUnit {
        let manifest = Manifest {
            id: id.to_string(),
            name: id.to_string(),
            publisher: None,
            version: version.to_string(),
            channel: String::new(),
            installers: vec![installer(None)],
            dependencies: Vec::new(),
            localizations: Vec::new(),
            locale: None,
        };
        PackageWorkUnit::new(
            ResolvedUpdate {
                manifest,
                version: VersionKey::new(version, ""),
                source_identifier: source.to_string(),
                installer: installer(None),
            },
            installed(id, "1.0"),
            SubExecutionId::next(),
        )
    }

    #[test]
    fn ids_increase() {
        let a = SubExecutionId::next();
        let b = SubExecutionId::next();
        assert!(b > a);
        assert!(a.0 >= 1);
    }

    #[test]
    fn same_target_keeps_first_unit() {
        let mut units = Vec::new();
        let first = unit("P", "2.0", "community");
        let first_id = first.correlation_id();

        assert!(add_if_absent(&mut units, first));
        assert!(!add_if_absent(&mut units, unit("P", "2.0", "community")));

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].correlation_id(), first_id);
    }

    #[test]
    fn any_differing_key_part_is_admitted() {
        let mut units = Vec::new();
        assert!(add_if_absent(&mut units, unit("P", "2.0", "community")));
        assert!(add_if_absent(&mut units, unit("Q", "2.0", "community")));
        assert!(add_if_absent(&mut units, unit("P", "3.0", "community")));
        assert!(add_if_absent(&mut units, unit("P", "2.0", "store")));

        let order: Vec<_> = units
            .iter()
            .map(|u| (u.package_id(), u.version().version.as_str(), u.source_identifier()))
            .collect();
        assert_eq!(
            order,
            [
                ("P", "2.0", "community"),
                ("Q", "2.0", "community"),
                ("P", "3.0", "community"),
                ("P", "2.0", "store"),
            ]
        );
    }

    #[test]
    fn repeated_adds_do_not_reorder() {
        let mut units = Vec::new();
        add_if_absent(&mut units, unit("A", "1.1", "s"));
        add_if_absent(&mut units, unit("B", "1.1", "s"));
        add_if_absent(&mut units, unit("A", "1.1", "s"));
        add_if_absent(&mut units, unit("B", "1.1", "s"));

        let ids: Vec<_> = units.iter().map(PackageWorkUnit::package_id).collect();
        assert_eq!(ids, ["A", "B"]);
    }

    #[test]
    fn serializes_correlation_id_as_number() {
        let value = serde_json::to_value(unit("P", "2.0", "s")).unwrap();
        assert!(value["correlation_id"].is_u64());
        assert_eq!(value["version"]["version"], "2.0");
    }
}
