use crate::agents::update::applicability::is_update_version_applicable;
use crate::agents::update::reporter::{Diagnostic, Reporter};
use crate::catalog::manifest::{InapplicabilityReason, Installer, Manifest};
use crate::catalog::{Version, VersionKey};
use crate::error::{Result, UpliftError};
use crate::installed::InstalledPackage;
use crate::repository::{AvailablePackage, InstallerSelector};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Why resolution found nothing to update to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    NoneApplicable,
    InstalledTypeOnly,
}

impl NotFoundReason {
    pub fn diagnostic(self) -> Diagnostic {
        match self {
            NotFoundReason::NoneApplicable => Diagnostic::UpdateNotApplicable,
            NotFoundReason::InstalledTypeOnly => Diagnostic::DifferentInstallTechnology,
        }
    }
}

/// The version an update resolved to, with its chosen installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUpdate {
    pub manifest: Manifest,
    pub version: VersionKey,
    pub source_identifier: String,
    pub installer: Installer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Found(ResolvedUpdate),
    NotFound(NotFoundReason),
}

/// Latches once a manifest was rejected purely for its install technology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstalledTypeLatch(bool);

impl InstalledTypeLatch {
    /// Folds one manifest's rejection sets into the latch. Never unlatches.
    pub fn observe(self, inapplicabilities: &[BTreeSet<InapplicabilityReason>]) -> Self {
        Self(self.0 || only_installed_type(inapplicabilities))
    }

    pub fn is_set(self) -> bool {
        self.0
    }

    pub fn reason(self) -> NotFoundReason {
        if self.is_set() {
            NotFoundReason::InstalledTypeOnly
        } else {
            NotFoundReason::NoneApplicable
        }
    }
}

/// True when there is at least one reason and every reason is an installed-type mismatch.
fn only_installed_type(inapplicabilities: &[BTreeSet<InapplicabilityReason>]) -> bool {
    let mut reasons = inapplicabilities.iter().flatten().peekable();
    reasons.peek().is_some()
        && reasons.all(|reason| *reason == InapplicabilityReason::InstalledType)
}

/// Finds the newest available version that is an update and has a usable installer.
pub struct UpdateCandidateResolver<'a> {
    selector: &'a dyn InstallerSelector,
}

impl<'a> UpdateCandidateResolver<'a> {
    pub fn new(selector: &'a dyn InstallerSelector) -> Self {
        Self { selector }
    }

    /// Walks the package's version keys, which must be sorted newest first.
    ///
    /// The walk stops at the first key that is not an update, since every key after
    /// it is equal or older. The first applicable key with an installer wins.
    pub fn resolve(
        &self,
        package: &dyn AvailablePackage,
        installed_version: &Version,
    ) -> Result<ResolutionOutcome> {
        let mut latch = InstalledTypeLatch::default();

        for key in package.available_version_keys() {
            let candidate = key.parsed_version();
            if !is_update_version_applicable(installed_version, &candidate) {
                debug!(
                    "{} {} is not newer than installed {}, stopping",
                    package.id(),
                    candidate,
                    installed_version
                );
                break;
            }

            let mut manifest = package.manifest(key)?;
            let selection = self.selector.select(&manifest);

            let Some(installer) = selection.installer else {
                debug!(
                    "{} {} has no applicable installer",
                    package.id(),
                    candidate
                );
                latch = latch.observe(&selection.inapplicabilities);
                continue;
            };

            manifest.apply_locale(installer.locale.as_deref());
            return Ok(ResolutionOutcome::Found(ResolvedUpdate {
                manifest,
                version: key.clone(),
                source_identifier: package.source_identifier().to_string(),
                installer,
            }));
        }

        Ok(ResolutionOutcome::NotFound(latch.reason()))
    }
}

/// Single-package entry point: resolves or terminates with `UpdateNotApplicable`.
///
/// `report_not_found` controls whether the reason-specific message is emitted.
pub fn select_latest_applicable_update(
    package: &dyn AvailablePackage,
    installed: &InstalledPackage,
    selector: &dyn InstallerSelector,
    reporter: &dyn Reporter,
    report_not_found: bool,
) -> Result<ResolvedUpdate> {
    let installed_version = Version::parse(&installed.version);

    match UpdateCandidateResolver::new(selector).resolve(package, &installed_version)? {
        ResolutionOutcome::Found(update) => Ok(update),
        ResolutionOutcome::NotFound(reason) => {
            if report_not_found {
                reporter.diagnostic(reason.diagnostic());
            }
            Err(UpliftError::UpdateNotApplicable(package.id().to_string()))
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::catalog::manifest::{Architecture, InstallerType};
    use crate::repository::InstallerSelection;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory package that records which manifests were requested.
    pub struct StubPackage {
        pub id: String,
        pub source: String,
        pub keys: Vec<VersionKey>,
        pub requested: std::sync::Mutex<Vec<String>>,
    }

    impl StubPackage {
        pub fn new(id: &str, source: &str, versions: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                source: source.to_string(),
                keys: versions.iter().map(|v| VersionKey::new(*v, "")).collect(),
                requested: Default::default(),
            }
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl AvailablePackage for StubPackage {
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
            self.requested.lock().unwrap().push(key.version.clone());
            Ok(Manifest {
                id: self.id.clone(),
                name: self.id.clone(),
                publisher: None,
                version: key.version.clone(),
                channel: key.channel.clone(),
                installers: Vec::new(),
                dependencies: Vec::new(),
                localizations: Vec::new(),
                locale: None,
            })
        }
    }

    pub fn installer(locale: Option<&str>) -> Installer {
        Installer {
            installer_type: InstallerType::Msi,
            architecture: Architecture::X64,
            locale: locale.map(str::to_string),
            scope: None,
            url: "https://example.invalid/setup.msi".to_string(),
        }
    }

    /// Selector scripted per manifest version; unscripted versions get an installer.
    #[derive(Default)]
    pub struct ScriptedSelector {
        pub rejections: HashMap<String, Vec<BTreeSet<InapplicabilityReason>>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl ScriptedSelector {
        pub fn reject(mut self, version: &str, reasons: &[&[InapplicabilityReason]]) -> Self {
            self.rejections.insert(
                version.to_string(),
                reasons
                    .iter()
                    .map(|set| set.iter().copied().collect())
                    .collect(),
            );
            self
        }
    }

    impl InstallerSelector for ScriptedSelector {
        fn select(&self, manifest: &Manifest) -> InstallerSelection {
            self.calls.borrow_mut().push(manifest.version.clone());
            match self.rejections.get(&manifest.version) {
                Some(reasons) => InstallerSelection {
                    installer: None,
                    inapplicabilities: reasons.clone(),
                },
                None => InstallerSelection {
                    installer: Some(installer(None)),
                    inapplicabilities: Vec::new(),
                },
            }
        }
    }

    pub fn installed(id: &str, version: &str) -> InstalledPackage {
        InstalledPackage {
            id: id.to_string(),
            version: version.to_string(),
            installer_type: InstallerType::Msi,
            architecture: Architecture::X64,
            scope: None,
            source: None,
        }
    }
}
