use crate::agents::update::work_unit::PackageWorkUnit;
use crate::catalog::manifest::{InapplicabilityReason, Installer, Manifest};
use crate::catalog::VersionKey;
use crate::error::{ErrorCode, Result};
use crate::installed::InstalledPackage;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

pub mod factory;
pub use factory::{RepositoryFactory, Workspace};

/// A package as published by a catalog source.
pub trait AvailablePackage: Send + Sync {
    fn id(&self) -> &str;

    fn source_identifier(&self) -> &str;

    /// Available versions, newest first. Callers rely on this order.
    fn available_version_keys(&self) -> &[VersionKey];

    fn manifest(&self, key: &VersionKey) -> Result<Manifest>;
}

/// One entry of a catalog search result.
#[derive(Clone)]
pub struct CatalogMatch {
    pub package: Arc<dyn AvailablePackage>,
}

impl CatalogMatch {
    pub fn new(package: Arc<dyn AvailablePackage>) -> Self {
        Self { package }
    }
}

/// Finds the installed counterpart of a catalog package.
pub trait InstalledDiscovery {
    /// Fails with `UpliftError::NotInstalled` when nothing is installed.
    fn installed_version(&self, package: &dyn AvailablePackage) -> Result<InstalledPackage>;
}

/// Outcome of installer selection for one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallerSelection {
    pub installer: Option<Installer>,
    /// One reason set per rejected installer.
    pub inapplicabilities: Vec<BTreeSet<InapplicabilityReason>>,
}

pub trait InstallerSelector {
    fn select(&self, manifest: &Manifest) -> InstallerSelection;
}

/// Builds an installer selector bound to an installed package's environment.
pub trait SelectorFactory {
    fn selector_for<'a>(
        &'a self,
        installed: &'a InstalledPackage,
    ) -> Box<dyn InstallerSelector + 'a>;
}

/// Policy handed to the downstream installer with a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPolicy {
    pub report_dependencies: bool,
    pub failure_code: ErrorCode,
    pub ignorable_codes: Vec<ErrorCode>,
}

impl InstallPolicy {
    pub fn is_ignorable(&self, code: ErrorCode) -> bool {
        self.ignorable_codes.contains(&code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedUpdate {
    pub package_id: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    pub applied: Vec<AppliedUpdate>,
    pub skipped: Vec<String>,
}

/// Receives the deduplicated work set of a batch.
pub trait BatchInstaller {
    fn install_multiple(
        &mut self,
        units: Vec<PackageWorkUnit>,
        policy: &InstallPolicy,
    ) -> Result<InstallSummary>;
}
