use crate::agents::update::reporter::Reporter;
use crate::agents::update::resolver::select_latest_applicable_update;
use crate::agents::update::work_unit::{PackageWorkUnit, SubExecutionId};
use crate::error::Result;
use crate::installed::InstalledPackage;
use crate::repository::{AvailablePackage, InstalledDiscovery, SelectorFactory};
use tracing::debug;

/// Collaborators shared by every per-package resolution.
///
/// Holds no per-package state; each package gets its own [`UpdateScope`].
#[derive(Clone, Copy)]
pub struct UpdateContext<'a> {
    pub discovery: &'a dyn InstalledDiscovery,
    pub selectors: &'a dyn SelectorFactory,
    pub reporter: &'a dyn Reporter,
}

impl<'a> UpdateContext<'a> {
    pub fn new(
        discovery: &'a dyn InstalledDiscovery,
        selectors: &'a dyn SelectorFactory,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            discovery,
            selectors,
            reporter,
        }
    }

    /// Opens a fresh scope for one package.
    pub fn scope<'p>(
        &self,
        package: &'p dyn AvailablePackage,
        correlation_id: SubExecutionId,
    ) -> UpdateScope<'p>
    where
        'a: 'p,
    {
        UpdateScope {
            context: *self,
            package,
            correlation_id,
        }
    }
}

/// State for resolving a single package. Dropped after use, so nothing leaks
/// into the next package's resolution.
pub struct UpdateScope<'a> {
    context: UpdateContext<'a>,
    package: &'a dyn AvailablePackage,
    correlation_id: SubExecutionId,
}

impl UpdateScope<'_> {
    fn discover_installed(&self) -> Result<InstalledPackage> {
        let installed = self.context.discovery.installed_version(self.package)?;
        debug!(
            "{} is installed at {} ({})",
            installed.id, installed.version, installed.installer_type
        );
        Ok(installed)
    }

    /// Runs discovery then resolution, consuming the scope.
    pub fn resolve(self, report_not_found: bool) -> Result<PackageWorkUnit> {
        let installed = self.discover_installed()?;

        let update = {
            let selector = self.context.selectors.selector_for(&installed);
            select_latest_applicable_update(
                self.package,
                &installed,
                selector.as_ref(),
                self.context.reporter,
                report_not_found,
            )?
        };

        Ok(PackageWorkUnit::new(update, installed, self.correlation_id))
    }
}
