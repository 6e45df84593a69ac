use crate::agents::update::applicability::is_update_version_applicable;
use crate::agents::update::reporter::Reporter;
use crate::agents::update::work_unit::PackageWorkUnit;
use crate::catalog::Version;
use crate::error::{Result, UpliftError};
use crate::installed::InstalledState;
use crate::repository::{AppliedUpdate, BatchInstaller, InstallPolicy, InstallSummary};
use jiff::Timestamp;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Union of the dependencies declared by `units`, sorted.
pub fn required_dependencies(units: &[PackageWorkUnit]) -> Vec<String> {
    units
        .iter()
        .flat_map(|unit| unit.manifest().dependencies.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn report_dependencies(units: &[PackageWorkUnit], reporter: &dyn Reporter) {
    let dependencies = required_dependencies(units);
    if dependencies.is_empty() {
        return;
    }

    reporter.info("This operation requires the following dependencies:");
    for dependency in dependencies {
        reporter.info(&format!("  - {dependency}"));
    }
}

/// Applies work units by rewriting the installed-state file.
pub struct StateFileInstaller<'a> {
    state: &'a mut InstalledState,
    reporter: &'a dyn Reporter,
}

impl<'a> StateFileInstaller<'a> {
    pub fn new(state: &'a mut InstalledState, reporter: &'a dyn Reporter) -> Self {
        Self { state, reporter }
    }

    /// Installs a single unit and saves immediately.
    pub fn install(&mut self, unit: &PackageWorkUnit) -> Result<AppliedUpdate> {
        let applied = self.apply(unit)?;
        self.state.save()?;
        Ok(applied)
    }

    fn apply(&mut self, unit: &PackageWorkUnit) -> Result<AppliedUpdate> {
        let id = unit.package_id();

        // The state file may have moved on since the unit was resolved.
        let current = self
            .state
            .find(id)?
            .ok_or_else(|| UpliftError::UpdateNotApplicable(id.to_string()))?;
        if !is_update_version_applicable(
            &Version::parse(&current.version),
            &unit.version().parsed_version(),
        ) {
            return Err(UpliftError::UpdateNotApplicable(id.to_string()));
        }

        self.state
            .record_update(
                id,
                &unit.version().version,
                unit.installer().installer_type,
                Timestamp::now(),
            )
            .map_err(|e| UpliftError::Install {
                package_id: id.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            "[{}] {} {} -> {} via {}",
            unit.correlation_id(),
            id,
            current.version,
            unit.version().version,
            unit.installer().url
        );

        Ok(AppliedUpdate {
            package_id: id.to_string(),
            from: current.version,
            to: unit.version().version.clone(),
        })
    }
}

impl BatchInstaller for StateFileInstaller<'_> {
    fn install_multiple(
        &mut self,
        units: Vec<PackageWorkUnit>,
        policy: &InstallPolicy,
    ) -> Result<InstallSummary> {
        if policy.report_dependencies {
            report_dependencies(&units, self.reporter);
        }

        let mut summary = InstallSummary::default();
        let mut failed = 0;

        for unit in &units {
            match self.apply(unit) {
                Ok(applied) => summary.applied.push(applied),
                Err(err) if policy.is_ignorable(err.code()) => {
                    summary.skipped.push(unit.package_id().to_string());
                }
                Err(err) => {
                    warn!("[{}] {}", unit.correlation_id(), err);
                    self.reporter
                        .info(&format!("Failed to update {}: {}", unit.package_id(), err));
                    failed += 1;
                }
            }
        }

        if !summary.applied.is_empty() {
            self.state.save()?;
        }

        if failed > 0 {
            return Err(UpliftError::BatchFailure {
                code: policy.failure_code,
                failed,
            });
        }

        Ok(summary)
    }
}

/// Records what would be installed without touching anything.
#[derive(Debug, Default)]
pub struct PlanningInstaller {
    planned: Vec<PackageWorkUnit>,
    dependencies: Vec<String>,
}

impl PlanningInstaller {
    pub fn planned(&self) -> &[PackageWorkUnit] {
        &self.planned
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl BatchInstaller for PlanningInstaller {
    fn install_multiple(
        &mut self,
        units: Vec<PackageWorkUnit>,
        policy: &InstallPolicy,
    ) -> Result<InstallSummary> {
        if policy.report_dependencies {
            self.dependencies = required_dependencies(&units);
        }

        let applied = units
            .iter()
            .map(|unit| AppliedUpdate {
                package_id: unit.package_id().to_string(),
                from: unit.installed().version.clone(),
                to: unit.version().version.clone(),
            })
            .collect();
        self.planned = units;

        Ok(InstallSummary {
            applied,
            skipped: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::update::batch::BatchUpdateOrchestrator;
    use crate::agents::update::reporter::testing::RecordingReporter;
    use crate::agents::update::resolver::fixtures::{installed, installer};
    use crate::agents::update::resolver::ResolvedUpdate;
    use crate::agents::update::work_unit::SubExecutionId;
    use crate::catalog::manifest::InstallerType;
    use crate::catalog::{Manifest, VersionKey};
    use crate::error::ErrorCode;
    use std::fs;
    use tempfile::tempdir;

    const STATE: &str = r#"[packages.A]
version = "1.0"
installer_type = "msi"

[packages.B]
version = "2.0"
installer_type = "msi"
"#;

    fn unit(id: &str, from: &str, to: &str, dependencies: &[&str]) -> PackageWorkUnit {
        PackageWorkUnit::new(
            ResolvedUpdate {
                manifest: Manifest {
                    id: id.to_string(),
                    name: id.to_string(),
                    publisher: None,
                    version: to.to_string(),
                    channel: String::new(),
                    installers: Vec::new(),
                    dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
                    localizations: Vec::new(),
                    locale: None,
                },
                version: VersionKey::new(to, ""),
                source_identifier: "s".to_string(),
                installer: installer(None),
            },
            installed(id, from),
            SubExecutionId::next(),
        )
    }

    fn state_in(dir: &tempfile::TempDir) -> InstalledState {
        let path = dir.path().join("installed.toml");
        fs::write(&path, STATE).unwrap();
        InstalledState::load(path).unwrap()
    }

    #[test]
    fn dependencies_are_unioned_and_sorted() {
        let units = [
            unit("A", "1.0", "2.0", &["Runtime", "Fonts"]),
            unit("B", "2.0", "3.0", &["Fonts"]),
        ];
        assert_eq!(required_dependencies(&units), ["Fonts", "Runtime"]);
    }

    #[test]
    fn applies_units_and_saves_once() {
        let dir = tempdir().unwrap();
        let mut state = state_in(&dir);
        let reporter = RecordingReporter::default();

        let summary = StateFileInstaller::new(&mut state, &reporter)
            .install_multiple(
                vec![unit("A", "1.0", "1.5", &["Runtime"]), unit("B", "2.0", "3.0", &[])],
                &BatchUpdateOrchestrator::install_policy(),
            )
            .unwrap();

        assert_eq!(summary.applied.len(), 2);
        assert!(summary.skipped.is_empty());
        assert_eq!(reporter.messages()[1], "  - Runtime");

        let reloaded = InstalledState::load(dir.path().join("installed.toml")).unwrap();
        assert_eq!(reloaded.find("A").unwrap().unwrap().version, "1.5");
        assert_eq!(reloaded.find("B").unwrap().unwrap().version, "3.0");
        let written = fs::read_to_string(dir.path().join("installed.toml")).unwrap();
        assert!(written.contains("updated_at"));
    }

    #[test]
    fn stale_unit_is_skipped_under_batch_policy() {
        let dir = tempdir().unwrap();
        let mut state = state_in(&dir);
        let reporter = RecordingReporter::default();

        let summary = StateFileInstaller::new(&mut state, &reporter)
            .install_multiple(
                vec![unit("A", "1.0", "2.0", &[]), unit("B", "1.0", "2.0", &[])],
                &BatchUpdateOrchestrator::install_policy(),
            )
            .unwrap();

        assert_eq!(summary.applied.len(), 1);
        assert_eq!(summary.skipped, ["B"]);
        assert!(reporter.messages().is_empty());
    }

    #[test]
    fn non_ignorable_failure_uses_policy_code() {
        let dir = tempdir().unwrap();
        let mut state = state_in(&dir);
        let reporter = RecordingReporter::default();
        let policy = InstallPolicy {
            report_dependencies: false,
            failure_code: ErrorCode::UpdateAllHasFailure,
            ignorable_codes: Vec::new(),
        };

        let err = StateFileInstaller::new(&mut state, &reporter)
            .install_multiple(
                vec![unit("A", "1.0", "2.0", &[]), unit("Missing", "1.0", "2.0", &[])],
                &policy,
            )
            .unwrap_err();

        assert!(matches!(err, UpliftError::BatchFailure { failed: 1, .. }));
        assert_eq!(err.code(), ErrorCode::UpdateAllHasFailure);

        // The successful unit is still persisted.
        let reloaded = InstalledState::load(dir.path().join("installed.toml")).unwrap();
        assert_eq!(reloaded.find("A").unwrap().unwrap().version, "2.0");
    }

    #[test]
    fn single_install_surfaces_guard_error() {
        let dir = tempdir().unwrap();
        let mut state = state_in(&dir);
        let reporter = RecordingReporter::default();

        let err = StateFileInstaller::new(&mut state, &reporter)
            .install(&unit("B", "1.0", "2.0", &[]))
            .unwrap_err();
        assert!(err.is_update_not_applicable());

        let applied = StateFileInstaller::new(&mut state, &reporter)
            .install(&unit("B", "2.0", "2.1", &[]))
            .unwrap();
        assert_eq!(applied.from, "2.0");
        assert_eq!(
            state.find("B").unwrap().unwrap().installer_type,
            InstallerType::Msi
        );
    }

    #[test]
    fn planning_changes_nothing() {
        let mut planner = PlanningInstaller::default();
        let summary = planner
            .install_multiple(
                vec![unit("A", "1.0", "2.0", &["Runtime"])],
                &BatchUpdateOrchestrator::install_policy(),
            )
            .unwrap();

        assert_eq!(summary.applied[0].from, "1.0");
        assert_eq!(planner.planned().len(), 1);
        assert_eq!(planner.dependencies(), ["Runtime"]);
    }
}
