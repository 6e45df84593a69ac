use crate::agents::package_installer::{PlanningInstaller, StateFileInstaller};
use crate::agents::update::resolver::{InstalledTypeLatch, ResolvedUpdate};
use crate::agents::update::{
    ensure_update_version_applicable, BatchUpdateOrchestrator, ConsoleReporter, PackageWorkUnit,
    Reporter, SubExecutionId, UpdateContext,
};
use crate::agents::WorkspaceScannerAgent;
use crate::catalog::{CatalogPackage, Version};
use crate::error::{Result, UpliftError};
use crate::repository::{
    AvailablePackage, InstallSummary, InstalledDiscovery, RepositoryFactory, SelectorFactory,
    Workspace,
};
use crate::utils::pattern::PatternMatcher;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

fn open_workspace(path: &Path, quiet: bool) -> Result<Workspace> {
    if !quiet {
        println!("\n{}", "1. Validating workspace...".yellow());
    }
    let info = WorkspaceScannerAgent::new(path).validate()?;
    let workspace = RepositoryFactory::open(info)?;
    if !quiet {
        println!(
            "{}",
            format!(
                "✓ Workspace {} is valid ({} catalog package(s))",
                workspace.info.root.display(),
                workspace.catalog.len()
            )
            .green()
        );
    }
    Ok(workspace)
}

/// Looks the package up in the catalog, preferring the source it was installed from.
fn find_package(workspace: &Workspace, id: &str) -> Result<Arc<CatalogPackage>> {
    let source = workspace.installed.find(id)?.and_then(|p| p.source);
    workspace
        .catalog
        .find(id, source.as_deref())
        .ok_or_else(|| UpliftError::PackageNotFound(id.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_unit(unit: &PackageWorkUnit) {
    let installer = unit.installer();
    println!(
        "   • {} {} → {} ({}, {})",
        unit.package_id().bright_cyan(),
        unit.installed().version.dimmed(),
        unit.version().version.green(),
        installer.installer_type,
        installer.architecture
    );
}

fn print_summary(summary: &InstallSummary) {
    println!("\n{}", "Update Summary:".cyan().bold());
    for applied in &summary.applied {
        println!(
            "   {} {}: {} → {}",
            "✓".green(),
            applied.package_id,
            applied.from.dimmed(),
            applied.to.green()
        );
    }
    for skipped in &summary.skipped {
        println!("   {} {} (skipped)", "-".yellow(), skipped);
    }
}

/// Checks one package for an applicable update without installing it
pub fn execute_check<P: AsRef<Path>>(path: P, id: &str, json: bool) -> Result<()> {
    if !json {
        println!("{}", format!("Checking {id} for updates...").cyan().bold());
    }

    let workspace = open_workspace(path.as_ref(), json)?;
    let package = find_package(&workspace, id)?;
    let reporter = ConsoleReporter::new(json);

    if !json {
        println!("\n{}", "2. Resolving applicable update...".yellow());
    }
    let context = UpdateContext::new(&workspace.installed, &workspace.preferences, &reporter);
    let unit = context
        .scope(package.as_ref(), SubExecutionId::next())
        .resolve(true)?;

    if json {
        return print_json(&unit);
    }

    println!("{}", "✓ Update available".green());
    print_unit(&unit);
    println!("\n{}", "To apply this update, run:".dimmed());
    println!("  {}", format!("uplift upgrade {}", unit.package_id()).cyan());
    Ok(())
}

/// Upgrades one package, to the newest applicable version or to `version`
pub fn execute_upgrade<P: AsRef<Path>>(path: P, id: &str, version: Option<&str>) -> Result<()> {
    println!("{}", format!("Upgrading {id}...").cyan().bold());

    let mut workspace = open_workspace(path.as_ref(), false)?;
    let package = find_package(&workspace, id)?;
    let reporter = ConsoleReporter::new(false);

    println!("\n{}", "2. Resolving target version...".yellow());
    let unit = match version {
        Some(version) => pinned_unit(&workspace, package.as_ref(), version, &reporter)?,
        None => UpdateContext::new(&workspace.installed, &workspace.preferences, &reporter)
            .scope(package.as_ref(), SubExecutionId::next())
            .resolve(true)?,
    };
    print_unit(&unit);

    println!("\n{}", "3. Installing...".yellow());
    let applied = StateFileInstaller::new(&mut workspace.installed, &reporter).install(&unit)?;
    println!(
        "{}",
        format!(
            "✓ {} upgraded from {} to {}",
            applied.package_id, applied.from, applied.to
        )
        .green()
    );
    Ok(())
}

/// Builds a work unit for an explicitly requested version.
fn pinned_unit(
    workspace: &Workspace,
    package: &dyn AvailablePackage,
    version: &str,
    reporter: &dyn Reporter,
) -> Result<PackageWorkUnit> {
    let installed = workspace.installed.installed_version(package)?;
    let requested = Version::parse(version);
    let key = package
        .available_version_keys()
        .iter()
        .find(|key| key.parsed_version() == requested)
        .ok_or_else(|| UpliftError::VersionNotFound {
            package_id: package.id().to_string(),
            version: version.to_string(),
        })?;

    ensure_update_version_applicable(
        package.id(),
        &Version::parse(&installed.version),
        &key.parsed_version(),
        reporter,
    )?;

    let mut manifest = package.manifest(key)?;
    let selection = workspace
        .preferences
        .selector_for(&installed)
        .select(&manifest);
    let Some(installer) = selection.installer else {
        let latch = InstalledTypeLatch::default().observe(&selection.inapplicabilities);
        reporter.diagnostic(latch.reason().diagnostic());
        return Err(UpliftError::UpdateNotApplicable(package.id().to_string()));
    };
    manifest.apply_locale(installer.locale.as_deref());

    Ok(PackageWorkUnit::new(
        ResolvedUpdate {
            manifest,
            version: key.clone(),
            source_identifier: package.source_identifier().to_string(),
            installer,
        },
        installed,
        SubExecutionId::next(),
    ))
}

#[derive(Serialize)]
struct UpgradePlan<'a> {
    dry_run: bool,
    updates: &'a [PackageWorkUnit],
    dependencies: &'a [String],
}

/// Upgrades every installed package that has an applicable update
pub fn execute_upgrade_all<P: AsRef<Path>>(
    path: P,
    filter: Option<&str>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let quiet = json;
    if !quiet {
        println!("{}", "Starting batch upgrade...".cyan().bold());
    }

    let mut workspace = open_workspace(path.as_ref(), quiet)?;
    let matcher = filter.map(PatternMatcher::new).transpose()?;
    let snapshot = workspace.installed.snapshot()?;
    let matches = workspace
        .catalog
        .matches_for_installed(snapshot.packages(), matcher.as_ref());

    if !quiet {
        println!(
            "\n{}",
            format!("2. Resolving updates for {} package(s)...", matches.len()).yellow()
        );
    }

    let reporter = ConsoleReporter::new(quiet);
    let orchestrator =
        BatchUpdateOrchestrator::new(UpdateContext::new(&snapshot, &workspace.preferences, &reporter))
            .with_progress(!quiet && std::io::stderr().is_terminal());

    if dry_run {
        let mut planner = PlanningInstaller::default();
        let summary = orchestrator.update_all_applicable(&matches, &mut planner)?;

        if json {
            return print_json(&UpgradePlan {
                dry_run: true,
                updates: planner.planned(),
                dependencies: planner.dependencies(),
            });
        }
        if summary.is_some() {
            println!("\n{}", "Planned updates (dry run):".cyan().bold());
            planner.planned().iter().for_each(print_unit);
            if !planner.dependencies().is_empty() {
                println!("\n{}", "Required dependencies:".cyan());
                for dependency in planner.dependencies() {
                    println!("   • {dependency}");
                }
            }
        }
        return Ok(());
    }

    if !quiet {
        println!("\n{}", "3. Installing updates...".yellow());
    }
    let mut installer = StateFileInstaller::new(&mut workspace.installed, &reporter);
    let summary = orchestrator.update_all_applicable(&matches, &mut installer)?;

    match summary {
        Some(summary) if json => print_json(&summary),
        Some(summary) => {
            print_summary(&summary);
            println!("\n{}", "✨ Upgrade completed!".green().bold());
            Ok(())
        }
        None if json => print_json(&InstallSummary::default()),
        None => Ok(()),
    }
}

/// Lists installed packages with the update each would receive
pub fn execute_list<P: AsRef<Path>>(path: P) -> Result<()> {
    println!("{}", "Listing installed packages...".cyan().bold());

    let workspace = open_workspace(path.as_ref(), false)?;
    let snapshot = workspace.installed.snapshot()?;
    let matches = workspace.catalog.matches_for_installed(snapshot.packages(), None);

    println!("\n{}", "2. Resolving available updates...".yellow());
    let reporter = ConsoleReporter::new(true);
    let outcome =
        BatchUpdateOrchestrator::new(UpdateContext::new(&snapshot, &workspace.preferences, &reporter))
            .with_progress(std::io::stderr().is_terminal())
            .run_all(&matches)?;

    let available: HashMap<&str, &str> = outcome
        .work_units
        .iter()
        .map(|unit| (unit.package_id(), unit.version().version.as_str()))
        .collect();

    println!("\n{}", "📦 Installed packages:".cyan().bold());
    for pkg in snapshot.packages() {
        match available.get(pkg.id.as_str()) {
            Some(update) => println!(
                "  {} {} → {}",
                pkg.id.bright_cyan(),
                pkg.version,
                update.green()
            ),
            None => println!("  {} {}", pkg.id.bright_cyan(), pkg.version.dimmed()),
        }
    }

    println!("\n{}", "Summary:".cyan().bold());
    println!("  {} installed", snapshot.packages().len().to_string().yellow());
    println!("  {} upgradable", available.len().to_string().yellow());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::installed::InstalledState;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const CATALOG: &str = r#"
[[package]]
id = "Contoso.Editor"
source = "community"

[[package.version]]
version = "2.0"
dependencies = ["Contoso.Runtime"]
[[package.version.installer]]
type = "msix"
architecture = "neutral"
url = "https://example.invalid/editor-2.0.msix"

[[package.version]]
version = "1.5"
[[package.version.installer]]
type = "msi"
architecture = "neutral"
url = "https://example.invalid/editor-1.5.msi"

[[package]]
id = "Fabrikam.Shell"

[[package.version]]
version = "3.0"
[[package.version.installer]]
type = "msix"
architecture = "neutral"
url = "https://example.invalid/shell-3.0.msix"

[[package]]
id = "Northwind.Tools"

[[package.version]]
version = "1.0"
[[package.version.installer]]
type = "zip"
architecture = "neutral"
url = "https://example.invalid/tools-1.0.zip"
"#;

    const INSTALLED: &str = r#"[packages."Contoso.Editor"]
version = "1.0"
installer_type = "msi"
source = "community"

[packages."Fabrikam.Shell"]
version = "2.0"
installer_type = "exe"

[packages."Northwind.Tools"]
version = "1.0"
installer_type = "zip"
"#;

    fn workspace() -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("catalog.toml"), CATALOG).unwrap();
        fs::write(dir.path().join("installed.toml"), INSTALLED).unwrap();
        dir
    }

    fn installed_version(dir: &TempDir, id: &str) -> String {
        InstalledState::load(dir.path().join("installed.toml"))
            .unwrap()
            .find(id)
            .unwrap()
            .unwrap()
            .version
    }

    #[test]
    fn check_finds_compatible_older_update() {
        let dir = workspace();
        execute_check(dir.path(), "Contoso.Editor", true).unwrap();
    }

    #[test]
    fn check_terminates_when_only_other_technology_is_newer() {
        let dir = workspace();
        let err = execute_check(dir.path(), "Fabrikam.Shell", true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UpdateNotApplicable);
    }

    #[test]
    fn check_unknown_package() {
        let dir = workspace();
        let err = execute_check(dir.path(), "Nope", true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoApplicationsFound);
    }

    #[test]
    fn upgrade_installs_newest_applicable() {
        let dir = workspace();
        execute_upgrade(dir.path(), "Contoso.Editor", None).unwrap();
        assert_eq!(installed_version(&dir, "Contoso.Editor"), "1.5");
    }

    #[test]
    fn pinned_upgrade_guards_version_and_installer() {
        let dir = workspace();

        let err = execute_upgrade(dir.path(), "Northwind.Tools", Some("1.0")).unwrap_err();
        assert!(err.is_update_not_applicable());

        let err = execute_upgrade(dir.path(), "Contoso.Editor", Some("2.0")).unwrap_err();
        assert!(err.is_update_not_applicable());

        let err = execute_upgrade(dir.path(), "Contoso.Editor", Some("9.9")).unwrap_err();
        assert!(matches!(err, UpliftError::VersionNotFound { .. }));

        execute_upgrade(dir.path(), "Contoso.Editor", Some("1.5")).unwrap();
        assert_eq!(installed_version(&dir, "Contoso.Editor"), "1.5");
    }

    #[test]
    fn upgrade_all_skips_packages_without_updates() {
        let dir = workspace();
        execute_upgrade_all(dir.path(), None, false, true).unwrap();

        assert_eq!(installed_version(&dir, "Contoso.Editor"), "1.5");
        assert_eq!(installed_version(&dir, "Fabrikam.Shell"), "2.0");
        assert_eq!(installed_version(&dir, "Northwind.Tools"), "1.0");
    }

    #[test]
    fn dry_run_leaves_state_untouched() {
        let dir = workspace();
        execute_upgrade_all(dir.path(), Some("contoso"), true, true).unwrap();
        assert_eq!(installed_version(&dir, "Contoso.Editor"), "1.0");
    }

    #[test]
    fn list_does_not_modify_state() {
        let dir = workspace();
        let before = fs::read_to_string(dir.path().join("installed.toml")).unwrap();
        execute_list(dir.path()).unwrap();
        let after = fs::read_to_string(dir.path().join("installed.toml")).unwrap();
        assert_eq!(before, after);
    }
}
