use crate::agents::update::context::UpdateContext;
use crate::agents::update::reporter::Diagnostic;
use crate::agents::update::work_unit::{add_if_absent, PackageWorkUnit, SubExecutionId};
use crate::error::{ErrorCode, Result};
use crate::repository::{BatchInstaller, CatalogMatch, InstallPolicy, InstallSummary};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info, info_span};

/// Result of resolving a whole match set.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub work_units: Vec<PackageWorkUnit>,
    pub any_found: bool,
}

/// Resolves every match on its own and collects the updates that were found.
///
/// Packages whose resolution ends in `UpdateNotApplicable` are skipped. Any
/// other failure aborts the whole batch.
pub struct BatchUpdateOrchestrator<'a> {
    context: UpdateContext<'a>,
    show_progress: bool,
}

impl<'a> BatchUpdateOrchestrator<'a> {
    pub fn new(context: UpdateContext<'a>) -> Self {
        Self {
            context,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The policy handed to the downstream installer with every batch.
    pub fn install_policy() -> InstallPolicy {
        InstallPolicy {
            report_dependencies: true,
            failure_code: ErrorCode::UpdateAllHasFailure,
            ignorable_codes: vec![ErrorCode::UpdateNotApplicable],
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        let pb = ProgressBar::new(len as u64);
        if !self.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb
    }

    /// Resolves each match in order, one at a time.
    pub fn run_all(&self, matches: &[CatalogMatch]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let pb = self.progress_bar(matches.len());

        for catalog_match in matches {
            let package = catalog_match.package.as_ref();
            pb.set_message(format!("Checking {}", package.id()));

            let correlation_id = SubExecutionId::next();
            let span = info_span!(
                "sub_execution",
                id = %correlation_id,
                package = package.id()
            );
            let _entered = span.enter();

            match self.context.scope(package, correlation_id).resolve(false) {
                Ok(unit) => {
                    info!(
                        "Queued {} {} from {}",
                        unit.package_id(),
                        unit.version().version,
                        unit.source_identifier()
                    );
                    add_if_absent(&mut outcome.work_units, unit);
                    outcome.any_found = true;
                }
                Err(err) if err.is_update_not_applicable() => {
                    debug!("Skipping {}: no applicable update", package.id());
                }
                Err(err) => {
                    pb.abandon();
                    return Err(err);
                }
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(outcome)
    }

    /// Resolves the match set and hands the result to `installer`.
    ///
    /// Returns `None` without calling the installer when nothing was found.
    pub fn update_all_applicable(
        &self,
        matches: &[CatalogMatch],
        installer: &mut dyn BatchInstaller,
    ) -> Result<Option<InstallSummary>> {
        let outcome = self.run_all(matches)?;

        if !outcome.any_found {
            self.context.reporter.diagnostic(Diagnostic::NothingToUpdate);
            return Ok(None);
        }

        debug!("Handing {} work unit(s) to installer", outcome.work_units.len());
        installer
            .install_multiple(outcome.work_units, &Self::install_policy())
            .map(Some)
    }
}
