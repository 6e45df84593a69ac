use crate::agents::update::reporter::{Diagnostic, Reporter};
use crate::catalog::Version;
use crate::error::{Result, UpliftError};

/// True when `candidate` qualifies as an update over `installed`.
///
/// Strictly newer versions qualify, and so does `latest`. Equal versions never do.
pub fn is_update_version_applicable(installed: &Version, candidate: &Version) -> bool {
    installed < candidate || candidate.is_latest()
}

/// Version gate for a target chosen by other means. Reports and terminates with
/// `UpdateNotApplicable` when the target is not an update.
pub fn ensure_update_version_applicable(
    package_id: &str,
    installed: &Version,
    target: &Version,
    reporter: &dyn Reporter,
) -> Result<()> {
    if is_update_version_applicable(installed, target) {
        return Ok(());
    }

    reporter.diagnostic(Diagnostic::UpdateNotApplicable);
    Err(UpliftError::UpdateNotApplicable(package_id.to_string()))
}
