// Update resolution and batch orchestration.
//
// - applicability: version gate shared by every entry point
// - resolver: newest applicable version with a usable installer
// - context: per-package scope, discarded after each resolution
// - work_unit: resolved packages, correlation ids and dedup
// - batch: best-effort resolution across a match set
pub mod applicability;
pub mod batch;
pub mod context;
pub mod reporter;
pub mod resolver;
pub mod work_unit;

pub use applicability::ensure_update_version_applicable;
pub use batch::BatchUpdateOrchestrator;
pub use context::UpdateContext;
pub use reporter::{ConsoleReporter, Reporter};
pub use work_unit::{PackageWorkUnit, SubExecutionId};
