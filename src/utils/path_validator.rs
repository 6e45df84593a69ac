use crate::error::{Result, UpliftError};
use std::path::{Path, PathBuf};

const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

/// Path checks for the workspace directory and the state files inside it.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises the workspace directory.
    pub fn validate_workspace_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            UpliftError::Workspace(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(UpliftError::Workspace(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);
            let canonical_forbidden = forbidden_path.canonicalize().ok();

            if path.starts_with(forbidden_path)
                || canonical.starts_with(forbidden_path)
                || canonical_forbidden.is_some_and(|f| canonical.starts_with(f))
            {
                return Err(UpliftError::Workspace(format!(
                    "Access to system directory '{}' is not allowed",
                    forbidden
                )));
            }
        }

        Ok(canonical)
    }

    /// Ensures the file path resides inside the workspace directory.
    pub fn validate_file_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_file = file_path.canonicalize().map_err(|e| {
            UpliftError::Workspace(format!("Invalid file path '{}': {e}", file_path.display()))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            UpliftError::Workspace(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_file.starts_with(&canonical_base) {
            return Err(UpliftError::Workspace(format!(
                "'{}' is outside the workspace",
                file_path.display()
            )));
        }

        Ok(canonical_file)
    }
}
