use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Termination codes surfaced to the caller and used as the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Internal,
    UpdateNotApplicable,
    UpdateAllHasFailure,
    NoApplicationsFound,
    InstallFailed,
    InvalidWorkspace,
}

impl ErrorCode {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::Internal => 1,
            ErrorCode::UpdateNotApplicable => 2,
            ErrorCode::UpdateAllHasFailure => 3,
            ErrorCode::NoApplicationsFound => 4,
            ErrorCode::InstallFailed => 5,
            ErrorCode::InvalidWorkspace => 6,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCode::Internal => "internal",
            ErrorCode::UpdateNotApplicable => "update-not-applicable",
            ErrorCode::UpdateAllHasFailure => "update-all-has-failure",
            ErrorCode::NoApplicationsFound => "no-applications-found",
            ErrorCode::InstallFailed => "install-failed",
            ErrorCode::InvalidWorkspace => "invalid-workspace",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum UpliftError {
    #[error("No applicable update found for '{0}'")]
    UpdateNotApplicable(String),

    #[error("Package '{0}' is not installed")]
    NotInstalled(String),

    #[error("Package '{0}' was not found in the catalog")]
    PackageNotFound(String),

    #[error("Version '{version}' of '{package_id}' was not found in the catalog")]
    VersionNotFound { package_id: String, version: String },

    #[error("Workspace validation failed: {0}")]
    Workspace(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Installation of '{package_id}' failed: {reason}")]
    Install { package_id: String, reason: String },

    #[error("{failed} package(s) failed to update")]
    BatchFailure { code: ErrorCode, failed: usize },

    #[error("TOML parsing failed: {0}")]
    TomlParsing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpliftError {
    /// The termination code this error surfaces as.
    pub fn code(&self) -> ErrorCode {
        match self {
            UpliftError::UpdateNotApplicable(_) => ErrorCode::UpdateNotApplicable,
            UpliftError::NotInstalled(_)
            | UpliftError::PackageNotFound(_)
            | UpliftError::VersionNotFound { .. } => ErrorCode::NoApplicationsFound,
            UpliftError::Workspace(_) | UpliftError::Config(_) => ErrorCode::InvalidWorkspace,
            UpliftError::Install { .. } => ErrorCode::InstallFailed,
            UpliftError::BatchFailure { code, .. } => *code,
            UpliftError::TomlParsing(_)
            | UpliftError::Io(_)
            | UpliftError::Toml(_)
            | UpliftError::Json(_) => ErrorCode::Internal,
        }
    }

    pub fn is_update_not_applicable(&self) -> bool {
        self.code() == ErrorCode::UpdateNotApplicable
    }
}

pub type Result<T> = std::result::Result<T, UpliftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_applicable_maps_to_its_own_code() {
        let err = UpliftError::UpdateNotApplicable("Contoso.Editor".into());
        assert_eq!(err.code(), ErrorCode::UpdateNotApplicable);
        assert!(err.is_update_not_applicable());
        assert_eq!(err.code().exit_code(), 2);
    }

    #[test]
    fn batch_failure_carries_policy_code() {
        let err = UpliftError::BatchFailure {
            code: ErrorCode::UpdateAllHasFailure,
            failed: 2,
        };
        assert_eq!(err.code(), ErrorCode::UpdateAllHasFailure);
        assert!(!err.is_update_not_applicable());
        assert_eq!(err.to_string(), "2 package(s) failed to update");
    }

    #[test]
    fn lookup_failures_share_a_code() {
        assert_eq!(
            UpliftError::NotInstalled("a".into()).code(),
            ErrorCode::NoApplicationsFound
        );
        assert_eq!(
            UpliftError::PackageNotFound("a".into()).code(),
            ErrorCode::NoApplicationsFound
        );
    }
}
