pub mod installer_selector;
pub mod package_installer;
pub mod workspace_scanner;

pub mod update;

pub use workspace_scanner::WorkspaceScannerAgent;
