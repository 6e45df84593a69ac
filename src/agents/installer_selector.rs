use crate::catalog::manifest::{
    language_of, Architecture, InapplicabilityReason, Installer, Manifest, Scope,
};
use crate::installed::InstalledPackage;
use crate::repository::{InstallerSelection, InstallerSelector, SelectorFactory};
use std::collections::BTreeSet;
use tracing::debug;

/// Environment preferences used when judging installers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPreferences {
    pub architecture: Architecture,
    pub locale: Option<String>,
    pub scope: Option<Scope>,
}

impl Default for SelectionPreferences {
    fn default() -> Self {
        Self {
            architecture: Architecture::host(),
            locale: None,
            scope: None,
        }
    }
}

impl SelectorFactory for SelectionPreferences {
    fn selector_for<'a>(
        &'a self,
        installed: &'a InstalledPackage,
    ) -> Box<dyn InstallerSelector + 'a> {
        Box::new(PreferenceSelector::new(self, installed))
    }
}

/// Picks the preferred installer for a manifest given what is currently installed.
pub struct PreferenceSelector<'a> {
    preferences: &'a SelectionPreferences,
    installed: &'a InstalledPackage,
}

impl<'a> PreferenceSelector<'a> {
    pub fn new(preferences: &'a SelectionPreferences, installed: &'a InstalledPackage) -> Self {
        Self {
            preferences,
            installed,
        }
    }

    fn inapplicabilities(&self, installer: &Installer) -> BTreeSet<InapplicabilityReason> {
        let mut reasons = BTreeSet::new();

        if !installer
            .installer_type
            .is_compatible_with(self.installed.installer_type)
        {
            reasons.insert(InapplicabilityReason::InstalledType);
        }

        if !installer.architecture.runs_on(self.preferences.architecture) {
            reasons.insert(InapplicabilityReason::Architecture);
        }

        let required_scope = self.installed.scope.or(self.preferences.scope);
        if let (Some(required), Some(offered)) = (required_scope, installer.scope) {
            if required != offered {
                reasons.insert(InapplicabilityReason::Scope);
            }
        }

        if let (Some(preferred), Some(offered)) =
            (self.preferences.locale.as_deref(), installer.locale.as_deref())
        {
            if !language_of(preferred).eq_ignore_ascii_case(language_of(offered)) {
                reasons.insert(InapplicabilityReason::Locale);
            }
        }

        reasons
    }

    /// Higher is better: exact locale first, then a native architecture.
    fn preference_rank(&self, installer: &Installer) -> (bool, bool) {
        let exact_locale = match (self.preferences.locale.as_deref(), installer.locale.as_deref())
        {
            (Some(preferred), Some(offered)) => preferred.eq_ignore_ascii_case(offered),
            _ => false,
        };
        let native_arch = installer.architecture == self.preferences.architecture;
        (exact_locale, native_arch)
    }
}

impl InstallerSelector for PreferenceSelector<'_> {
    fn select(&self, manifest: &Manifest) -> InstallerSelection {
        let mut selection = InstallerSelection::default();
        let mut best: Option<((bool, bool), &Installer)> = None;

        for installer in &manifest.installers {
            let reasons = self.inapplicabilities(installer);
            if !reasons.is_empty() {
                debug!(
                    "Rejected {} installer ({}) for {} {}: {:?}",
                    installer.installer_type,
                    installer.architecture,
                    manifest.id,
                    manifest.version,
                    reasons
                );
                selection.inapplicabilities.push(reasons);
                continue;
            }

            let rank = self.preference_rank(installer);
            if best.is_none_or(|(best_rank, _)| rank > best_rank) {
                best = Some((rank, installer));
            }
        }

        selection.installer = best.map(|(_, installer)| installer.clone());
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::manifest::InstallerType;

    fn installed(installer_type: InstallerType, scope: Option<Scope>) -> InstalledPackage {
        InstalledPackage {
            id: "Contoso.Editor".into(),
            version: "1.0".into(),
            installer_type,
            architecture: Architecture::X64,
            scope,
            source: None,
        }
    }

    fn installer(
        installer_type: InstallerType,
        architecture: Architecture,
        locale: Option<&str>,
    ) -> Installer {
        Installer {
            installer_type,
            architecture,
            locale: locale.map(str::to_string),
            scope: None,
            url: format!("https://example.invalid/{installer_type}-{architecture}"),
        }
    }

    fn manifest(installers: Vec<Installer>) -> Manifest {
        Manifest {
            id: "Contoso.Editor".into(),
            name: "Contoso Editor".into(),
            publisher: None,
            version: "2.0".into(),
            channel: String::new(),
            installers,
            dependencies: Vec::new(),
            localizations: Vec::new(),
            locale: None,
        }
    }

    fn preferences(locale: Option<&str>) -> SelectionPreferences {
        SelectionPreferences {
            architecture: Architecture::X64,
            locale: locale.map(str::to_string),
            scope: None,
        }
    }

    #[test]
    fn rejects_incompatible_install_technology() {
        let prefs = preferences(None);
        let pkg = installed(InstallerType::Msi, None);
        let selection = PreferenceSelector::new(&prefs, &pkg).select(&manifest(vec![
            installer(InstallerType::Msix, Architecture::X64, None),
        ]));

        assert!(selection.installer.is_none());
        assert_eq!(
            selection.inapplicabilities,
            vec![BTreeSet::from([InapplicabilityReason::InstalledType])]
        );
    }

    #[test]
    fn collects_every_reason_per_installer() {
        let prefs = preferences(Some("en-US"));
        let pkg = installed(InstallerType::Msi, None);
        let selection = PreferenceSelector::new(&prefs, &pkg).select(&manifest(vec![
            installer(InstallerType::Exe, Architecture::Arm64, Some("fr-FR")),
        ]));

        assert_eq!(
            selection.inapplicabilities,
            vec![BTreeSet::from([
                InapplicabilityReason::InstalledType,
                InapplicabilityReason::Architecture,
                InapplicabilityReason::Locale,
            ])]
        );
    }

    #[test]
    fn prefers_exact_locale_then_native_architecture() {
        let prefs = preferences(Some("en-US"));
        let pkg = installed(InstallerType::Msi, None);
        let selection = PreferenceSelector::new(&prefs, &pkg).select(&manifest(vec![
            installer(InstallerType::Msi, Architecture::X86, Some("en-GB")),
            installer(InstallerType::Msi, Architecture::X86, Some("en-US")),
            installer(InstallerType::Wix, Architecture::X64, Some("en-US")),
        ]));

        let chosen = selection.installer.unwrap();
        assert_eq!(chosen.installer_type, InstallerType::Wix);
        assert!(selection.inapplicabilities.is_empty());
    }

    #[test]
    fn first_installer_wins_ties() {
        let prefs = preferences(None);
        let pkg = installed(InstallerType::Exe, None);
        let selection = PreferenceSelector::new(&prefs, &pkg).select(&manifest(vec![
            installer(InstallerType::Inno, Architecture::X64, None),
            installer(InstallerType::Nullsoft, Architecture::X64, None),
        ]));

        assert_eq!(selection.installer.unwrap().installer_type, InstallerType::Inno);
    }

    #[test]
    fn installed_scope_must_match() {
        let prefs = preferences(None);
        let pkg = installed(InstallerType::Msi, Some(Scope::Machine));
        let mut user_only = installer(InstallerType::Msi, Architecture::X64, None);
        user_only.scope = Some(Scope::User);

        let selection = PreferenceSelector::new(&prefs, &pkg).select(&manifest(vec![user_only]));
        assert_eq!(
            selection.inapplicabilities,
            vec![BTreeSet::from([InapplicabilityReason::Scope])]
        );
    }
}
