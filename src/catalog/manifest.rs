use crate::error::{Result, UpliftError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Installation technology used by an installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerType {
    Msi,
    Wix,
    Msix,
    Exe,
    Inno,
    Nullsoft,
    Burn,
    Zip,
    Portable,
}

impl InstallerType {
    fn family(self) -> u8 {
        match self {
            InstallerType::Msi | InstallerType::Wix => 0,
            InstallerType::Exe
            | InstallerType::Inno
            | InstallerType::Nullsoft
            | InstallerType::Burn => 1,
            InstallerType::Msix => 2,
            InstallerType::Zip => 3,
            InstallerType::Portable => 4,
        }
    }

    /// Whether an installer of this type can upgrade a package installed with `installed`.
    pub fn is_compatible_with(self, installed: InstallerType) -> bool {
        self.family() == installed.family()
    }
}

impl FromStr for InstallerType {
    type Err = UpliftError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "msi" => Ok(InstallerType::Msi),
            "wix" => Ok(InstallerType::Wix),
            "msix" | "appx" => Ok(InstallerType::Msix),
            "exe" => Ok(InstallerType::Exe),
            "inno" => Ok(InstallerType::Inno),
            "nullsoft" => Ok(InstallerType::Nullsoft),
            "burn" => Ok(InstallerType::Burn),
            "zip" => Ok(InstallerType::Zip),
            "portable" => Ok(InstallerType::Portable),
            other => Err(UpliftError::Config(format!("Unknown installer type '{other}'"))),
        }
    }
}

impl fmt::Display for InstallerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallerType::Msi => "msi",
            InstallerType::Wix => "wix",
            InstallerType::Msix => "msix",
            InstallerType::Exe => "exe",
            InstallerType::Inno => "inno",
            InstallerType::Nullsoft => "nullsoft",
            InstallerType::Burn => "burn",
            InstallerType::Zip => "zip",
            InstallerType::Portable => "portable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Neutral,
    X86,
    X64,
    Arm64,
}

impl Architecture {
    /// Architecture of the running host.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Architecture::X86,
            "aarch64" => Architecture::Arm64,
            _ => Architecture::X64,
        }
    }

    /// Whether a binary for this architecture runs on `host`.
    pub fn runs_on(self, host: Architecture) -> bool {
        match (self, host) {
            (Architecture::Neutral, _) => true,
            (Architecture::X86, Architecture::X64) => true,
            (a, b) => a == b,
        }
    }
}

impl FromStr for Architecture {
    type Err = UpliftError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "neutral" => Ok(Architecture::Neutral),
            "x86" => Ok(Architecture::X86),
            "x64" | "amd64" | "x86_64" => Ok(Architecture::X64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            other => Err(UpliftError::Config(format!("Unknown architecture '{other}'"))),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Architecture::Neutral => "neutral",
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm64 => "arm64",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Machine,
}

impl FromStr for Scope {
    type Err = UpliftError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "user" => Ok(Scope::User),
            "machine" => Ok(Scope::Machine),
            other => Err(UpliftError::Config(format!("Unknown scope '{other}'"))),
        }
    }
}

/// Why a single installer was rejected during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InapplicabilityReason {
    InstalledType,
    Architecture,
    Scope,
    Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installer {
    #[serde(rename = "type")]
    pub installer_type: InstallerType,
    pub architecture: Architecture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localization {
    pub locale: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
}

/// Description of one published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub publisher: Option<String>,
    pub version: String,
    pub channel: String,
    pub installers: Vec<Installer>,
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub localizations: Vec<Localization>,
    /// Locale applied after installer selection, if any.
    pub locale: Option<String>,
}

impl Manifest {
    /// Applies the selected installer's locale, pulling localized fields when present.
    pub fn apply_locale(&mut self, locale: Option<&str>) {
        let Some(locale) = locale else {
            return;
        };

        let localized = self
            .localizations
            .iter()
            .find(|l| l.locale.eq_ignore_ascii_case(locale))
            .or_else(|| {
                self.localizations
                    .iter()
                    .find(|l| language_of(&l.locale).eq_ignore_ascii_case(language_of(locale)))
            })
            .cloned();

        if let Some(localized) = localized {
            if let Some(name) = localized.name {
                self.name = name;
            }
            if let Some(publisher) = localized.publisher {
                self.publisher = Some(publisher);
            }
        }

        self.locale = Some(locale.to_string());
    }
}

/// The language subtag of a BCP-47 tag, e.g. `en` for `en-US`.
pub fn language_of(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}
