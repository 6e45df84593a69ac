use std::cmp::Ordering;
use std::fmt;

const LATEST: &str = "latest";

/// Version representation supporting the formats found in package catalogs.
///
/// Each dot-separated part is a leading number plus whatever text follows it,
/// so `2.0-preview` reads as `2`, `0` with suffix `-preview`. A suffixed part
/// sorts just below the same bare number. `latest` sorts above everything.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    pub parsed: VersionType,
}

#[derive(Debug, Clone)]
pub enum VersionType {
    Latest,
    Parts(Vec<VersionPart>),
}

#[derive(Debug, Clone)]
pub struct VersionPart {
    pub number: u64,
    pub suffix: String,
}

impl VersionPart {
    fn parse(part: &str) -> Self {
        let split = part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(part.len());
        let (digits, suffix) = part.split_at(split);
        VersionPart {
            number: if digits.is_empty() {
                0
            } else {
                digits.parse().unwrap_or(u64::MAX)
            },
            suffix: suffix.to_string(),
        }
    }

    fn is_zero(&self) -> bool {
        self.number == 0 && self.suffix.is_empty()
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| match (self.suffix.is_empty(), other.suffix.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self
                    .suffix
                    .to_ascii_lowercase()
                    .cmp(&other.suffix.to_ascii_lowercase()),
            })
    }
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionPart {}

impl Version {
    pub fn parse(version: &str) -> Self {
        let trimmed = version.trim();
        let parsed = if trimmed.eq_ignore_ascii_case(LATEST) {
            VersionType::Latest
        } else {
            VersionType::Parts(Self::parse_parts(trimmed))
        };

        Version {
            original: version.to_string(),
            parsed,
        }
    }

    /// Splits into parts with trailing zero parts removed, so `1.0` and `1`
    /// compare equal.
    fn parse_parts(version: &str) -> Vec<VersionPart> {
        let unprefixed = version
            .strip_prefix(['v', 'V'])
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(version);

        // Build metadata carries no precedence in a well-formed semver string.
        let without_build = match semver::Version::parse(unprefixed) {
            Ok(v) if !v.build.is_empty() => unprefixed
                .split_once('+')
                .map_or(unprefixed, |(release, _)| release),
            _ => unprefixed,
        };

        let mut parts: Vec<VersionPart> =
            without_build.split('.').map(VersionPart::parse).collect();
        while parts.last().is_some_and(VersionPart::is_zero) {
            parts.pop();
        }
        parts
    }

    pub fn is_latest(&self) -> bool {
        matches!(self.parsed, VersionType::Latest)
    }
}

fn compare_parts(a: &[VersionPart], b: &[VersionPart]) -> Ordering {
    let zero = VersionPart {
        number: 0,
        suffix: String::new(),
    };
    (0..a.len().max(b.len()))
        .map(|i| a.get(i).unwrap_or(&zero).cmp(b.get(i).unwrap_or(&zero)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (VersionType::Latest, VersionType::Latest) => Ordering::Equal,
            (VersionType::Latest, VersionType::Parts(_)) => Ordering::Greater,
            (VersionType::Parts(_), VersionType::Latest) => Ordering::Less,
            (VersionType::Parts(a), VersionType::Parts(b)) => compare_parts(a, b),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
