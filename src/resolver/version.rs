//! Toolchain version constraints.
//!
//! A constraint is one of:
//! - exact: `1.12.3`
//! - minor wildcard: `1.12.x` (also `1.12.*`)
//! - family: `1.12`, `1`, `1.x`
//! - absent: the greatest version in the manifest
//!
//! A leading `go` is accepted (`go1.12`, as written in `Godeps.json`).
//! Selection always picks the greatest satisfying version under semantic
//! version ordering. Anything that does not parse as one of the forms above
//! fails with the same error as an unsatisfiable constraint.

use std::fmt;

use semver::Version;

use super::errors::VersionResolutionError;

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// No constraint given.
    Latest,
    /// A literal version.
    Exact(Version),
    /// Everything within a major, or a major.minor, family.
    Family { major: u64, minor: Option<u64> },
}

impl VersionConstraint {
    /// Parse a constraint. `None` and blank strings mean "latest".
    pub fn parse(raw: Option<&str>) -> Result<Self, VersionResolutionError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(VersionConstraint::Latest);
        };

        let text = raw.strip_prefix("go").unwrap_or(raw);
        let malformed = || VersionResolutionError::no_match(raw);

        let parts: Vec<&str> = text.split('.').collect();
        match parts.as_slice() {
            [major] => Ok(VersionConstraint::Family {
                major: number(major).ok_or_else(malformed)?,
                minor: None,
            }),
            [major, minor] if is_wildcard(minor) => Ok(VersionConstraint::Family {
                major: number(major).ok_or_else(malformed)?,
                minor: None,
            }),
            [major, minor] => Ok(VersionConstraint::Family {
                major: number(major).ok_or_else(malformed)?,
                minor: Some(number(minor).ok_or_else(malformed)?),
            }),
            [major, minor, patch] if is_wildcard(patch) => Ok(VersionConstraint::Family {
                major: number(major).ok_or_else(malformed)?,
                minor: Some(number(minor).ok_or_else(malformed)?),
            }),
            [major, minor, patch] => Ok(VersionConstraint::Exact(Version::new(
                number(major).ok_or_else(malformed)?,
                number(minor).ok_or_else(malformed)?,
                number(patch).ok_or_else(malformed)?,
            ))),
            _ => Err(malformed()),
        }
    }

    /// Check whether a concrete version satisfies this constraint.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Latest => true,
            VersionConstraint::Exact(v) => v == version,
            VersionConstraint::Family { major, minor } => {
                version.major == *major && minor.is_none_or(|m| version.minor == m)
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Latest => write!(f, "latest"),
            VersionConstraint::Exact(v) => write!(f, "{}", v),
            VersionConstraint::Family { major, minor: None } => write!(f, "{}.x", major),
            VersionConstraint::Family {
                major,
                minor: Some(minor),
            } => write!(f, "{}.{}.x", major, minor),
        }
    }
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

fn number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Parse a manifest version string, allowing for a missing patch (`1.12`).
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim();
    let s = s.strip_prefix("go").unwrap_or(s);

    if let Ok(v) = s.parse::<Version>() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.as_slice() {
        [major] => Some(Version::new(number(major)?, 0, 0)),
        [major, minor] => Some(Version::new(number(major)?, number(minor)?, 0)),
        _ => None,
    }
}

/// Resolve a constraint against the versions available in the manifest.
///
/// Returns the manifest's own spelling of the selected version. The result
/// only depends on the inputs: ties between equal versions spelled
/// differently resolve to the first listed.
pub fn resolve<S: AsRef<str>>(
    constraint: Option<&str>,
    available: &[S],
) -> Result<String, VersionResolutionError> {
    let parsed = VersionConstraint::parse(constraint)?;

    let mut best: Option<(Version, &str)> = None;
    for candidate in available {
        let candidate = candidate.as_ref();
        let Some(version) = parse_version_lenient(candidate) else {
            tracing::debug!("ignoring unparseable manifest version `{}`", candidate);
            continue;
        };
        if !parsed.matches(&version) {
            continue;
        }
        if best.as_ref().is_none_or(|(b, _)| version > *b) {
            best = Some((version, candidate));
        }
    }

    match best {
        Some((_, chosen)) => {
            tracing::debug!("resolved go version constraint `{}` to {}", parsed, chosen);
            Ok(chosen.to_string())
        }
        None => Err(VersionResolutionError::no_match(
            constraint
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("latest"),
        )),
    }
}
