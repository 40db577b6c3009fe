//! Plugin version parsing and ordering.
//!
//! Ore does not mandate semver, so plugin versions are parsed with a
//! tolerant grammar: `major[.minor[.build[.revision]]]` followed by an
//! optional `-`/`_` suffix holding an alphabetic stage label and/or a
//! numeric patch (`1.2`, `2-beta3`, `1.0.0.5`, `3_rc_1`). A leading `v`
//! is accepted and dropped.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[Vv]?\s*(\d+)(?:\.(\d+)(?:\.(\d+)(?:\.(\d+))?)?)?(?:[-_]([A-Za-z]+)?[-_]?(\d+)?)?$")
        .expect("version pattern is valid")
});

/// The string did not match the version grammar end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version string: {0:?}")]
pub struct InvalidVersion(String);

/// A parsed plugin version.
///
/// Components absent from the source string are `None` and sort before
/// any present value, so `1.2 < 1.2.0`. The stage label compares by
/// plain string order; the conventional `alpha < beta < rc < release`
/// severity ordering therefore holds exactly when those tokens are
/// used, which is a vocabulary convention of the index, not something
/// this type enforces.
///
/// Field order matters: the derived ordering compares
/// `(major, minor, build, revision, stage, patch)` left to right.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: Option<u32>,
    build: Option<u32>,
    revision: Option<u32>,
    stage: Option<String>,
    patch: Option<u32>,
}

impl Version {
    /// Parses a dependency requirement, which is either a plain version
    /// or a maven-style range such as `[1.2,2.0)`. For ranges only the
    /// lower bound is considered; the upper bound and inclusivity
    /// markers are ignored.
    pub fn from_requirement(requirement: &str) -> Result<Self, InvalidVersion> {
        match requirement.strip_prefix(['[', '(']) {
            Some(bounds) => bounds.split(',').next().unwrap_or(bounds).parse(),
            None => requirement.parse(),
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> Option<u32> {
        self.minor
    }

    pub fn build(&self) -> Option<u32> {
        self.build
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Stage label, e.g. `beta` in `2-beta3`. Never an empty string.
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn patch(&self) -> Option<u32> {
        self.patch
    }
}

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let captures = VERSION_PATTERN.captures(s).ok_or_else(invalid)?;
        let number = |group: usize| {
            captures
                .get(group)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| invalid()))
                .transpose()
        };

        Ok(Version {
            major: number(1)?.ok_or_else(invalid)?,
            minor: number(2)?,
            build: number(3)?,
            revision: number(4)?,
            stage: captures.get(5).map(|m| m.as_str().to_string()),
            patch: number(6)?,
        })
    }
}

impl fmt::Display for Version {
    /// Renders only the components that are present, padding a skipped
    /// numeric component with `.0` when a later one is present. The
    /// suffix separator is always `-`, even when the source used `_`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        match self.minor {
            Some(minor) => write!(f, ".{minor}")?,
            None if self.build.is_some() || self.revision.is_some() => f.write_str(".0")?,
            None => {}
        }
        match self.build {
            Some(build) => write!(f, ".{build}")?,
            None if self.revision.is_some() => f.write_str(".0")?,
            None => {}
        }
        if let Some(revision) = self.revision {
            write!(f, ".{revision}")?;
        }
        if self.stage.is_some() || self.patch.is_some() {
            f.write_str("-")?;
            if let Some(stage) = &self.stage {
                f.write_str(stage)?;
            }
            if let Some(patch) = self.patch {
                write!(f, "{patch}")?;
            }
        }
        Ok(())
    }
}
