use std::{fmt, str::FromStr};

use crate::{extract::extract_version, range::RangeKind, Error, Range};

#[cfg(test)]
#[path = "./version.test.rs"]
mod version_tests;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionRc {
    Number(u32),
    String(String),
}

/// A parsed `major.minor.patch[-rc][+build]` version.
///
/// Build metadata is accepted for compatibility (registries publish it) but
/// is not retained: it never participates in ordering or equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub rc: Option<Vec<VersionRc>>,
}

impl Version {
    pub fn new() -> Version {
        Version { major: 0, minor: 0, patch: 0, rc: None }
    }

    pub fn new_from_components(major: u32, minor: u32, patch: u32, rc: Option<Vec<VersionRc>>) -> Version {
        Version { major, minor, patch, rc }
    }

    pub fn next_major(&self) -> Version {
        Version { major: self.major + 1, minor: 0, patch: 0, rc: None }
    }

    pub fn next_major_rc(&self) -> Version {
        Version { major: self.major + 1, minor: 0, patch: 0, rc: Some(vec![VersionRc::Number(0)]) }
    }

    pub fn next_minor(&self) -> Version {
        Version { major: self.major, minor: self.minor + 1, patch: 0, rc: None }
    }

    pub fn next_minor_rc(&self) -> Version {
        Version { major: self.major, minor: self.minor + 1, patch: 0, rc: Some(vec![VersionRc::Number(0)]) }
    }

    pub fn next_patch(&self) -> Version {
        Version { major: self.major, minor: self.minor, patch: self.patch + 1, rc: None }
    }

    pub fn next_patch_rc(&self) -> Version {
        Version { major: self.major, minor: self.minor, patch: self.patch + 1, rc: Some(vec![VersionRc::Number(0)]) }
    }

    pub fn to_range(&self, kind: RangeKind) -> Range {
        match kind {
            RangeKind::Caret => Range::caret(self.clone()),
            RangeKind::Tilde => Range::tilde(self.clone()),
            RangeKind::Exact => Range::exact(self.clone()),
        }
    }

    /// Parses with leading zeros in numeric components tolerated (`01.02.03`),
    /// the leniency real-world registries occasionally need from a consumer.
    pub fn parse_loose(src: &str) -> Result<Version, Error> {
        Version::from_str(&delint_leading_zeros(src))
    }
}

pub(crate) fn delint_leading_zeros(src: &str) -> String {
    src.split('.')
        .map(|segment| {
            let digits_end = segment.find(|c: char| !c.is_ascii_digit()).unwrap_or(segment.len());
            let (digits, rest) = segment.split_at(digits_end);

            if digits.len() > 1 && digits.starts_with('0') {
                let trimmed = digits.trim_start_matches('0');
                format!("{}{}", if trimmed.is_empty() { "0" } else { trimmed }, rest)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.major, self.minor, self.patch, self.rc.is_none(), &self.rc)
            .cmp(&(other.major, other.minor, other.patch, other.rc.is_none(), &other.rc))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self, Error> {
        let mut iter = src.chars().peekable();

        let (version, _) = extract_version(&mut iter)
            .ok_or_else(|| Error::InvalidVersion(src.to_string()))?;

        if iter.peek().is_some() {
            return Err(Error::InvalidVersion(src.to_string()));
        }

        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(rc) = &self.rc {
            write!(f, "-")?;

            for (index, segment) in rc.iter().enumerate() {
                if index > 0 {
                    write!(f, ".")?;
                }

                match segment {
                    VersionRc::Number(n) => write!(f, "{}", n)?,
                    VersionRc::String(s) => write!(f, "{}", s)?,
                }
            }
        }

        Ok(())
    }
}

serde_plain::derive_deserialize_from_fromstr!(Version, "a semver version");
serde_plain::derive_serialize_from_display!(Version);
