use std::fmt;
use std::str::FromStr;

use pakt_semver::Range;

use crate::exotic::ExoticRange;
use crate::ident::Ident;
use crate::Error;

/// The parsed form of a `range` component: a concrete semver range, the
/// sentinel `latest`, or an exotic reference the semver reducer never sees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternRange {
    Latest,
    Semver(Range),
    Exotic(ExoticRange),
}

impl fmt::Display for PatternRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatternRange::Latest => write!(f, "latest"),
            PatternRange::Semver(range) => write!(f, "{range}"),
            PatternRange::Exotic(exotic) => write!(f, "{exotic}"),
        }
    }
}

/// A dependency request string of the form `name@range`, split into its
/// `name`/`range` parts plus whether the source string carried an explicit
/// range at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub name: Ident,
    pub range: PatternRange,
    pub has_version: bool,
}

impl Pattern {
    /// Splits on `@` while honoring a single leading scope `@`. Missing
    /// range defaults to `latest` with `has_version=false`; an empty range
    /// after `@` becomes `*` with `has_version=true`.
    pub fn parse(src: &str) -> Result<Pattern, Error> {
        Pattern::parse_with_loose(src, false)
    }

    pub fn parse_loose(src: &str) -> Result<Pattern, Error> {
        Pattern::parse_with_loose(src, true)
    }

    fn parse_with_loose(src: &str, loose: bool) -> Result<Pattern, Error> {
        let split_at = if let Some(rest) = src.strip_prefix('@') {
            rest.find('@').map(|index| index + 1)
        } else {
            src.find('@')
        };

        let Some(split_at) = split_at else {
            return Ok(Pattern { name: Ident::new(src), range: PatternRange::Latest, has_version: false });
        };

        let name = &src[..split_at];
        let range_str = &src[split_at + 1..];

        if range_str.is_empty() {
            let range = if loose { Range::parse_loose("*")? } else { Range::from_str("*")? };
            return Ok(Pattern { name: Ident::new(name), range: PatternRange::Semver(range), has_version: true });
        }

        if range_str == "latest" {
            return Ok(Pattern { name: Ident::new(name), range: PatternRange::Latest, has_version: true });
        }

        if let Some(exotic) = ExoticRange::classify(range_str) {
            return Ok(Pattern { name: Ident::new(name), range: PatternRange::Exotic(exotic), has_version: true });
        }

        let range = if loose { Range::parse_loose(range_str)? } else { Range::from_str(range_str)? };

        Ok(Pattern { name: Ident::new(name), range: PatternRange::Semver(range), has_version: true })
    }

    pub fn is_exotic(&self) -> bool {
        matches!(self.range, PatternRange::Exotic(_))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.range)
    }
}

#[cfg(test)]
#[path = "./pattern.test.rs"]
mod pattern_tests;
