use std::{fmt, str::FromStr};

use crate::extract::{extract_tokens, infix_to_prefix};
use crate::version::delint_leading_zeros;
use crate::{Error, Version};

#[cfg(test)]
#[path = "./range.test.rs"]
mod range_tests;

/// The implied shape of a bare pattern range like `semver:^1.2.3`, used by
/// [`crate::Version::to_range`] to build a comparator back out of a version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeKind {
    Caret,
    Tilde,
    Exact,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorType {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    SAnd,
    Or,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Operation(OperatorType, Version),
    Syntax(TokenType),
}

/// A parsed semver range (`^1.2.3`, `>=1.0.0 <2.0.0`, `1.x`, `*`, ...),
/// stored as a prefix-notation token tree so evaluation is a single
/// recursive walk with no re-parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    raw: String,
    tokens: Vec<Token>,
}

impl Range {
    pub fn any() -> Range {
        Range {
            raw: "*".to_string(),
            tokens: vec![Token::Operation(OperatorType::GreaterThanOrEqual, Version::new())],
        }
    }

    pub fn exact(version: Version) -> Range {
        let raw = version.to_string();
        Range { raw, tokens: vec![Token::Operation(OperatorType::Equal, version)] }
    }

    pub fn lte(version: Version) -> Range {
        let raw = format!("<={version}");
        Range { raw, tokens: vec![Token::Operation(OperatorType::LessThanOrEqual, version)] }
    }

    pub fn caret(version: Version) -> Range {
        let raw = format!("^{version}");
        let upper = match (version.major, version.minor) {
            (0, 0) => version.next_patch_rc(),
            (0, _) => version.next_minor_rc(),
            _ => version.next_major_rc(),
        };

        Range {
            raw,
            tokens: vec![
                Token::Syntax(TokenType::SAnd),
                Token::Operation(OperatorType::GreaterThanOrEqual, version),
                Token::Operation(OperatorType::LessThan, upper),
            ],
        }
    }

    pub fn tilde(version: Version) -> Range {
        let raw = format!("~{version}");
        let upper = version.next_minor_rc();

        Range {
            raw,
            tokens: vec![
                Token::Syntax(TokenType::SAnd),
                Token::Operation(OperatorType::GreaterThanOrEqual, version),
                Token::Operation(OperatorType::LessThan, upper),
            ],
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parses with leading zeros in numeric version components tolerated.
    pub fn parse_loose(src: &str) -> Result<Range, Error> {
        let mut range = Range::from_str(&delint_leading_zeros(src))?;
        range.raw = src.to_string();
        Ok(range)
    }

    /// Whether `version` satisfies this range, prerelease-sensitive: a
    /// version carrying an `-rc` tag only matches ranges whose own bounds
    /// share the same `major.minor.patch` triple (npm's prerelease rule).
    pub fn check(&self, version: &Version) -> bool {
        if version.rc.is_some() && !self.allows_prereleases_of(version) {
            return false;
        }

        self.check_ignore_rc(version)
    }

    /// Same as [`Range::check`] but without the prerelease-tag gate; used
    /// by callers that have already established the prerelease is in scope
    /// (e.g. when resolving a request that was itself pinned to an `-rc`).
    pub fn check_ignore_rc(&self, version: &Version) -> bool {
        eval(&self.tokens, version).map(|(result, _)| result).unwrap_or(false)
    }

    pub fn exact_version(&self) -> Option<&Version> {
        match self.tokens.as_slice() {
            [Token::Operation(OperatorType::Equal, version)] => Some(version),
            _ => None,
        }
    }

    /// Checks every bound in the range, not just the first one reached —
    /// a prerelease tag may sit on any comparator (e.g. the upper bound of
    /// a hyphen range `1.0.0 - 2.0.0-rc.1`), not only the first.
    fn allows_prereleases_of(&self, version: &Version) -> bool {
        self.tokens.iter().any(|token| match token {
            Token::Operation(_, bound) if bound.rc.is_some() => {
                bound.major == version.major && bound.minor == version.minor && bound.patch == version.patch
            }
            _ => false,
        })
    }
}

/// Recursive evaluator over the prefix token tree: `SAnd`/`Or` each consume
/// the next two fully-formed sub-expressions from the stream.
fn eval<'a>(tokens: &'a [Token], version: &Version) -> Option<(bool, &'a [Token])> {
    match tokens.split_first()? {
        (Token::Operation(op, bound), rest) => {
            let result = match op {
                OperatorType::GreaterThan => version > bound,
                OperatorType::GreaterThanOrEqual => version >= bound,
                OperatorType::LessThan => version < bound,
                OperatorType::LessThanOrEqual => version <= bound,
                OperatorType::Equal => version == bound,
            };
            Some((result, rest))
        }

        (Token::Syntax(TokenType::SAnd), rest) => {
            let (lhs, rest) = eval(rest, version)?;
            let (rhs, rest) = eval(rest, version)?;
            Some((lhs && rhs, rest))
        }

        (Token::Syntax(TokenType::Or), rest) => {
            let (lhs, rest) = eval(rest, version)?;
            let (rhs, rest) = eval(rest, version)?;
            Some((lhs || rhs, rest))
        }
    }
}

impl FromStr for Range {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self, Error> {
        if src.is_empty() || src == "*" || src.eq_ignore_ascii_case("x") {
            return Ok(Range::any());
        }

        let mut iter = src.chars().peekable();
        let infix = extract_tokens(&mut iter).ok_or_else(|| Error::InvalidRange(src.to_string()))?;

        if iter.peek().is_some() {
            return Err(Error::InvalidRange(src.to_string()));
        }

        let tokens = infix_to_prefix(&infix).ok_or_else(|| Error::InvalidRange(src.to_string()))?;

        Ok(Range { raw: src.to_string(), tokens })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

serde_plain::derive_deserialize_from_fromstr!(Range, "a semver range");
serde_plain::derive_serialize_from_display!(Range);
