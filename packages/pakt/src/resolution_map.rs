use globset::{Glob, GlobMatcher};
use pakt_primitives::{ExoticRange, Ident};
use pakt_semver::Version;

use crate::error::Error;

/// What a resolution pin resolves its match to: an exact version (the
/// common case) or an exotic reference (a `resolutions` entry can point at
/// a `file:`/`link:`/git dependency just as a regular dependency can).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionTarget {
    Version(Version),
    Exotic(ExoticRange),
}

impl ResolutionTarget {
    pub fn parse(raw: &str) -> Result<ResolutionTarget, Error> {
        if let Some(exotic) = ExoticRange::classify(raw) {
            return Ok(ResolutionTarget::Exotic(exotic));
        }

        let version = raw.parse().map_err(|_| Error::UserError(format!("resolution target is not an exact version ({raw})")))?;
        Ok(ResolutionTarget::Version(version))
    }
}

struct ResolutionEntry {
    raw_key: String,
    matcher: GlobMatcher,
    target: ResolutionTarget,
}

/// User-supplied exact-version overrides keyed by ancestry path (nested
/// globs), read from the root manifest's `resolutions` field per spec.md
/// §4.D. `**/c` matches `c` at any depth; `pkg-a/**/pkg-b` anchors the glob
/// to requests whose parent chain begins with `pkg-a`.
pub struct ResolutionMap {
    entries: Vec<ResolutionEntry>,
}

impl ResolutionMap {
    pub fn empty() -> ResolutionMap {
        ResolutionMap { entries: Vec::new() }
    }

    pub fn from_entries<I: IntoIterator<Item = (String, String)>>(entries: I) -> Result<ResolutionMap, Error> {
        let mut built = Vec::new();

        for (key, raw_target) in entries {
            let glob = Glob::new(&key).map_err(|err| Error::UserError(format!("invalid resolution key ({key}): {err}")))?;
            let target = ResolutionTarget::parse(&raw_target)?;
            built.push(ResolutionEntry { raw_key: key, matcher: glob.compile_matcher(), target });
        }

        Ok(ResolutionMap { entries: built })
    }

    /// Looks up a pin for `name` given the chain of ancestor names leading
    /// to this request (root-first, not including `name` itself). Returns
    /// the most specific match (longest raw key) when more than one glob
    /// matches, so `pkg-a/**/c` wins over a bare `**/c`.
    pub fn find(&self, name: &Ident, parent_names: &[Ident]) -> Option<&ResolutionTarget> {
        let path = path_for(name, parent_names);

        self.entries
            .iter()
            .filter(|entry| entry.matcher.is_match(&path))
            .max_by_key(|entry| entry.raw_key.len())
            .map(|entry| &entry.target)
    }
}

fn path_for(name: &Ident, parent_names: &[Ident]) -> String {
    let mut segments: Vec<&str> = parent_names.iter().map(|i| i.as_str()).collect();
    segments.push(name.as_str());
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_double_star_matches_any_depth() {
        let map = ResolutionMap::from_entries([("**/c".to_string(), "1.0.0".to_string())]).unwrap();
        let target = map.find(&Ident::new("c"), &[Ident::new("a"), Ident::new("b")]);
        assert_eq!(target, Some(&ResolutionTarget::Version("1.0.0".parse().unwrap())));
    }

    #[test]
    fn anchored_glob_requires_matching_ancestor() {
        let map = ResolutionMap::from_entries([("pkg-a/**/c".to_string(), "1.0.0".to_string())]).unwrap();
        assert!(map.find(&Ident::new("c"), &[Ident::new("pkg-a")]).is_some());
        assert!(map.find(&Ident::new("c"), &[Ident::new("pkg-b")]).is_none());
    }

    #[test]
    fn more_specific_glob_wins_over_bare_star() {
        let map = ResolutionMap::from_entries([
            ("**/c".to_string(), "1.0.0".to_string()),
            ("pkg-a/**/c".to_string(), "2.0.0".to_string()),
        ]).unwrap();

        let target = map.find(&Ident::new("c"), &[Ident::new("pkg-a")]);
        assert_eq!(target, Some(&ResolutionTarget::Version("2.0.0".parse().unwrap())));
    }

    #[test]
    fn exotic_targets_parse() {
        let map = ResolutionMap::from_entries([("**/c".to_string(), "file:../c".to_string())]).unwrap();
        assert!(matches!(map.find(&Ident::new("c"), &[]), Some(ResolutionTarget::Exotic(_))));
    }
}
