use pakt_primitives::PatternRange;
use pakt_semver::Version;

/// Picks the version a `Pattern` resolves to out of a candidate list a
/// registry backend returned, per spec.md §4.B.
///
/// `candidates` MUST already be sorted ascending (the contract registry
/// backends honor); `latest` short-circuits to the last element rather than
/// re-deriving a maximum, so a registry's own notion of "latest" (which may
/// not be the highest semver, e.g. a deprecated 2.0 next to a maintained
/// 1.9 dist-tag) is respected when the backend supplies one explicitly via
/// [`reduce_latest`].
pub fn reduce<'a>(candidates: &'a [Version], range: &PatternRange) -> Option<&'a Version> {
    match range {
        PatternRange::Latest => candidates.last(),
        PatternRange::Semver(semver_range) => {
            candidates.iter().rev().find(|version| semver_range.check(version))
        }
        PatternRange::Exotic(_) => None,
    }
}

/// Used when a registry backend reports an explicit `latest` dist-tag
/// distinct from the numerically highest published version.
pub fn reduce_latest(candidates: &[Version], tagged_latest: Option<&Version>) -> Option<Version> {
    tagged_latest.cloned().or_else(|| candidates.last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pakt_semver::Range;
    use std::str::FromStr;

    fn v(s: &str) -> Version {
        Version::from_str(s).unwrap()
    }

    #[test]
    fn latest_returns_last_element() {
        let candidates = vec![v("1.0.0"), v("1.1.0"), v("2.0.0")];
        assert_eq!(reduce(&candidates, &PatternRange::Latest), Some(&v("2.0.0")));
    }

    #[test]
    fn semver_range_returns_highest_satisfying() {
        let candidates = vec![v("1.0.0"), v("1.1.0"), v("2.0.0")];
        let range = PatternRange::Semver(Range::from_str("^1.0.0").unwrap());
        assert_eq!(reduce(&candidates, &range), Some(&v("1.1.0")));
    }

    #[test]
    fn no_candidate_satisfies_yields_none() {
        let candidates = vec![v("1.0.0"), v("1.1.0")];
        let range = PatternRange::Semver(Range::from_str("^3.0.0").unwrap());
        assert_eq!(reduce(&candidates, &range), None);
    }

    #[test]
    fn exotic_range_bypasses_the_reducer() {
        let candidates = vec![v("1.0.0")];
        let range = PatternRange::Exotic(pakt_primitives::ExoticRange::classify("file:../x").unwrap());
        assert_eq!(reduce(&candidates, &range), None);
    }
}
