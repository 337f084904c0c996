use pakt_semver::Range;
use rstest::rstest;
use std::str::FromStr;

use super::*;

#[test]
fn missing_range_defaults_to_latest_without_has_version() {
    let pattern = Pattern::parse("lodash").unwrap();
    assert_eq!(pattern.name.as_str(), "lodash");
    assert_eq!(pattern.range, PatternRange::Latest);
    assert!(!pattern.has_version);
}

#[test]
fn explicit_latest_sets_has_version() {
    let pattern = Pattern::parse("lodash@latest").unwrap();
    assert_eq!(pattern.range, PatternRange::Latest);
    assert!(pattern.has_version);
}

#[test]
fn empty_range_becomes_any() {
    let pattern = Pattern::parse("lodash@").unwrap();
    assert_eq!(pattern.range, PatternRange::Semver(Range::from_str("*").unwrap()));
    assert!(pattern.has_version);
}

#[rstest]
#[case("@babel/core@^7.0.0", "@babel/core")]
#[case("@babel/core", "@babel/core")]
fn scoped_names_parse_correctly(#[case] src: &str, #[case] expected_name: &str) {
    let pattern = Pattern::parse(src).unwrap();
    assert_eq!(pattern.name.as_str(), expected_name);
}

#[test]
fn scoped_name_with_semver_range() {
    let pattern = Pattern::parse("@babel/core@^7.0.0").unwrap();
    assert_eq!(pattern.range, PatternRange::Semver(Range::from_str("^7.0.0").unwrap()));
    assert!(pattern.has_version);
}

#[test]
fn exotic_ranges_bypass_semver() {
    for src in ["a@file:../a", "a@link:../a", "a@workspace:^1.0.0", "a@git+https://host/a.git", "a@user/repo"] {
        let pattern = Pattern::parse(src).unwrap();
        assert!(pattern.is_exotic(), "{src} should be exotic");
        assert!(pattern.has_version);
    }
}

#[test]
fn normalize_pattern_is_left_inverse_of_construction() {
    for (name, range) in [("a", "^1.0.0"), ("@scope/pkg", "latest"), ("b", "file:../b")] {
        let src = format!("{name}@{range}");
        let pattern = Pattern::parse(&src).unwrap();
        assert_eq!(pattern.name.as_str(), name);
        assert!(pattern.has_version);
    }
}

#[test]
fn loose_pattern_tolerates_leading_zeros() {
    let pattern = Pattern::parse_loose("a@^01.02.03").unwrap();
    assert_eq!(pattern.range, PatternRange::Semver(Range::from_str("^1.2.3").unwrap()));
}

#[test]
fn rejects_unparseable_range() {
    assert!(Pattern::parse("a@not a valid range").is_err());
}
