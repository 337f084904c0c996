use std::str::FromStr;

use rstest::rstest;

use crate::Version;

use super::*;

fn v(src: &str) -> Version {
    Version::from_str(src).unwrap()
}

#[rstest]
#[case("^1.2.3", "1.2.3", true)]
#[case("^1.2.3", "1.9.9", true)]
#[case("^1.2.3", "2.0.0", false)]
#[case("^1.2.3", "1.2.2", false)]
#[case("^0.2.3", "0.2.9", true)]
#[case("^0.2.3", "0.3.0", false)]
#[case("^0.0.3", "0.0.3", true)]
#[case("^0.0.3", "0.0.4", false)]
#[case("^0.0", "0.0.5", true)]
#[case("^0.0", "0.1.0", false)]
#[case("^0.0.x", "0.0.5", true)]
#[case("^0.0.x", "0.1.0", false)]
fn caret_bounds(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
    assert_eq!(Range::from_str(range).unwrap().check(&v(version)), expected);
}

#[rstest]
#[case("~1.2.3", "1.2.9", true)]
#[case("~1.2.3", "1.3.0", false)]
#[case("~1.2", "1.2.9", true)]
#[case("~1.2", "1.3.0", false)]
fn tilde_bounds(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
    assert_eq!(Range::from_str(range).unwrap().check(&v(version)), expected);
}

#[rstest]
#[case(">=1.2.3", "1.2.3", true)]
#[case(">=1.2.3", "1.2.2", false)]
#[case("<2.0.0", "1.9.9", true)]
#[case("<2.0.0", "2.0.0", false)]
#[case("1.2.3", "1.2.3", true)]
#[case("1.2.3", "1.2.4", false)]
fn comparator_bounds(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
    assert_eq!(Range::from_str(range).unwrap().check(&v(version)), expected);
}

#[test]
fn star_matches_everything() {
    let range = Range::from_str("*").unwrap();
    assert!(range.check(&v("0.0.0")));
    assert!(range.check(&v("99.99.99")));
}

#[test]
fn partial_version_expands_to_range() {
    let range = Range::from_str("1.2").unwrap();
    assert!(range.check(&v("1.2.0")));
    assert!(range.check(&v("1.2.9")));
    assert!(!range.check(&v("1.3.0")));
}

#[test]
fn hyphen_range_is_inclusive_on_both_ends() {
    let range = Range::from_str("1.2.3 - 2.3.4").unwrap();
    assert!(range.check(&v("1.2.3")));
    assert!(range.check(&v("2.3.4")));
    assert!(!range.check(&v("2.3.5")));
    assert!(!range.check(&v("1.2.2")));
}

#[test]
fn or_combines_alternatives() {
    let range = Range::from_str("1.2.3 || 2.0.0").unwrap();
    assert!(range.check(&v("1.2.3")));
    assert!(range.check(&v("2.0.0")));
    assert!(!range.check(&v("1.5.0")));
}

#[test]
fn space_separated_comparators_are_conjunctive() {
    let range = Range::from_str(">=1.0.0 <2.0.0").unwrap();
    assert!(range.check(&v("1.5.0")));
    assert!(!range.check(&v("2.0.0")));
    assert!(!range.check(&v("0.9.0")));
}

#[test]
fn prerelease_only_matches_same_triple() {
    let range = Range::from_str("^1.2.3-alpha.0").unwrap();
    assert!(range.check(&v("1.2.3-alpha.5")));
    assert!(!range.check(&v("1.3.0")));
    assert!(!range.check(&v("1.3.0-alpha.0")));
}

#[test]
fn release_range_excludes_prereleases_by_default() {
    let range = Range::from_str("^1.2.3").unwrap();
    assert!(!range.check(&v("1.2.4-rc.0")));
    assert!(range.check_ignore_rc(&v("1.2.4-rc.0")));
}

#[test]
fn prerelease_on_the_upper_bound_of_a_hyphen_range_is_still_recognized() {
    let range = Range::from_str("1.0.0 - 2.0.0-rc.1").unwrap();
    assert!(range.check(&v("2.0.0-rc.0")));
    assert!(!range.check(&v("1.5.0-rc.0")));
}

#[test]
fn parse_loose_tolerates_leading_zeros() {
    let range = Range::parse_loose("^01.02.03").unwrap();
    assert!(range.check(&v("1.2.5")));
}

#[test]
fn exact_version_extracts_pinned_comparator() {
    let range = Range::from_str("1.2.3").unwrap();
    assert_eq!(range.exact_version(), Some(&v("1.2.3")));

    let caret = Range::from_str("^1.2.3").unwrap();
    assert_eq!(caret.exact_version(), None);
}

#[test]
fn rejects_malformed_range() {
    assert!(Range::from_str("not a range").is_err());
}
