use std::str::FromStr;

use rstest::rstest;

use super::*;

#[rstest]
#[case("1.2.3", 1, 2, 3)]
#[case("0.0.0", 0, 0, 0)]
#[case("v1.2.3", 1, 2, 3)]
#[case("10.20.30", 10, 20, 30)]
fn parses_plain_versions(#[case] src: &str, #[case] major: u32, #[case] minor: u32, #[case] patch: u32) {
    let version = Version::from_str(src).unwrap();
    assert_eq!(version.major, major);
    assert_eq!(version.minor, minor);
    assert_eq!(version.patch, patch);
    assert!(version.rc.is_none());
}

#[test]
fn parses_prerelease_segments() {
    let version = Version::from_str("1.2.3-alpha.1").unwrap();
    assert_eq!(version.rc, Some(vec![VersionRc::String("alpha".to_string()), VersionRc::Number(1)]));
}

#[test]
fn drops_build_metadata() {
    let with_build = Version::from_str("1.2.3+build.5").unwrap();
    let without_build = Version::from_str("1.2.3").unwrap();
    assert_eq!(with_build, without_build);
}

#[test]
fn rejects_garbage() {
    assert!(Version::from_str("not-a-version").is_err());
    assert!(Version::from_str("1.2.3.4").is_err());
    assert!(Version::from_str("").is_err());
}

#[test]
fn orders_prereleases_below_release() {
    let release = Version::from_str("1.0.0").unwrap();
    let rc = Version::from_str("1.0.0-rc.1").unwrap();
    assert!(rc < release);
}

#[test]
fn orders_numeric_prerelease_segments_numerically() {
    let rc2 = Version::from_str("1.0.0-rc.2").unwrap();
    let rc10 = Version::from_str("1.0.0-rc.10").unwrap();
    assert!(rc2 < rc10);
}

#[test]
fn parse_loose_strips_leading_zeros() {
    let loose = Version::parse_loose("01.02.03").unwrap();
    let strict = Version::from_str("1.2.3").unwrap();
    assert_eq!(loose, strict);
}

#[test]
fn strict_parse_rejects_leading_zeros() {
    assert!(Version::from_str("01.2.3").is_err());
}

#[test]
fn display_round_trips_through_parse() {
    for src in ["1.2.3", "1.2.3-rc.0", "1.2.3-alpha.beta.1"] {
        let version = Version::from_str(src).unwrap();
        assert_eq!(version.to_string(), src);
    }
}

#[test]
fn next_bumps_reset_lower_components() {
    let version = Version::from_str("1.2.3").unwrap();
    assert_eq!(version.next_patch().to_string(), "1.2.4");
    assert_eq!(version.next_minor().to_string(), "1.3.0");
    assert_eq!(version.next_major().to_string(), "2.0.0");
    assert_eq!(version.next_major_rc().to_string(), "2.0.0-0");
}
