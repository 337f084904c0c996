use super::*;

fn sample_entry(version: &str) -> LockEntry {
    LockEntry {
        name: Some("a".to_string()),
        version: version.to_string(),
        resolved: Some(format!("https://registry.npmjs.org/a/-/a-{version}.tgz#deadbeef")),
        integrity: Some("sha512-zzz sha1-aaa".to_string()),
        registry: Some("npm".to_string()),
        uid: Some(version.to_string()),
        dependencies: BTreeMap::new(),
        optional_dependencies: BTreeMap::new(),
        permissions: BTreeMap::new(),
        prebuilt_variants: BTreeMap::new(),
    }
}

#[test]
fn parses_a_simple_entry() {
    let text = format!("{HEADER}\"a@^1.0.0\":\n  version \"1.1.0\"\n  resolved \"https://x/a.tgz\"\n  integrity sha512-zzz\n");
    let (lockfile, outcome) = Lockfile::parse(&text);
    assert_eq!(outcome, ParseOutcome::Success);

    let entry = lockfile.get_locked("a@^1.0.0").unwrap();
    assert_eq!(entry.version, "1.1.0");
    assert_eq!(entry.resolved.as_deref(), Some("https://x/a.tgz"));
    assert_eq!(entry.integrity.as_deref(), Some("sha512-zzz"));
}

#[test]
fn parses_comma_grouped_patterns_sharing_one_entry() {
    let text = format!("{HEADER}\"a@^1.0.0\", \"a@^1.1.0\":\n  version \"1.1.0\"\n");
    let (lockfile, _) = Lockfile::parse(&text);

    assert_eq!(lockfile.get_locked("a@^1.0.0").unwrap().version, "1.1.0");
    assert_eq!(lockfile.get_locked("a@^1.1.0").unwrap().version, "1.1.0");
}

#[test]
fn parses_nested_dependency_blocks() {
    let text = format!(
        "{HEADER}\"a@^1.0.0\":\n  version \"1.0.0\"\n  dependencies:\n    b \"^2.0.0\"\n    c \"^3.0.0\"\n"
    );
    let (lockfile, _) = Lockfile::parse(&text);
    let entry = lockfile.get_locked("a@^1.0.0").unwrap();
    assert_eq!(entry.dependencies.get("b"), Some(&"^2.0.0".to_string()));
    assert_eq!(entry.dependencies.get("c"), Some(&"^3.0.0".to_string()));
}

#[test]
fn missing_file_yields_empty_lockfile() {
    let (lockfile, outcome) = Lockfile::from_directory(Path::new("/nonexistent/path/xyz")).unwrap();
    assert_eq!(outcome, ParseOutcome::Success);
    assert!(lockfile.get_locked("a@^1.0.0").is_none());
}

#[test]
fn remove_pattern_drops_entry() {
    let text = format!("{HEADER}\"a@^1.0.0\":\n  version \"1.0.0\"\n");
    let (mut lockfile, _) = Lockfile::parse(&text);
    lockfile.remove_pattern("a@^1.0.0");
    assert!(lockfile.get_locked("a@^1.0.0").is_none());
}

#[test]
fn merge_conflict_resolvable_by_union_yields_merge() {
    let text = format!(
        "{HEADER}\"a@^1.0.0\":\n  version \"1.0.0\"\n<<<<<<< ours\n\"b@^1.0.0\":\n  version \"1.0.0\"\n=======\n\"c@^1.0.0\":\n  version \"1.0.0\"\n>>>>>>> theirs\n"
    );
    let (lockfile, outcome) = Lockfile::parse(&text);
    assert_eq!(outcome, ParseOutcome::Merge);
    assert!(lockfile.get_locked("a@^1.0.0").is_some());
    assert!(lockfile.get_locked("b@^1.0.0").is_some());
    assert!(lockfile.get_locked("c@^1.0.0").is_some());
}

#[test]
fn merge_conflict_with_disagreeing_entries_yields_conflict() {
    let text = format!(
        "{HEADER}<<<<<<< ours\n\"a@^1.0.0\":\n  version \"1.0.0\"\n=======\n\"a@^1.0.0\":\n  version \"2.0.0\"\n>>>>>>> theirs\n"
    );
    let (_, outcome) = Lockfile::parse(&text);
    assert_eq!(outcome, ParseOutcome::Conflict);
}

#[test]
fn build_dedups_patterns_sharing_a_remote_and_owner_is_first_in_sort_order() {
    let resolved = vec![
        ResolvedPatternEntry { pattern: "a@^1.1.0".to_string(), dedup_key: "key-a".to_string(), entry: sample_entry("1.1.0") },
        ResolvedPatternEntry { pattern: "a@^1.0.0".to_string(), dedup_key: "key-a".to_string(), entry: sample_entry("1.1.0") },
        ResolvedPatternEntry { pattern: "b@^1.0.0".to_string(), dedup_key: "key-b".to_string(), entry: sample_entry("1.0.0") },
    ];

    let lockfile = Lockfile::build(&resolved);
    assert_eq!(lockfile.groups.len(), 2);

    let owning_group = lockfile.groups.iter().find(|g| g.patterns.contains(&"a@^1.0.0".to_string())).unwrap();
    assert_eq!(owning_group.patterns[0], "a@^1.0.0");
    assert!(owning_group.patterns.contains(&"a@^1.1.0".to_string()));
}

#[test]
fn integrity_is_canonicalized_by_sorting_whitespace_tokens() {
    let resolved = vec![
        ResolvedPatternEntry { pattern: "a@^1.0.0".to_string(), dedup_key: "key-a".to_string(), entry: sample_entry("1.0.0") },
    ];
    let lockfile = Lockfile::build(&resolved);
    assert_eq!(lockfile.groups[0].entry.integrity.as_deref(), Some("sha1-aaa sha512-zzz"));
}

#[test]
fn serialization_is_idempotent() {
    let resolved = vec![
        ResolvedPatternEntry { pattern: "a@^1.0.0".to_string(), dedup_key: "key-a".to_string(), entry: sample_entry("1.0.0") },
        ResolvedPatternEntry { pattern: "b@^1.0.0".to_string(), dedup_key: "key-b".to_string(), entry: sample_entry("2.0.0") },
    ];
    let lockfile = Lockfile::build(&resolved);
    let serialized_once = lockfile.serialize();

    let (reparsed, outcome) = Lockfile::parse(&serialized_once);
    assert_eq!(outcome, ParseOutcome::Success);
    let rebuilt = Lockfile::build(&resolved);
    let _ = reparsed;

    let serialized_twice = rebuilt.serialize();
    assert_eq!(serialized_once, serialized_twice);
}

#[test]
fn pattern_sorting_is_stable_under_input_permutation() {
    let forward = vec![
        ResolvedPatternEntry { pattern: "a@^1.0.0".to_string(), dedup_key: "key-a".to_string(), entry: sample_entry("1.0.0") },
        ResolvedPatternEntry { pattern: "b@^1.0.0".to_string(), dedup_key: "key-b".to_string(), entry: sample_entry("2.0.0") },
    ];
    let reversed = vec![forward[1].clone(), forward[0].clone()];

    assert_eq!(Lockfile::build(&forward).serialize(), Lockfile::build(&reversed).serialize());
}

#[test]
fn has_entries_without_integrity_excludes_file_and_http_keys() {
    let text = format!("{HEADER}\"a@file:../a\":\n  version \"1.0.0\"\n");
    let (lockfile, _) = Lockfile::parse(&text);
    assert!(!lockfile.has_entries_without_integrity());

    let text = format!("{HEADER}\"b@^1.0.0\":\n  version \"1.0.0\"\n");
    let (lockfile, _) = Lockfile::parse(&text);
    assert!(lockfile.has_entries_without_integrity());
}

#[test]
fn staleness_detection_matches_seed_scenario_3() {
    assert!(!is_stale("^1.0.0", true, false, "1.0.0"));
    assert!(is_stale("^1.2.0", true, false, "1.1.0"));
    assert!(!is_stale("^1.0.0", false, false, "1.0.0"));
    assert!(!is_stale("file:../a", true, true, "1.0.0"));
}
