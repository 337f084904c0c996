use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use pakt_semver::{Range, Version};

use crate::error::Error;

const HEADER: &str = "# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.\n# pakt lockfile v1\n\n";
const LOCKFILE_FILENAME: &str = "pakt.lock";

/// One resolved entry. `dependencies`/`optional_dependencies`/`permissions`
/// are nested `key value` blocks; `prebuilt_variants` is opaque to the
/// resolver core (only read back out by a downstream installer), so it is
/// kept as a flat string map rather than a typed shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockEntry {
    pub name: Option<String>,
    pub version: String,
    pub resolved: Option<String>,
    pub integrity: Option<String>,
    pub registry: Option<String>,
    pub uid: Option<String>,
    pub dependencies: BTreeMap<String, String>,
    pub optional_dependencies: BTreeMap<String, String>,
    pub permissions: BTreeMap<String, String>,
    pub prebuilt_variants: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
struct LockGroup {
    patterns: Vec<String>,
    entry: LockEntry,
}

/// The outcome of parsing: a conflict-free file, one successfully
/// reconciled by taking the union of both sides of a merge conflict, or one
/// where reconciliation failed and the caller must warn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    Success,
    Merge,
    Conflict,
}

#[derive(Clone, Debug, Default)]
pub struct Lockfile {
    groups: Vec<LockGroup>,
}

impl Lockfile {
    pub fn empty() -> Lockfile {
        Lockfile { groups: Vec::new() }
    }

    /// Reads and parses `<dir>/pakt.lock`; an absent file yields an empty
    /// lockfile rather than an error.
    pub fn from_directory(dir: &Path) -> Result<(Lockfile, ParseOutcome), Error> {
        let path = dir.join(LOCKFILE_FILENAME);

        if !path.exists() {
            return Ok((Lockfile::empty(), ParseOutcome::Success));
        }

        let contents = std::fs::read_to_string(&path)?;
        Ok(Lockfile::parse(&contents))
    }

    pub fn parse(text: &str) -> (Lockfile, ParseOutcome) {
        if let Some((ours, theirs)) = split_merge_conflict(text) {
            let (lockfile_a, _) = Lockfile::parse(&ours);
            let (lockfile_b, _) = Lockfile::parse(&theirs);
            return merge_lockfiles(lockfile_a, lockfile_b);
        }

        (Lockfile { groups: parse_groups(text) }, ParseOutcome::Success)
    }

    /// Pattern-exact lookup. Comma-grouped patterns sharing one entry each
    /// resolve to the same `LockEntry`.
    pub fn get_locked(&self, pattern: &str) -> Option<&LockEntry> {
        self.groups.iter().find(|group| group.patterns.iter().any(|p| p == pattern)).map(|group| &group.entry)
    }

    pub fn remove_pattern(&mut self, pattern: &str) {
        for group in &mut self.groups {
            group.patterns.retain(|p| p != pattern);
        }

        self.groups.retain(|group| !group.patterns.is_empty());
    }

    /// Number of distinct resolved entries (after dedup-key collapsing),
    /// for a human-facing install summary.
    pub fn entry_count(&self) -> usize {
        self.groups.len()
    }

    /// `entries whose key matches @(file:|http)` are excluded from the
    /// legacy-migration check — local/URL deps never carry integrity.
    pub fn has_entries_without_integrity(&self) -> bool {
        self.groups.iter().any(|group| {
            group.entry.integrity.is_none()
                && !group.patterns.iter().any(|p| p.contains("file:") || p.contains("http"))
        })
    }

    /// Builds the serializable lockfile form from the final `{pattern →
    /// (version, remote dedup key, dependencies)}` map at the end of
    /// resolution. Patterns sharing a dedup key collapse onto one entry,
    /// owned by the first pattern in alphabetical sort order; `integrity`
    /// strings are re-tokenized and sorted for byte-stability.
    pub fn build(resolved: &[ResolvedPatternEntry]) -> Lockfile {
        let sorted = resolved.iter().sorted_by_key(|item| item.pattern.clone());

        let mut groups: Vec<LockGroup> = Vec::new();
        let mut owner_by_key: BTreeMap<String, usize> = BTreeMap::new();

        for item in sorted {
            if let Some(&index) = owner_by_key.get(&item.dedup_key) {
                groups[index].patterns.push(item.pattern.clone());
                continue;
            }

            let mut entry = item.entry.clone();
            entry.integrity = entry.integrity.map(|raw| canonicalize_integrity(&raw));

            owner_by_key.insert(item.dedup_key.clone(), groups.len());
            groups.push(LockGroup { patterns: vec![item.pattern.clone()], entry });
        }

        Lockfile { groups }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from(HEADER);

        let groups = self.groups.iter().sorted_by_key(|group| group.patterns.first().cloned());

        for group in groups {
            let key = group.patterns.iter().map(|p| quote(p)).collect::<Vec<_>>().join(", ");
            out.push_str(&key);
            out.push_str(":\n");

            if let Some(name) = &group.entry.name {
                out.push_str(&format!("  name {}\n", quote(name)));
            }
            out.push_str(&format!("  version {}\n", quote(&group.entry.version)));
            if let Some(resolved) = &group.entry.resolved {
                out.push_str(&format!("  resolved {}\n", quote(resolved)));
            }
            if let Some(integrity) = &group.entry.integrity {
                out.push_str(&format!("  integrity {integrity}\n"));
            }
            if let Some(registry) = &group.entry.registry {
                out.push_str(&format!("  registry {}\n", quote(registry)));
            }
            if let Some(uid) = &group.entry.uid {
                out.push_str(&format!("  uid {}\n", quote(uid)));
            }

            write_nested_block(&mut out, "dependencies", &group.entry.dependencies);
            write_nested_block(&mut out, "optionalDependencies", &group.entry.optional_dependencies);
            write_nested_block(&mut out, "permissions", &group.entry.permissions);
            write_nested_block(&mut out, "prebuiltVariants", &group.entry.prebuilt_variants);

            out.push('\n');
        }

        if out.ends_with("\n\n") {
            out.truncate(out.len() - 1);
        }

        out
    }
}

/// One entry of the final resolution, shaped for `Lockfile::build`.
#[derive(Clone, Debug)]
pub struct ResolvedPatternEntry {
    pub pattern: String,
    pub dedup_key: String,
    pub entry: LockEntry,
}

fn write_nested_block(out: &mut String, key: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() {
        return;
    }

    out.push_str(&format!("  {key}:\n"));
    for (k, v) in map {
        out.push_str(&format!("    {} {}\n", quote(k), quote(v)));
    }
}

fn quote(s: &str) -> String {
    if s.chars().all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')) {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// `integrity` strings are a whitespace-separated multiset of algorithm-hash
/// tokens; re-sorting makes two equal multisets serialize byte-identically
/// regardless of original token order.
fn canonicalize_integrity(raw: &str) -> String {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        inner.replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        trimmed.to_string()
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

struct Line<'a> {
    indent: usize,
    content: &'a str,
}

fn collect_lines(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| Line { indent: indent_of(line), content: line.trim_end() })
        .collect()
}

fn parse_groups(text: &str) -> Vec<LockGroup> {
    let lines = collect_lines(text);
    let mut groups = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let header = &lines[i];
        if header.indent != 0 || !header.content.trim_end().ends_with(':') {
            i += 1;
            continue;
        }

        let key_part = header.content.trim().trim_end_matches(':');
        let patterns = split_pattern_keys(key_part);
        i += 1;

        let mut entry = LockEntry::default();

        while i < lines.len() && lines[i].indent >= 2 {
            let line = &lines[i];

            if line.indent != 2 {
                i += 1;
                continue;
            }

            let body = line.content.trim();

            if let Some(block_key) = body.strip_suffix(':') {
                i += 1;
                let map = parse_nested_map(&lines, &mut i, 4);

                match block_key {
                    "dependencies" => entry.dependencies = map,
                    "optionalDependencies" => entry.optional_dependencies = map,
                    "permissions" => entry.permissions = map,
                    "prebuiltVariants" => entry.prebuilt_variants = map,
                    _ => {}
                }

                continue;
            }

            if let Some((key, value)) = body.split_once(' ') {
                match key {
                    "name" => entry.name = Some(unquote(value)),
                    "version" => entry.version = unquote(value),
                    "resolved" => entry.resolved = Some(unquote(value)),
                    "integrity" => entry.integrity = Some(unquote(value)),
                    "registry" => entry.registry = Some(unquote(value)),
                    "uid" => entry.uid = Some(unquote(value)),
                    _ => {}
                }
            }

            i += 1;
        }

        groups.push(LockGroup { patterns, entry });
    }

    groups
}

fn parse_nested_map(lines: &[Line], i: &mut usize, indent: usize) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();

    while *i < lines.len() && lines[*i].indent >= indent {
        if lines[*i].indent != indent {
            *i += 1;
            continue;
        }

        let body = lines[*i].content.trim();
        if let Some((key, value)) = body.split_once(' ') {
            map.insert(unquote(key), unquote(value));
        }

        *i += 1;
    }

    map
}

/// Splits `"a@^1.0.0", "a@^1.1.0"` into its member pattern strings.
fn split_pattern_keys(key_part: &str) -> Vec<String> {
    key_part.split(',').map(|s| unquote(s.trim())).collect()
}

/// Scans for a single top-level merge conflict and splits the text into the
/// two conflicting halves, each substituted back into the full document
/// (so context on either side of the conflict region is preserved for both
/// halves). Returns `None` if there is no conflict to reconcile.
fn split_merge_conflict(text: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = text.lines().collect();

    let start = lines.iter().position(|l| l.starts_with("<<<<<<<"))?;
    let middle = lines[start..].iter().position(|l| l.starts_with("======="))? + start;
    let end = lines[middle..].iter().position(|l| l.starts_with(">>>>>>>"))? + middle;

    let before = &lines[..start];
    let ours = &lines[start + 1..middle];
    let theirs = &lines[middle + 1..end];
    let after = &lines[end + 1..];

    let build = |side: &[&str]| {
        [before, side, after].concat().join("\n")
    };

    Some((build(ours), build(theirs)))
}

fn merge_lockfiles(a: Lockfile, b: Lockfile) -> (Lockfile, ParseOutcome) {
    let mut merged = a.clone();
    let mut outcome = ParseOutcome::Merge;

    for group in b.groups {
        let already_present = group.patterns.iter().any(|p| merged.get_locked(p).is_some());

        if already_present {
            let agrees = group.patterns.iter().all(|p| merged.get_locked(p) == Some(&group.entry));
            if !agrees {
                outcome = ParseOutcome::Conflict;
            }
            continue;
        }

        merged.groups.push(group);
    }

    (merged, outcome)
}

/// An entry is stale (and must be replaced) when its range is a concrete,
/// non-exotic, explicit range that the locked version no longer satisfies.
pub fn is_stale(range_str: &str, has_version: bool, is_exotic: bool, entry_version: &str) -> bool {
    if is_exotic || !has_version {
        return false;
    }

    let Ok(range) = Range::from_str(range_str) else { return false };
    let Ok(version) = Version::from_str(entry_version) else { return false };

    !range.check_ignore_rc(&version)
}

#[cfg(test)]
#[path = "./lockfile.test.rs"]
mod lockfile_tests;
