use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use pakt_primitives::{Ident, Pattern, PatternRange};

use crate::error::Error;
use crate::manifest::Manifest;

const REGISTRY_FOLDER: &str = "node_modules";

/// One sibling project discovered from a `workspaces.packages` glob.
#[derive(Clone, Debug)]
pub struct WorkspaceEntry {
    pub manifest: Manifest,
    pub location: PathBuf,
}

/// An in-memory registry of sibling projects, discovered by walking
/// upward from `cwd` to find the workspace root and then expanding its
/// `workspaces.packages` globs, per spec.md §4.I.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    entries: BTreeMap<Ident, WorkspaceEntry>,
}

impl WorkspaceLayout {
    pub fn get(&self, name: &Ident) -> Option<&WorkspaceEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &WorkspaceEntry)> {
        self.entries.iter()
    }

    /// Normalizes `pattern`, looks it up by name, and requires the
    /// workspace's own version to satisfy the pattern's range — a
    /// workspace is not a valid answer to `foo@^2.0.0` if it's at `1.0.0`.
    pub fn get_manifest_by_pattern(&self, pattern: &Pattern) -> Option<&WorkspaceEntry> {
        let entry = self.entries.get(&pattern.name)?;
        let version = entry.manifest.version.clone().unwrap_or_default();

        let satisfies = match &pattern.range {
            PatternRange::Latest => true,
            PatternRange::Semver(range) => range.check_ignore_rc(&version),
            PatternRange::Exotic(_) => false,
        };

        satisfies.then_some(entry)
    }

    /// Walks upward from `initial` looking for a directory whose manifest
    /// declares `workspaces` and whose relative path to `initial` is
    /// either empty (we started at the root itself) or matches one of its
    /// `workspaces.packages` globs. Stops at the filesystem root.
    pub fn find_workspace_root(initial: &Path, manifest_filename: &str) -> Result<Option<PathBuf>, Error> {
        let mut candidate = Some(initial.to_path_buf());

        while let Some(dir) = candidate {
            let manifest_path = dir.join(manifest_filename);

            if let Ok(contents) = std::fs::read_to_string(&manifest_path) {
                let manifest: Manifest = serde_json::from_str(&contents)?;

                if let Some(workspaces) = &manifest.workspaces {
                    let rel = initial.strip_prefix(&dir).unwrap_or(Path::new(""));

                    if rel.as_os_str().is_empty() || matches_any_glob(workspaces.packages(), rel) {
                        return Ok(Some(dir));
                    }
                }
            }

            candidate = dir.parent().map(PathBuf::from);
        }

        Ok(None)
    }

    /// Expands `root_manifest.workspaces.packages` under `root`, matching
    /// directories that contain `manifest_filename`, skipping anything
    /// nested under a registry folder (`node_modules`) at any depth.
    /// Enforces: every match needs `name` + `version`; no duplicate names;
    /// a non-empty `workspaces.nohoist` requires `private: true` (checked
    /// below alongside the bare `workspaces` field) and the nohoist feature
    /// enabled via `nohoist_enabled`.
    pub fn discover(root: PathBuf, root_manifest: &Manifest, manifest_filename: &str, nohoist_enabled: bool) -> Result<WorkspaceLayout, Error> {
        let Some(workspaces) = &root_manifest.workspaces else {
            return Ok(WorkspaceLayout { root, entries: BTreeMap::new() });
        };

        if !root_manifest.private {
            return Err(Error::NonPrivateWorkspaceRoot(root.display().to_string()));
        }

        if !workspaces.nohoist().is_empty() && !nohoist_enabled {
            return Err(Error::NohoistFeatureDisabled(root.display().to_string()));
        }

        let matchers: Vec<GlobMatcher> = workspaces
            .packages()
            .iter()
            .map(|pattern| Glob::new(pattern).map(|g| g.compile_matcher()))
            .collect::<Result<_, _>>()
            .map_err(|err| Error::UserError(format!("invalid workspaces glob: {err}")))?;

        let mut entries: BTreeMap<Ident, WorkspaceEntry> = BTreeMap::new();
        let mut found_dirs = Vec::new();
        collect_candidate_dirs(&root, &root, &mut found_dirs)?;

        for dir in found_dirs {
            let rel = dir.strip_prefix(&root).unwrap_or(&dir);

            if !matchers.iter().any(|m| m.is_match(rel)) {
                continue;
            }

            let manifest_path = dir.join(manifest_filename);
            let Ok(contents) = std::fs::read_to_string(&manifest_path) else { continue };
            let manifest: Manifest = serde_json::from_str(&contents)?;

            let name = manifest.name.clone().ok_or_else(|| Error::IncompleteWorkspaceManifest(dir.display().to_string()))?;
            if manifest.version.is_none() {
                return Err(Error::IncompleteWorkspaceManifest(dir.display().to_string()));
            }

            if entries.contains_key(&name) {
                return Err(Error::DuplicateWorkspaceName(name));
            }

            entries.insert(name, WorkspaceEntry { manifest, location: dir });
        }

        Ok(WorkspaceLayout { root, entries })
    }
}

fn matches_any_glob(packages: &[String], rel: &Path) -> bool {
    packages.iter().any(|pattern| {
        Glob::new(pattern).map(|g| g.compile_matcher().is_match(rel)).unwrap_or(false)
    })
}

/// Recursively enumerates every directory under `root` (skipping any
/// subtree named like a package-manager install folder), so glob matching
/// can run against the full candidate set in one pass.
fn collect_candidate_dirs(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), Error> {
    if dir != root {
        out.push(dir.to_path_buf());
    }

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(_) => return Ok(()),
    };

    for entry in read_dir {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if !file_type.is_dir() {
            continue;
        }

        if entry.file_name() == REGISTRY_FOLDER {
            continue;
        }

        collect_candidate_dirs(root, &entry.path(), out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), json).unwrap();
    }

    #[test]
    fn discovers_sibling_workspaces_and_skips_node_modules() {
        let root = std::env::temp_dir().join(format!("pakt-workspace-test-{}", std::process::id()));
        fs::create_dir_all(&root).ok();

        write_manifest(&root, r#"{"name":"root","version":"1.0.0","private":true,"workspaces":["packages/*"]}"#);
        write_manifest(&root.join("packages/a"), r#"{"name":"a","version":"1.0.0"}"#);
        write_manifest(&root.join("packages/b"), r#"{"name":"b","version":"2.0.0"}"#);
        write_manifest(&root.join("node_modules/should-be-skipped"), r#"{"name":"nope","version":"9.9.9"}"#);

        let root_manifest: Manifest = serde_json::from_str(&fs::read_to_string(root.join("package.json")).unwrap()).unwrap();
        let layout = WorkspaceLayout::discover(root.clone(), &root_manifest, "package.json", false).unwrap();

        assert!(layout.get(&Ident::new("a")).is_some());
        assert!(layout.get(&Ident::new("b")).is_some());
        assert!(layout.get(&Ident::new("nope")).is_none());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn duplicate_workspace_names_are_rejected() {
        let root = std::env::temp_dir().join(format!("pakt-workspace-dup-test-{}", std::process::id()));
        fs::create_dir_all(&root).ok();

        write_manifest(&root, r#"{"name":"root","version":"1.0.0","private":true,"workspaces":["packages/*"]}"#);
        write_manifest(&root.join("packages/a"), r#"{"name":"dup","version":"1.0.0"}"#);
        write_manifest(&root.join("packages/b"), r#"{"name":"dup","version":"2.0.0"}"#);

        let root_manifest: Manifest = serde_json::from_str(&fs::read_to_string(root.join("package.json")).unwrap()).unwrap();
        let result = WorkspaceLayout::discover(root.clone(), &root_manifest, "package.json", false);
        assert!(matches!(result, Err(Error::DuplicateWorkspaceName(_))));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn nohoist_without_the_feature_enabled_is_rejected() {
        let root = std::env::temp_dir().join(format!("pakt-workspace-nohoist-test-{}", std::process::id()));
        fs::create_dir_all(&root).ok();

        write_manifest(
            &root,
            r#"{"name":"root","version":"1.0.0","private":true,"workspaces":{"packages":["packages/*"],"nohoist":["**/electron"]}}"#,
        );
        write_manifest(&root.join("packages/a"), r#"{"name":"a","version":"1.0.0"}"#);

        let root_manifest: Manifest = serde_json::from_str(&fs::read_to_string(root.join("package.json")).unwrap()).unwrap();

        let result = WorkspaceLayout::discover(root.clone(), &root_manifest, "package.json", false);
        assert!(matches!(result, Err(Error::NohoistFeatureDisabled(_))));

        let layout = WorkspaceLayout::discover(root.clone(), &root_manifest, "package.json", true).unwrap();
        assert!(layout.get(&Ident::new("a")).is_some());

        fs::remove_dir_all(&root).ok();
    }
}
