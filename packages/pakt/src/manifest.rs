use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pakt_primitives::Ident;
use pakt_semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::reference::{ReferenceId, Remote};

/// Either shorthand (`["packages/*"]`) or the full object form of a root
/// manifest's `workspaces` field.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WorkspacesField {
    Shorthand(Vec<String>),
    Full {
        packages: Vec<String>,
        #[serde(default)]
        nohoist: Vec<String>,
    },
}

impl WorkspacesField {
    pub fn packages(&self) -> &[String] {
        match self {
            WorkspacesField::Shorthand(packages) => packages,
            WorkspacesField::Full { packages, .. } => packages,
        }
    }

    pub fn nohoist(&self) -> &[String] {
        match self {
            WorkspacesField::Shorthand(_) => &[],
            WorkspacesField::Full { nohoist, .. } => nohoist,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstallConfigFlags {
    #[serde(default)]
    pub hoist: Option<bool>,
}

/// The normalized form of a manifest file (`package.json` or equivalent).
/// Dependency maps hold raw range strings, not parsed `Pattern`s — the
/// name is already the map key, and parsing is deferred to request
/// construction so a malformed range in a never-visited branch doesn't
/// fail manifest loading outright.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<Ident>,
    pub version: Option<Version>,

    #[serde(default)]
    pub dependencies: BTreeMap<Ident, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<Ident, String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<Ident, String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<Ident, String>,

    #[serde(default)]
    pub resolutions: BTreeMap<String, String>,
    #[serde(default)]
    pub workspaces: Option<WorkspacesField>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub install_config: InstallConfigFlags,

    /// Set once this manifest has been bound to a resolved package; absent
    /// for manifests still in flight (e.g. just fetched, not yet committed).
    #[serde(skip)]
    pub reference: Option<ReferenceId>,
    #[serde(skip)]
    pub remote: Option<Remote>,
    #[serde(skip)]
    pub uid: Option<String>,
    #[serde(skip)]
    pub registry: Option<String>,
    #[serde(skip)]
    pub loc: Option<PathBuf>,

    /// `prebuiltVariants` is opaque to the resolver core; it is only ever
    /// read back out for a downstream fetcher/installer, so it is kept as a
    /// raw JSON value rather than a typed field.
    #[serde(default)]
    pub prebuilt_variants: Option<serde_json::Value>,

    /// Newly discovered this run (absent from or stale in the lockfile).
    /// Preserved across `update_manifest` so a manifest refresh doesn't
    /// lose track of its freshness.
    #[serde(skip)]
    pub fresh: bool,
}

impl Manifest {
    /// All dependency entries the resolver should recurse into at this
    /// manifest, honoring `production` (drop `devDependencies` unless this
    /// is the root and `production` is false) per spec.md §6.
    pub fn dependency_entries(&self, include_dev: bool) -> Vec<(Ident, String)> {
        let mut entries: Vec<(Ident, String)> = self.dependencies.iter()
            .chain(self.optional_dependencies.iter())
            .map(|(name, range)| (name.clone(), range.clone()))
            .collect();

        if include_dev {
            entries.extend(self.dev_dependencies.iter().map(|(name, range)| (name.clone(), range.clone())));
        }

        entries
    }

    pub fn is_optional_dependency(&self, name: &Ident) -> bool {
        self.optional_dependencies.contains_key(name)
    }
}

/// Reads and parses the manifest at `abs_path` (`package.json` or
/// equivalent). An absent file parses as the empty default rather than
/// erroring, matching the root-manifest-optional posture of `pmrc`-less
/// directories.
pub fn read_manifest(abs_path: &Path) -> Result<Manifest, Error> {
    if !abs_path.exists() {
        return Ok(Manifest::default());
    }

    let text = std::fs::read_to_string(abs_path)?;
    parse_manifest(&text)
}

pub fn parse_manifest(manifest_text: &str) -> Result<Manifest, Error> {
    if manifest_text.is_empty() {
        return Ok(Manifest::default());
    }

    Ok(serde_json::from_str(manifest_text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_shorthand_workspaces() {
        let manifest: Manifest = serde_json::from_str(r#"{"name":"root","version":"1.0.0","private":true,"workspaces":["packages/*"]}"#).unwrap();
        assert_eq!(manifest.workspaces.unwrap().packages(), &["packages/*".to_string()]);
    }

    #[test]
    fn deserializes_full_workspaces_with_nohoist() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"name":"root","version":"1.0.0","private":true,"workspaces":{"packages":["packages/*"],"nohoist":["**/electron"]}}"#,
        ).unwrap();
        let workspaces = manifest.workspaces.unwrap();
        assert_eq!(workspaces.packages(), &["packages/*".to_string()]);
        assert_eq!(workspaces.nohoist(), &["**/electron".to_string()]);
    }

    #[test]
    fn dependency_entries_includes_dev_only_when_requested() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"name":"a","version":"1.0.0","dependencies":{"b":"^1.0.0"},"devDependencies":{"c":"^1.0.0"}}"#,
        ).unwrap();

        assert_eq!(manifest.dependency_entries(false).len(), 1);
        assert_eq!(manifest.dependency_entries(true).len(), 2);
    }
}
