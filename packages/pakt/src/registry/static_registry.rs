use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use pakt_primitives::Ident;
use pakt_semver::Version;
use serde::Deserialize;

use crate::error::Error;
use crate::registry::{PackageInfo, RegistryBackend, RemoteDist, RemoteManifest};

/// Reads a pre-fetched registry document from `<root>/<name>.json`, for
/// `--offline`/`--prefer-offline` and for test fixtures that want a
/// deterministic candidate set without a network call, per spec.md §4.E.
#[derive(Debug)]
pub struct StaticRegistry {
    id: String,
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    versions: BTreeMap<String, FixtureVersion>,
    #[serde(default)]
    dist_tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FixtureVersion {
    #[serde(default)]
    dependencies: BTreeMap<Ident, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<Ident, String>,
    #[serde(default)]
    tarball: Option<String>,
    #[serde(default)]
    integrity: Option<String>,
}

impl StaticRegistry {
    pub fn new(id: impl Into<String>, root: PathBuf) -> StaticRegistry {
        StaticRegistry { id: id.into(), root }
    }
}

impl RegistryBackend for StaticRegistry {
    fn id(&self) -> &str {
        &self.id
    }

    fn filename(&self) -> &str {
        "package.json"
    }

    fn load_config(&mut self) -> Result<(), Error> {
        Ok(())
    }

    async fn request(&self, name: &Ident) -> Result<PackageInfo, Error> {
        let path = self.root.join(format!("{}.json", name.as_str().replace('/', "__")));
        let contents = std::fs::read_to_string(&path)?;
        let document: FixtureDocument = serde_json::from_str(&contents)?;

        let mut versions: Vec<Version> = document.versions.keys().map(|v| Version::from_str(v)).collect::<Result<_, _>>()?;
        versions.sort();

        let mut manifests = BTreeMap::new();
        for (raw_version, entry) in &document.versions {
            let version = Version::from_str(raw_version)?;
            manifests.insert(
                version.clone(),
                RemoteManifest {
                    name: name.clone(),
                    version,
                    dependencies: entry.dependencies.clone(),
                    optional_dependencies: entry.optional_dependencies.clone(),
                    dist: RemoteDist {
                        tarball: entry.tarball.clone().unwrap_or_default(),
                        integrity: entry.integrity.clone(),
                    },
                },
            );
        }

        let mut dist_tags = BTreeMap::new();
        for (tag, raw_version) in &document.dist_tags {
            dist_tags.insert(tag.clone(), Version::from_str(raw_version)?);
        }

        Ok(PackageInfo { versions, manifests, dist_tags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_fixture_document() {
        let dir = std::env::temp_dir().join(format!("pakt-static-registry-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("a.json"),
            r#"{"versions":{"1.0.0":{"tarball":"https://x/a-1.0.0.tgz"},"1.1.0":{"tarball":"https://x/a-1.1.0.tgz"}},"dist_tags":{"latest":"1.1.0"}}"#,
        ).unwrap();

        let registry = StaticRegistry::new("static", dir.clone());
        let info = futures::executor::block_on(registry.request(&Ident::new("a"))).unwrap();

        assert_eq!(info.versions, vec![Version::from_str("1.0.0").unwrap(), Version::from_str("1.1.0").unwrap()]);
        assert_eq!(info.dist_tags.get("latest"), Some(&Version::from_str("1.1.0").unwrap()));

        std::fs::remove_dir_all(&dir).ok();
    }
}
