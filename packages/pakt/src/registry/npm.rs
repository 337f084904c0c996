use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use pakt_primitives::Ident;
use pakt_semver::Version;
use serde::Deserialize;

use crate::error::Error;
use crate::registry::{PackageInfo, RegistryBackend, RemoteDist, RemoteManifest};

/// npm-protocol registry: `GET /<name>` returns a `versions` map plus
/// `dist-tags`, matching the teacher's `resolvers/npm.rs` wire shape
/// (minus the scripts/node-gyp patching, which belongs to a downstream
/// fetcher, not the resolver core).
#[derive(Debug)]
pub struct NpmRegistry {
    id: String,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    versions: BTreeMap<String, RegistryVersion>,
    #[serde(rename = "dist-tags", default)]
    dist_tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RegistryVersion {
    name: Ident,
    version: Version,
    #[serde(default)]
    dependencies: BTreeMap<Ident, String>,
    #[serde(rename = "optionalDependencies", default)]
    optional_dependencies: BTreeMap<Ident, String>,
    dist: RegistryDist,
}

#[derive(Debug, Deserialize)]
struct RegistryDist {
    tarball: String,
    #[serde(default)]
    integrity: Option<String>,
}

impl NpmRegistry {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, network_timeout_ms: u64) -> NpmRegistry {
        NpmRegistry {
            id: id.into(),
            base_url: base_url.into(),
            auth_token: None,
            timeout: Duration::from_millis(network_timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    /// The `<PREFIX>_AUTH_TOKEN`/`<PREFIX>_REGISTRY` environment convention
    /// a registry backend reads its own credentials from, per spec.md
    /// §4.E's "environment merging with a per-backend prefix".
    fn env_prefix(&self) -> String {
        format!("{}_", self.id.to_uppercase())
    }
}

impl RegistryBackend for NpmRegistry {
    fn id(&self) -> &str {
        &self.id
    }

    fn filename(&self) -> &str {
        "package.json"
    }

    fn load_config(&mut self) -> Result<(), Error> {
        let prefix = self.env_prefix();

        if let Ok(registry) = std::env::var(format!("{prefix}REGISTRY")) {
            self.base_url = registry;
        }

        if let Ok(token) = std::env::var(format!("{prefix}AUTH_TOKEN")) {
            self.auth_token = Some(token);
        }

        Ok(())
    }

    async fn request(&self, name: &Ident) -> Result<PackageInfo, Error> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), name.as_str());

        let mut request = self.client.get(&url).timeout(self.timeout);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let document: RegistryDocument = response.json().await?;

        let mut versions: Vec<Version> = document.versions.keys().map(|v| Version::from_str(v)).collect::<Result<_, _>>()?;
        versions.sort();

        let mut manifests = BTreeMap::new();
        for (raw_version, entry) in &document.versions {
            let version = Version::from_str(raw_version)?;
            manifests.insert(
                version,
                RemoteManifest {
                    name: entry.name.clone(),
                    version: entry.version.clone(),
                    dependencies: entry.dependencies.clone(),
                    optional_dependencies: entry.optional_dependencies.clone(),
                    dist: RemoteDist { tarball: entry.dist.tarball.clone(), integrity: entry.dist.integrity.clone() },
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
