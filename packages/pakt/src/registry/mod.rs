mod npm;
mod static_registry;

pub use npm::NpmRegistry;
pub use static_registry::StaticRegistry;

use std::collections::BTreeMap;

use pakt_primitives::Ident;
use pakt_semver::Version;

use crate::error::Error;

/// The manifest fields a registry backend hands back for one concrete
/// version; a strict subset of `Manifest` (no `resolutions`/`workspaces` —
/// those only ever live in a local/root manifest).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteManifest {
    pub name: Ident,
    pub version: Version,
    pub dependencies: BTreeMap<Ident, String>,
    pub optional_dependencies: BTreeMap<Ident, String>,
    pub dist: RemoteDist,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteDist {
    pub tarball: String,
    pub integrity: Option<String>,
}

/// Everything a backend knows about a name: every published version
/// (sorted ascending, per spec.md §4.B's precondition on the Reducer), each
/// version's manifest, and the registry's own `dist-tags` map (consulted
/// when a request range is the literal `latest` and the backend wants to
/// honor a non-numerically-highest tag).
#[derive(Clone, Debug, Default)]
pub struct PackageInfo {
    pub versions: Vec<Version>,
    pub manifests: BTreeMap<Version, RemoteManifest>,
    pub dist_tags: BTreeMap<String, Version>,
}

impl PackageInfo {
    pub fn manifest_for(&self, version: &Version) -> Option<&RemoteManifest> {
        self.manifests.get(version)
    }
}

/// The contract the resolver consumes from a concrete registry
/// implementation, per spec.md §4.E. `filename` is the manifest file name
/// this registry expects at the root of a project (kept distinct per
/// backend so a workspace can mix registries); `load_config` hydrates
/// backend-specific settings (credentials, base URL) from rc files and
/// environment before the first `request`.
#[allow(async_fn_in_trait)]
pub trait RegistryBackend: Send + Sync {
    fn id(&self) -> &str;
    fn filename(&self) -> &str;

    fn load_config(&mut self) -> Result<(), Error>;

    /// Fetches every published version + manifest for `name`. Callers are
    /// expected to cache; the backend itself does not (that's
    /// `manifest_cache`'s job, layered on top by the resolver).
    async fn request(&self, name: &Ident) -> Result<PackageInfo, Error>;
}

/// Closed set of concrete backends the resolver dispatches across, matching
/// the match-on-variant idiom `exotic::resolve` uses rather than a trait
/// object — a native `async fn` in `RegistryBackend` isn't `dyn`-safe on
/// stable Rust, so `PackageResolver` holds one of these instead of a
/// `Box<dyn RegistryBackend>`.
#[derive(Debug)]
pub enum Registry {
    Npm(NpmRegistry),
    Static(StaticRegistry),
}

impl Registry {
    pub fn id(&self) -> &str {
        match self {
            Registry::Npm(backend) => backend.id(),
            Registry::Static(backend) => backend.id(),
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Registry::Npm(backend) => backend.filename(),
            Registry::Static(backend) => backend.filename(),
        }
    }

    pub fn load_config(&mut self) -> Result<(), Error> {
        match self {
            Registry::Npm(backend) => backend.load_config(),
            Registry::Static(backend) => backend.load_config(),
        }
    }

    pub async fn request(&self, name: &Ident) -> Result<PackageInfo, Error> {
        match self {
            Registry::Npm(backend) => backend.request(name).await,
            Registry::Static(backend) => backend.request(name).await,
        }
    }
}
