use std::collections::BTreeSet;
use std::path::PathBuf;

use pakt_primitives::Ident;
use pakt_semver::Version;

/// Index into `Resolver`'s reference arena. Stands in for the back-pointer
/// (`reference.patterns` / `manifest._reference`) the source implementation
/// keeps as mutual object references — see spec.md §9 "Back-references".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(pub usize);

/// Opaque descriptor telling the fetcher how to retrieve a package. The
/// resolver core never interprets it beyond storing and comparing it (two
/// References with equal `(name, version, remote)` collapse into one, per
/// spec.md §3 invariant 3).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Remote {
    Registry { registry: String, resolved: String, integrity: Option<String> },
    File { path: PathBuf },
    Link { path: PathBuf },
    Url { url: String },
    Git { url: String, commit: Option<String> },
    Workspace { loc: PathBuf },
}

impl Remote {
    /// The key invariant 3 dedups on: two References sharing this key are
    /// the same concrete package regardless of how many patterns found it.
    pub fn dedup_key(&self) -> String {
        match self {
            Remote::Registry { resolved, .. } => resolved.clone(),
            Remote::File { path } => format!("file:{}", path.display()),
            Remote::Link { path } => format!("link:{}", path.display()),
            Remote::Url { url } => url.clone(),
            Remote::Git { url, commit } => format!("git:{url}#{}", commit.as_deref().unwrap_or("")),
            Remote::Workspace { loc } => format!("workspace:{}", loc.display()),
        }
    }
}

/// Three-state monotonic flag: once a Reference is required by any
/// requester it stays required, per spec.md §9's `join` law.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Optionality {
    #[default]
    Uninit,
    Optional,
    Required,
}

impl Optionality {
    pub fn join(self, other: Optionality) -> Optionality {
        match (self, other) {
            (Optionality::Required, _) | (_, Optionality::Required) => Optionality::Required,
            (Optionality::Uninit, x) | (x, Optionality::Uninit) => x,
            (Optionality::Optional, Optionality::Optional) => Optionality::Optional,
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Optionality::Required)
    }
}

/// A `(requester pattern, depth)` pair; `depth` feeds `level` (minimum
/// observed depth from any root).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Request {
    pub pattern: String,
    pub depth: usize,
}

/// The resolver's identity for one concrete resolved package (spec.md §3).
#[derive(Clone, Debug)]
pub struct PackageReference {
    pub name: Ident,
    pub version: Version,
    /// Equals `version.to_string()` for registry packages; includes a
    /// remote-derived suffix for non-registry sources that share a version
    /// but differ in remote (spec.md §9 open question — resolved in
    /// DESIGN.md by hashing the dedup key when the remote is non-registry).
    pub uid: String,
    pub registry: String,
    pub remote: Remote,

    pub patterns: BTreeSet<String>,
    pub requests: Vec<Request>,
    pub level: usize,
    pub optional: Optionality,

    pub ignore: bool,
    pub incompatible: bool,
    pub fresh: bool,

    pub permissions: BTreeSet<String>,
    pub locations: Vec<PathBuf>,
}

impl PackageReference {
    pub fn new(name: Ident, version: Version, registry: String, remote: Remote) -> PackageReference {
        let uid = match &remote {
            Remote::Registry { .. } => version.to_string(),
            other => format!("{}-{:x}", version, fnv1a(other.dedup_key().as_bytes())),
        };

        PackageReference {
            name,
            version,
            uid,
            registry,
            remote,
            patterns: BTreeSet::new(),
            requests: Vec::new(),
            level: usize::MAX,
            optional: Optionality::Uninit,
            ignore: false,
            incompatible: false,
            fresh: true,
            permissions: BTreeSet::new(),
            locations: Vec::new(),
        }
    }

    pub fn add_pattern(&mut self, pattern: String) {
        self.patterns.insert(pattern);
    }

    pub fn add_request(&mut self, pattern: String, depth: usize) {
        self.level = self.level.min(depth);
        self.requests.push(Request { pattern, depth });
    }

    /// Monotonic toward required: once set required it never reverts.
    pub fn add_optional(&mut self, optional: bool) {
        let incoming = if optional { Optionality::Optional } else { Optionality::Required };
        self.optional = self.optional.join(incoming);
    }

    pub fn add_location(&mut self, location: PathBuf) {
        self.locations.push(location);
    }

    pub fn set_permission(&mut self, permission: impl Into<String>) {
        self.permissions.insert(permission.into());
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Small non-cryptographic hash, only used to disambiguate non-registry
/// remotes sharing a version; collisions would merely over-share a uid,
/// never corrupt resolution correctness.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optionality_join_is_monotonic_toward_required() {
        assert_eq!(Optionality::Uninit.join(Optionality::Optional), Optionality::Optional);
        assert_eq!(Optionality::Optional.join(Optionality::Required), Optionality::Required);
        assert_eq!(Optionality::Required.join(Optionality::Optional), Optionality::Required);
        assert_eq!(Optionality::Uninit.join(Optionality::Uninit), Optionality::Uninit);
    }

    #[test]
    fn registry_remotes_use_bare_version_as_uid() {
        let reference = PackageReference::new(
            Ident::new("a"),
            Version::new_from_components(1, 0, 0, None),
            "npm".to_string(),
            Remote::Registry { registry: "npm".to_string(), resolved: "https://registry/a/-/a-1.0.0.tgz".to_string(), integrity: None },
        );
        assert_eq!(reference.uid, "1.0.0");
    }

    #[test]
    fn non_registry_remotes_get_a_disambiguated_uid() {
        let a = PackageReference::new(
            Ident::new("a"),
            Version::new_from_components(1, 0, 0, None),
            "exotic".to_string(),
            Remote::Git { url: "https://host/a.git".to_string(), commit: Some("abc".to_string()) },
        );
        let b = PackageReference::new(
            Ident::new("a"),
            Version::new_from_components(1, 0, 0, None),
            "exotic".to_string(),
            Remote::Git { url: "https://host/a.git".to_string(), commit: Some("def".to_string()) },
        );
        assert_ne!(a.uid, b.uid);
    }
}
