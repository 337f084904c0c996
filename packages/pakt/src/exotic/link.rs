use std::path::Path;

use pakt_primitives::Ident;

use crate::error::Error;
use crate::exotic::ExoticResolution;
use crate::manifest::Manifest;
use crate::reference::Remote;
use crate::registry::{RemoteDist, RemoteManifest};

/// A `link:<path>` dependency is resolved just enough to identify the
/// package (name/version), but — matching the teacher's `resolvers/link.rs`
/// — its own dependencies are never recursed into: a link is a raw
/// filesystem symlink the installer places as-is, not a package this
/// resolver manages the subtree of.
pub fn resolve(raw: &str, name: &Ident, cwd: &Path) -> Result<ExoticResolution, Error> {
    let rel_path = raw.strip_prefix("link:").unwrap_or(raw);
    let package_dir = cwd.join(rel_path);
    let manifest_path = package_dir.join("package.json");

    let (manifest_name, version) = match std::fs::read_to_string(&manifest_path) {
        Ok(contents) => {
            let manifest: Manifest = serde_json::from_str(&contents)?;
            (manifest.name.unwrap_or_else(|| name.clone()), manifest.version.unwrap_or_default())
        }
        Err(_) => (name.clone(), Default::default()),
    };

    Ok(ExoticResolution {
        version: version.clone(),
        remote: Remote::Link { path: package_dir },
        manifest: RemoteManifest {
            name: manifest_name,
            version,
            dependencies: Default::default(),
            optional_dependencies: Default::default(),
            dist: RemoteDist { tarball: String::new(), integrity: None },
        },
    })
}
