use std::path::Path;

use pakt_primitives::Ident;

use crate::error::Error;
use crate::exotic::ExoticResolution;
use crate::manifest::Manifest;
use crate::reference::Remote;
use crate::registry::{RemoteDist, RemoteManifest};

/// Reads the manifest at a `file:<path>` dependency directly off disk —
/// the archive is already unpacked (or is a plain directory), so no
/// fetcher/extractor is needed, unlike `git`/`url`.
pub fn resolve(raw: &str, name: &Ident, cwd: &Path) -> Result<ExoticResolution, Error> {
    let rel_path = raw.strip_prefix("file:").unwrap_or(raw);
    let package_dir = cwd.join(rel_path);
    let manifest_path = package_dir.join("package.json");

    let contents = std::fs::read_to_string(&manifest_path)?;
    let manifest: Manifest = serde_json::from_str(&contents)?;

    let version = manifest.version.clone().unwrap_or_default();

    Ok(ExoticResolution {
        version: version.clone(),
        remote: Remote::File { path: package_dir },
        manifest: RemoteManifest {
            name: manifest.name.unwrap_or_else(|| name.clone()),
            version,
            dependencies: manifest.dependencies,
            optional_dependencies: manifest.optional_dependencies,
            dist: RemoteDist { tarball: String::new(), integrity: None },
        },
    })
}
