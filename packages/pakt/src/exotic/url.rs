use pakt_primitives::Ident;
use pakt_semver::{Version, VersionRc};

use crate::error::Error;
use crate::exotic::ExoticResolution;
use crate::reference::Remote;
use crate::registry::{RemoteDist, RemoteManifest};

/// A direct `http(s):<url>` tarball dependency. Same out-of-scope
/// reasoning as [`crate::exotic::git`]: downloading and unpacking the
/// archive to read its manifest belongs to the fetcher, not the resolver
/// core, so this commits to the identity (the url itself) as a leaf
/// package.
pub fn resolve(raw: &str, name: &Ident) -> Result<ExoticResolution, Error> {
    let version = Version::new_from_components(0, 0, 0, Some(vec![VersionRc::String(raw.to_string())]));

    Ok(ExoticResolution {
        version: version.clone(),
        remote: Remote::Url { url: raw.to_string() },
        manifest: RemoteManifest {
            name: name.clone(),
            version,
            dependencies: Default::default(),
            optional_dependencies: Default::default(),
            dist: RemoteDist { tarball: raw.to_string(), integrity: None },
        },
    })
}
