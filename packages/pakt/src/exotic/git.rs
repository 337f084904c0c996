use pakt_primitives::Ident;
use pakt_semver::{Version, VersionRc};

use crate::error::Error;
use crate::exotic::ExoticResolution;
use crate::reference::Remote;
use crate::registry::{RemoteDist, RemoteManifest};

/// A `git[+scheme]:<url>[#commit]` dependency. Cloning the repository and
/// reading its manifest is archive fetch/extraction work spec.md §1 places
/// out of scope for this core (it belongs to the downstream fetcher); this
/// resolver commits to the identity (url + committish) without recursing
/// into whatever dependencies the cloned package itself declares. A
/// downstream fetcher that does perform the clone can call back into the
/// resolver with the discovered manifest to fill in the gap (see
/// DESIGN.md's "git/url resolution" entry).
pub fn resolve(raw: &str, name: &Ident) -> Result<ExoticResolution, Error> {
    let (url, committish) = match raw.split_once('#') {
        Some((url, committish)) => (url.to_string(), Some(committish.to_string())),
        None => (raw.to_string(), None),
    };

    let version = placeholder_version(raw);

    Ok(ExoticResolution {
        version: version.clone(),
        remote: Remote::Git { url: url.clone(), commit: committish },
        manifest: RemoteManifest {
            name: name.clone(),
            version,
            dependencies: Default::default(),
            optional_dependencies: Default::default(),
            dist: RemoteDist { tarball: String::new(), integrity: None },
        },
    })
}

/// `0.0.0-<reference>` so the version stays orderable/displayable while
/// carrying enough information that two distinct git references never
/// collide (spec.md §9's "uid vs version" open question, resolved for the
/// git/url case by folding the whole reference into the prerelease tag).
fn placeholder_version(raw: &str) -> Version {
    Version::new_from_components(0, 0, 0, Some(vec![VersionRc::String(raw.to_string())]))
}
