mod file;
mod git;
mod link;
mod url;
mod workspace;

use pakt_primitives::{ExoticRange, Ident};
use pakt_semver::Version;

use crate::error::Error;
use crate::registry::RemoteManifest;
use crate::reference::Remote;
use crate::workspace::WorkspaceLayout;

/// What an exotic resolver hands back: the same shape a registry backend
/// would produce for a semver pattern, so the rest of `PackageRequest`
/// (building a `PackageReference`, recursing into dependencies) doesn't
/// need to know whether a name came from a registry or a non-registry
/// source.
pub struct ExoticResolution {
    pub version: Version,
    pub remote: Remote,
    pub manifest: RemoteManifest,
}

/// Dispatches on the `ExoticRange` variant, matching the teacher's
/// `resolvers::resolve_descriptor` match-on-range-variant idiom (see
/// `zpm/src/resolvers/mod.rs`) rather than a trait-object registry, since
/// the variant set is closed and known at compile time.
///
/// `file`/`link`/`workspace` are resolved entirely locally — no network or
/// archive extraction needed, so they are fully implemented here. `git`/
/// `url` would need to fetch and extract an archive to read its manifest,
/// which spec.md §1 places out of scope for this core; those two variants
/// resolve to a leaf package (no further dependency recursion) whose
/// version is derived from the reference itself, deferring manifest
/// introspection to the downstream fetcher (see DESIGN.md).
pub async fn resolve(
    exotic: &ExoticRange,
    name: &Ident,
    cwd: &std::path::Path,
    workspaces: Option<&WorkspaceLayout>,
) -> Result<ExoticResolution, Error> {
    match exotic {
        ExoticRange::File(raw) => file::resolve(raw, name, cwd),
        ExoticRange::Link(raw) => link::resolve(raw, name, cwd),
        ExoticRange::Workspace(raw) => workspace::resolve(raw, name, workspaces),
        ExoticRange::Git(raw) => git::resolve(raw, name),
        ExoticRange::Url(raw) => url::resolve(raw, name),
    }
}
