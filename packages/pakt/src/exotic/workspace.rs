use pakt_primitives::Ident;
use pakt_semver::Range;

use crate::error::Error;
use crate::exotic::ExoticResolution;
use crate::reference::Remote;
use crate::registry::{RemoteDist, RemoteManifest};
use crate::workspace::WorkspaceLayout;

/// Resolves a `workspace:<range>` dependency against the in-memory
/// `WorkspaceLayout`, per spec.md §4.I — a sibling workspace acts as its
/// own registry, so this never touches the network or a lockfile entry.
pub fn resolve(raw: &str, name: &Ident, workspaces: Option<&WorkspaceLayout>) -> Result<ExoticResolution, Error> {
    let workspaces = workspaces.ok_or_else(|| Error::UserError(format!("{name} has a workspace: dependency but no workspace layout was discovered")))?;

    let range_str = raw.strip_prefix("workspace:").unwrap_or(raw);
    let workspace = workspaces
        .get(name)
        .ok_or_else(|| Error::UserError(format!("no workspace named {name} found for a workspace: dependency")))?;

    if !matches!(range_str, "" | "*" | "^" | "~") {
        let range = Range::parse_loose(range_str)?;
        if !range.check_ignore_rc(&workspace.manifest.version.clone().unwrap_or_default()) {
            return Err(Error::UserError(format!(
                "workspace {name} is at version {} which does not satisfy {range_str}",
                workspace.manifest.version.clone().unwrap_or_default(),
            )));
        }
    }

    let manifest = &workspace.manifest;
    let version = manifest.version.clone().unwrap_or_default();

    Ok(ExoticResolution {
        version: version.clone(),
        remote: Remote::Workspace { loc: workspace.location.clone() },
        manifest: RemoteManifest {
            name: name.clone(),
            version,
            dependencies: manifest.dependencies.clone(),
            optional_dependencies: manifest.optional_dependencies.clone(),
            dist: RemoteDist { tarball: String::new(), integrity: None },
        },
    })
}
