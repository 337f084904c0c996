use std::rc::Rc;

use pakt_primitives::{Ident, Pattern, PatternRange};
use pakt_semver::Version;

use crate::error::{ConstraintFailure, Error};
use crate::exotic;
use crate::reducer;
use crate::reference::Remote;
use crate::registry::RemoteManifest;
use crate::resolver::{PackageResolver, ResolutionStep};

/// One `(pattern, parent-chain, optional)` unit of work, per spec.md §4.G.
/// Consumed by value: each step of the lifecycle either terminates the
/// request or hands a (possibly range-substituted) version of itself to the
/// next step, so a spent request can't accidentally be re-run.
pub struct PackageRequest {
    pub pattern: String,
    pub name: Ident,
    pub range: PatternRange,
    pub has_version: bool,
    pub parent_names: Vec<Ident>,
    pub depth: usize,
    pub optional: bool,
}

impl PackageRequest {
    pub fn root(pattern_str: &str, optional: bool) -> Result<PackageRequest, Error> {
        let pattern = Pattern::parse_loose(pattern_str)?;

        Ok(PackageRequest {
            pattern: pattern_str.to_string(),
            name: pattern.name,
            range: pattern.range,
            has_version: pattern.has_version,
            parent_names: Vec::new(),
            depth: 0,
            optional,
        })
    }

    pub(crate) fn child(&self, pattern_str: &str, optional: bool) -> Result<PackageRequest, Error> {
        let pattern = Pattern::parse_loose(pattern_str)?;

        let mut parent_names = self.parent_names.clone();
        parent_names.push(self.name.clone());

        Ok(PackageRequest {
            pattern: pattern_str.to_string(),
            name: pattern.name,
            range: pattern.range,
            has_version: pattern.has_version,
            parent_names,
            depth: self.depth + 1,
            optional,
        })
    }

    pub fn is_exotic(&self) -> bool {
        matches!(self.range, PatternRange::Exotic(_))
    }

    /// Runs the full lifecycle described in spec.md §4.G: resolution-map
    /// pin, fetchKey dedup, lockfile probe, existing-version short-circuit,
    /// registry/exotic fetch + reduce, then recursion into the resolved
    /// manifest's own dependencies.
    pub async fn find(mut self, resolver: Rc<PackageResolver>) -> Result<(), Error> {
        match resolver.resolve_to_resolution(&self) {
            ResolutionStep::Override(range) => self.range = range,
            ResolutionStep::PassThrough => {}
        }

        let fetch_key = format!("{}:{}:{}", resolver.registry_id(), self.pattern, self.optional);
        if !resolver.mark_fetching(fetch_key) {
            return Ok(());
        }

        if let Some(children) = resolver.try_lockfile_hit(&self)? {
            resolver.schedule_children(&self, children)?;
            return Ok(());
        }

        if resolver.is_frozen() {
            return Err(Error::FrozenLockfileViolation(self.pattern.clone()));
        }

        if !self.is_exotic() && resolver.has_satisfying_existing(&self.name, &self.range) {
            resolver.enqueue_delayed(self);
            return Ok(());
        }

        let (version, remote, manifest) = match self.fetch_and_reduce(&resolver).await {
            Ok(resolved) => resolved,
            Err(err) => {
                if self.optional {
                    log::warn!("optional dependency {} failed to resolve: {err}", self.pattern);
                    resolver.mark_ignored(&self.pattern);
                    return Ok(());
                }
                return Err(err);
            }
        };

        resolver.record_reference(&self, version, remote, manifest.clone());

        let mut children = Vec::new();
        for (dep_name, dep_range) in &manifest.dependencies {
            children.push((format!("{dep_name}@{dep_range}"), false));
        }
        for (dep_name, dep_range) in &manifest.optional_dependencies {
            children.push((format!("{dep_name}@{dep_range}"), true));
        }

        resolver.schedule_children(&self, children)?;
        Ok(())
    }

    async fn fetch_and_reduce(&self, resolver: &PackageResolver) -> Result<(Version, Remote, RemoteManifest), Error> {
        if let PatternRange::Exotic(exotic_range) = &self.range {
            let resolution = exotic::resolve(exotic_range, &self.name, resolver.cwd(), resolver.workspace_layout()).await?;
            return Ok((resolution.version, resolution.remote, resolution.manifest));
        }

        let info = resolver.fetch_package_info(&self.name).await?;

        let version = match &self.range {
            PatternRange::Latest => reducer::reduce_latest(&info.versions, info.dist_tags.get("latest")),
            PatternRange::Semver(_) => reducer::reduce(&info.versions, &self.range).cloned(),
            PatternRange::Exotic(_) => unreachable!("handled above"),
        };

        let version = version.ok_or_else(|| {
            Error::ConstraintError(ConstraintFailure {
                name: self.name.clone(),
                range: self.range.to_string(),
                candidates: info.versions.iter().map(|v| v.to_string()).collect(),
            })
        })?;

        let manifest = info.manifest_for(&version).cloned().ok_or_else(|| {
            Error::UnexpectedError(format!("registry reported version {version} for {} with no manifest", self.name))
        })?;

        let remote = Remote::Registry {
            registry: resolver.registry_id().to_string(),
            resolved: manifest.dist.tarball.clone(),
            integrity: manifest.dist.integrity.clone(),
        };

        Ok((version, remote, manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_request_has_no_parents_and_depth_zero() {
        let request = PackageRequest::root("a@^1.0.0", false).unwrap();
        assert_eq!(request.name, Ident::new("a"));
        assert!(request.parent_names.is_empty());
        assert_eq!(request.depth, 0);
    }

    #[test]
    fn child_request_extends_the_parent_chain() {
        let parent = PackageRequest::root("a@^1.0.0", false).unwrap();
        let child = parent.child("b@^2.0.0", true).unwrap();
        assert_eq!(child.parent_names, vec![Ident::new("a")]);
        assert_eq!(child.depth, 1);
        assert!(child.optional);
    }
}
