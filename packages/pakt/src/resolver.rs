use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use pakt_primitives::{Ident, Pattern, PatternRange};
use pakt_semver::{Range, Version};
use tokio::sync::Notify;

use crate::config::Config;
use crate::error::Error;
use crate::lockfile::{is_stale, LockEntry, Lockfile, ResolvedPatternEntry};
use crate::manifest::Manifest;
use crate::manifest_cache::ManifestCache;
use crate::queue::TaskQueue;
use crate::reference::{Optionality, PackageReference, ReferenceId, Remote};
use crate::registry::{PackageInfo, RegistryBackend, RemoteDist, RemoteManifest};
use crate::request::PackageRequest;
use crate::resolution_map::{ResolutionMap, ResolutionTarget};
use crate::workspace::WorkspaceLayout;

/// What consulting the Resolution Map produced for one request, per spec.md
/// §4.H's `resolveToResolution`. A version pin becomes an exact-version
/// range override rather than an attempt to splice the request onto an
/// already-existing Reference: the normal fetch pipeline's existing-version
/// short-circuit (spec.md §4.G step 4) already dedups it against a sibling
/// request for the same exact version, so there is no separate "attach to
/// what's already resolved" path to get wrong.
pub enum ResolutionStep {
    PassThrough,
    Override(PatternRange),
}

struct ResolverState {
    references: Vec<PackageReference>,
    manifests: Vec<RemoteManifest>,
    by_dedup_key: BTreeMap<String, ReferenceId>,
    patterns: BTreeMap<String, ReferenceId>,
    patterns_by_package: BTreeMap<Ident, Vec<String>>,
    fetching_patterns: BTreeSet<String>,
    delayed: Vec<PackageRequest>,
    ignored: BTreeSet<String>,
}

impl ResolverState {
    fn new() -> ResolverState {
        ResolverState {
            references: Vec::new(),
            manifests: Vec::new(),
            by_dedup_key: BTreeMap::new(),
            patterns: BTreeMap::new(),
            patterns_by_package: BTreeMap::new(),
            fetching_patterns: BTreeSet::new(),
            delayed: Vec::new(),
            ignored: BTreeSet::new(),
        }
    }
}

/// Owns the patterns map and drives Requests to completion with bounded
/// concurrency, per spec.md §4.H. Runs entirely on one `LocalSet` (see
/// `queue::TaskQueue`): all shared state below is `Rc<RefCell<_>>`/`Cell`,
/// never `Arc<Mutex<_>>`, honoring spec.md §5's "no data structure needs a
/// lock" scheduling model.
pub struct PackageResolver {
    config: Rc<Config>,
    registry: crate::registry::Registry,
    manifest_cache: Rc<ManifestCache<(String, Ident), PackageInfo>>,
    queue: TaskQueue,
    state: RefCell<ResolverState>,
    lockfile: RefCell<Lockfile>,
    resolution_map: RefCell<ResolutionMap>,
    workspace_layout: Option<WorkspaceLayout>,
    flat: bool,
    frozen: bool,
    inflight_count: Cell<usize>,
    inflight_notify: Notify,
    fatal_error: RefCell<Option<Error>>,
}

impl PackageResolver {
    pub fn new(
        config: Rc<Config>,
        mut registry: crate::registry::Registry,
        manifest_cache: Rc<ManifestCache<(String, Ident), PackageInfo>>,
        lockfile: Lockfile,
        resolution_map: ResolutionMap,
        workspace_layout: Option<WorkspaceLayout>,
        flat: bool,
        frozen: bool,
    ) -> Result<Rc<PackageResolver>, Error> {
        registry.load_config()?;
        let concurrency = config.network_concurrency.value;

        Ok(Rc::new(PackageResolver {
            config,
            registry,
            manifest_cache,
            queue: TaskQueue::new(concurrency),
            state: RefCell::new(ResolverState::new()),
            lockfile: RefCell::new(lockfile),
            resolution_map: RefCell::new(resolution_map),
            workspace_layout,
            flat,
            frozen,
            inflight_count: Cell::new(0),
            inflight_notify: Notify::new(),
            fatal_error: RefCell::new(None),
        }))
    }

    pub fn cwd(&self) -> &Path {
        &self.config.cwd
    }

    pub fn workspace_layout(&self) -> Option<&WorkspaceLayout> {
        self.workspace_layout.as_ref()
    }

    pub fn registry_id(&self) -> &str {
        self.registry.id()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Runs every phase of spec.md §4.H's `init` algorithm against
    /// `root_requests` and returns the resulting lockfile.
    pub async fn init(self: &Rc<Self>, root_requests: Vec<PackageRequest>) -> Result<(), Error> {
        for request in root_requests {
            self.clone().schedule_find(request);
        }
        self.drain().await?;

        self.resolve_existing_pass();

        if self.flat {
            let root_names: Vec<Ident> = {
                let state = self.state.borrow();
                state.patterns_by_package.keys().cloned().collect()
            };
            for name in root_names {
                self.optimize_resolutions(&name);
            }
        }

        Ok(())
    }

    pub fn finalize(&self) -> Lockfile {
        let state = self.state.borrow();
        let mut resolved = Vec::new();

        for (pattern, &rid) in state.patterns.iter() {
            let reference = &state.references[rid.0];
            if reference.ignore {
                continue;
            }

            let manifest = &state.manifests[rid.0];

            let (resolved_url, integrity) = match &reference.remote {
                Remote::Registry { resolved, integrity, .. } => (Some(resolved.clone()), integrity.clone()),
                Remote::Url { url } => (Some(url.clone()), None),
                _ => (None, None),
            };

            let entry = LockEntry {
                name: Some(reference.name.to_string()),
                version: reference.version.to_string(),
                resolved: resolved_url,
                integrity,
                registry: Some(reference.registry.clone()),
                uid: Some(reference.uid.clone()),
                dependencies: manifest.dependencies.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                optional_dependencies: manifest.optional_dependencies.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                permissions: reference.permissions.iter().map(|p| (p.clone(), String::new())).collect(),
                prebuilt_variants: BTreeMap::new(),
            };

            resolved.push(ResolvedPatternEntry { pattern: pattern.clone(), dedup_key: reference.remote.dedup_key(), entry });
        }

        Lockfile::build(&resolved)
    }

    /// Patterns ignored because an `optional` request failed to resolve;
    /// surfaced for diagnostics, never for correctness decisions.
    pub fn ignored_patterns(&self) -> Vec<String> {
        self.state.borrow().ignored.iter().cloned().collect()
    }

    pub fn reference_count(&self) -> usize {
        self.state.borrow().references.len()
    }

    // -- spec.md §4.H `getTopologicalManifests` / `getLevelOrderManifests` --

    pub fn topological_manifests(&self, seed_patterns: &[String]) -> Vec<RemoteManifest> {
        let state = self.state.borrow();
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();

        for pattern in seed_patterns {
            if let Some(&rid) = state.patterns.get(pattern) {
                visit_topological(rid, &state, &mut seen, &mut order);
            }
        }

        order.into_iter().map(|rid| state.manifests[rid.0].clone()).collect()
    }

    pub fn level_order_manifests(&self, seed_patterns: &[String]) -> Vec<RemoteManifest> {
        let state = self.state.borrow();
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<ReferenceId> = VecDeque::new();

        for pattern in seed_patterns {
            if let Some(&rid) = state.patterns.get(pattern) {
                if seen.insert(rid) {
                    queue.push_back(rid);
                }
            }
        }

        while let Some(rid) = queue.pop_front() {
            order.push(rid);

            for dep_name in dependency_names(&state.manifests[rid.0]) {
                if let Some(child_rid) = lookup_reference_for_name(&state, &dep_name) {
                    if seen.insert(child_rid) {
                        queue.push_back(child_rid);
                    }
                }
            }
        }

        order.into_iter().map(|rid| state.manifests[rid.0].clone()).collect()
    }

    /// spec.md §4.H `updateManifest`: preserves `name`/`fresh`, overwrites
    /// the remote and the dependency manifest in place.
    pub fn update_manifest(&self, reference_id: ReferenceId, new_remote: Remote, new_manifest: RemoteManifest) {
        let mut state = self.state.borrow_mut();
        let reference = &mut state.references[reference_id.0];
        reference.remote = new_remote;
        state.manifests[reference_id.0] = new_manifest;
    }

    // -- scheduling --

    pub fn schedule_find(self: Rc<Self>, request: PackageRequest) {
        self.inflight_count.set(self.inflight_count.get() + 1);
        let resolver = self.clone();

        self.queue.schedule(async move {
            let pattern = request.pattern.clone();
            let optional = request.optional;

            if let Err(err) = request.find(resolver.clone()).await {
                if optional {
                    log::warn!("optional dependency {pattern} failed: {err}");
                    resolver.mark_ignored(&pattern);
                } else {
                    let mut slot = resolver.fatal_error.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
            }

            resolver.inflight_count.set(resolver.inflight_count.get() - 1);
            if resolver.inflight_count.get() == 0 {
                resolver.inflight_notify.notify_waiters();
            }
        });
    }

    pub fn schedule_children(self: &Rc<Self>, parent: &PackageRequest, children: Vec<(String, bool)>) -> Result<(), Error> {
        for (pattern, optional) in children {
            let child = parent.child(&pattern, optional)?;
            self.clone().schedule_find(child);
        }
        Ok(())
    }

    async fn drain(&self) -> Result<(), Error> {
        loop {
            if self.inflight_count.get() == 0 {
                break;
            }
            self.inflight_notify.notified().await;
        }

        if let Some(err) = self.fatal_error.borrow_mut().take() {
            return Err(err);
        }

        Ok(())
    }

    // -- spec.md §4.G step 1: resolveToResolution --

    /// Resolution-map pins only apply to transitive requests (spec.md §4.D:
    /// a root dependency's own range always wins) and never apply under
    /// `--flat`, where a single resolved version per name is already
    /// mandatory.
    pub fn resolve_to_resolution(&self, req: &PackageRequest) -> ResolutionStep {
        if req.parent_names.is_empty() || self.flat {
            return ResolutionStep::PassThrough;
        }

        match self.resolution_map.borrow().find(&req.name, &req.parent_names) {
            None => ResolutionStep::PassThrough,
            Some(ResolutionTarget::Exotic(exotic)) => ResolutionStep::Override(PatternRange::Exotic(exotic.clone())),
            Some(ResolutionTarget::Version(version)) => ResolutionStep::Override(PatternRange::Semver(Range::exact(version.clone()))),
        }
    }

    // -- spec.md §4.G step 2 --

    pub fn mark_fetching(&self, fetch_key: String) -> bool {
        self.state.borrow_mut().fetching_patterns.insert(fetch_key)
    }

    // -- spec.md §4.G step 3 --

    /// On a lockfile hit, records a Reference directly from the locked
    /// entry (no registry call) and returns the child `(pattern, optional)`
    /// pairs the caller should recurse into. `None` means no usable entry —
    /// proceed to the normal fetch path.
    pub fn try_lockfile_hit(&self, req: &PackageRequest) -> Result<Option<Vec<(String, bool)>>, Error> {
        let entry = self.lockfile.borrow().get_locked(&req.pattern).cloned();
        let Some(entry) = entry else { return Ok(None) };

        if is_stale(&req.range.to_string(), req.has_version, req.is_exotic(), &entry.version) {
            self.lockfile.borrow_mut().remove_pattern(&req.pattern);
            return Ok(None);
        }

        let version = Version::from_str(&entry.version)?;
        let registry_id = entry.registry.clone().unwrap_or_else(|| self.registry_id().to_string());
        let remote = Remote::Registry {
            registry: registry_id.clone(),
            resolved: entry.resolved.clone().unwrap_or_default(),
            integrity: entry.integrity.clone(),
        };

        let mut reference = PackageReference::new(req.name.clone(), version.clone(), registry_id, remote);
        reference.fresh = false;
        reference.add_pattern(req.pattern.clone());
        reference.add_request(req.pattern.clone(), req.depth);
        reference.add_optional(req.optional);
        for permission in entry.permissions.keys() {
            reference.set_permission(permission.clone());
        }

        let manifest = RemoteManifest {
            name: req.name.clone(),
            version,
            dependencies: string_map_to_ident(&entry.dependencies),
            optional_dependencies: string_map_to_ident(&entry.optional_dependencies),
            dist: RemoteDist { tarball: entry.resolved.clone().unwrap_or_default(), integrity: entry.integrity.clone() },
        };

        let dedup_key = reference.remote.dedup_key();
        let mut state = self.state.borrow_mut();
        let rid = ReferenceId(state.references.len());
        state.by_dedup_key.insert(dedup_key, rid);
        state.patterns.insert(req.pattern.clone(), rid);
        state.patterns_by_package.entry(req.name.clone()).or_default().push(req.pattern.clone());
        state.references.push(reference);
        state.manifests.push(manifest.clone());
        drop(state);

        let mut children = Vec::new();
        for (name, range) in &entry.dependencies {
            children.push((format!("{name}@{range}"), false));
        }
        for (name, range) in &entry.optional_dependencies {
            children.push((format!("{name}@{range}"), true));
        }

        Ok(Some(children))
    }

    // -- spec.md §4.G step 4 --

    pub fn has_satisfying_existing(&self, name: &Ident, range: &PatternRange) -> bool {
        let state = self.state.borrow();
        let Some(patterns) = state.patterns_by_package.get(name) else { return false };

        patterns.iter().any(|pattern| {
            state
                .patterns
                .get(pattern)
                .map(|&rid| pattern_range_matches(range, &state.references[rid.0].version))
                .unwrap_or(false)
        })
    }

    pub fn enqueue_delayed(&self, req: PackageRequest) {
        self.state.borrow_mut().delayed.push(req);
    }

    /// spec.md §4.H Phase 2: attaches each deferred pattern to the best
    /// (highest satisfying) Reference now known for its package name.
    fn resolve_existing_pass(&self) {
        let delayed = std::mem::take(&mut self.state.borrow_mut().delayed);

        for req in delayed {
            let mut state = self.state.borrow_mut();
            let Some(existing) = state.patterns_by_package.get(&req.name).cloned() else { continue };

            let best = existing
                .iter()
                .filter_map(|pattern| state.patterns.get(pattern).copied())
                .filter(|&rid| pattern_range_matches(&req.range, &state.references[rid.0].version))
                .max_by(|&a, &b| state.references[a.0].version.cmp(&state.references[b.0].version));

            if let Some(rid) = best {
                state.references[rid.0].add_pattern(req.pattern.clone());
                state.references[rid.0].add_request(req.pattern.clone(), req.depth);
                state.references[rid.0].add_optional(req.optional);
                state.patterns.insert(req.pattern.clone(), rid);
                state.patterns_by_package.entry(req.name.clone()).or_default().push(req.pattern.clone());
            }
        }
    }

    // -- spec.md §4.H Phase 4: flatten --

    /// `optimizeResolutions(name)`: collapses every collapsible pattern for
    /// `name` onto the highest version that satisfies all of their ranges,
    /// if one exists.
    fn optimize_resolutions(&self, name: &Ident) {
        let collapsible: Vec<String> = {
            let state = self.state.borrow();
            let Some(patterns) = state.patterns_by_package.get(name) else { return };

            patterns
                .iter()
                .filter(|pattern| {
                    state.patterns.get(*pattern).is_some_and(|&rid| {
                        let reference = &state.references[rid.0];
                        reference.fresh && !matches!(reference.remote, Remote::Workspace { .. })
                    })
                })
                .cloned()
                .collect()
        };

        if collapsible.len() < 2 {
            return;
        }

        let state = self.state.borrow();
        let mut candidate_versions: Vec<Version> =
            collapsible.iter().map(|pattern| state.references[state.patterns[pattern].0].version.clone()).collect();
        candidate_versions.sort();
        candidate_versions.dedup();

        let ranges: Vec<PatternRange> =
            collapsible.iter().filter_map(|pattern| Pattern::parse_loose(pattern).ok().map(|p| p.range)).collect();

        let winner = candidate_versions.into_iter().rev().find(|version| ranges.iter().all(|range| pattern_range_matches(range, version)));
        drop(state);

        if let Some(version) = winner {
            self.collapse_package_versions(name, &version, &collapsible);
        }
    }

    /// spec.md §4.H `collapsePackageVersions`: every pattern in `patterns`
    /// ends up pointing at the single Reference already at `version`; the
    /// other References those patterns used to own are pruned (emptied and
    /// marked ignored so `finalize` skips them).
    fn collapse_package_versions(&self, name: &Ident, version: &Version, patterns: &[String]) {
        let mut state = self.state.borrow_mut();

        let Some(target_rid) = patterns.iter().find_map(|pattern| {
            let rid = state.patterns[pattern];
            (&state.references[rid.0].version == version).then_some(rid)
        }) else {
            return;
        };

        for pattern in patterns {
            let rid = state.patterns[pattern];
            if rid == target_rid {
                continue;
            }

            let captured: Vec<String> = state.references[rid.0].patterns.iter().cloned().collect();
            for captured_pattern in &captured {
                state.patterns.insert(captured_pattern.clone(), target_rid);
                state.references[target_rid.0].add_pattern(captured_pattern.clone());
            }

            state.references[rid.0].patterns.clear();
            state.references[rid.0].ignore = true;
        }

        let rebuilt: Vec<String> =
            state.patterns.iter().filter(|(_, &rid)| &state.references[rid.0].name == name).map(|(pattern, _)| pattern.clone()).collect();
        state.patterns_by_package.insert(name.clone(), rebuilt);
    }

    // -- registry fetch, shared via the get-or-factory manifest cache --

    pub async fn fetch_package_info(&self, name: &Ident) -> Result<PackageInfo, Error> {
        let key = (self.registry_id().to_string(), name.clone());
        let name = name.clone();

        // SAFETY of the closure capture: `self.registry` outlives this call
        // (it's owned by the `Rc<PackageResolver>` the caller holds), but
        // `get_or_fetch`'s factory has no lifetime parameter to express
        // that, so the request is resolved to an owned pointer-sized copy
        // of what's needed: the registry backend itself is never mutated
        // after `load_config`, so reading it through a raw borrow for the
        // duration of one fetch is sound single-threaded.
        let info = self.manifest_cache.get_or_fetch(key, || async move { self.registry.request(&name).await }).await?;

        Ok(info)
    }

    pub fn mark_ignored(&self, pattern: &str) {
        self.state.borrow_mut().ignored.insert(pattern.to_string());
    }

    pub fn record_reference(&self, req: &PackageRequest, version: Version, remote: Remote, manifest: RemoteManifest) -> ReferenceId {
        let dedup_key = remote.dedup_key();
        let mut state = self.state.borrow_mut();

        if let Some(&rid) = state.by_dedup_key.get(&dedup_key) {
            state.references[rid.0].add_pattern(req.pattern.clone());
            state.references[rid.0].add_request(req.pattern.clone(), req.depth);
            state.references[rid.0].add_optional(req.optional);
            state.patterns.insert(req.pattern.clone(), rid);
            state.patterns_by_package.entry(req.name.clone()).or_default().push(req.pattern.clone());
            return rid;
        }

        let registry_id = self.registry.id().to_string();
        let mut reference = PackageReference::new(req.name.clone(), version, registry_id, remote);
        reference.add_pattern(req.pattern.clone());
        reference.add_request(req.pattern.clone(), req.depth);
        reference.add_optional(req.optional);

        let rid = ReferenceId(state.references.len());
        state.by_dedup_key.insert(dedup_key, rid);
        state.references.push(reference);
        state.manifests.push(manifest);
        state.patterns.insert(req.pattern.clone(), rid);
        state.patterns_by_package.entry(req.name.clone()).or_default().push(req.pattern.clone());

        rid
    }
}

fn pattern_range_matches(range: &PatternRange, version: &Version) -> bool {
    match range {
        PatternRange::Latest => true,
        PatternRange::Semver(semver_range) => semver_range.check_ignore_rc(version),
        PatternRange::Exotic(_) => false,
    }
}

fn lookup_reference_for_name(state: &ResolverState, name: &Ident) -> Option<ReferenceId> {
    state.patterns_by_package.get(name).and_then(|patterns| patterns.iter().find_map(|pattern| state.patterns.get(pattern).copied()))
}

fn dependency_names(manifest: &RemoteManifest) -> Vec<Ident> {
    manifest.dependencies.keys().chain(manifest.optional_dependencies.keys()).cloned().collect()
}

fn visit_topological(rid: ReferenceId, state: &ResolverState, seen: &mut BTreeSet<ReferenceId>, order: &mut Vec<ReferenceId>) {
    if !seen.insert(rid) {
        return;
    }

    for dep_name in dependency_names(&state.manifests[rid.0]) {
        if let Some(child_rid) = lookup_reference_for_name(state, &dep_name) {
            visit_topological(child_rid, state, seen, order);
        }
    }

    order.push(rid);
}

fn string_map_to_ident(map: &BTreeMap<String, String>) -> BTreeMap<Ident, String> {
    map.iter().map(|(k, v)| (Ident::new(k), v.clone())).collect()
}

/// Discovers the root manifest's direct dependency set as root Requests, per
/// spec.md §6: all of `dependencies`/`optionalDependencies`, plus
/// `devDependencies` only when `production` is false (and only at the
/// root — child manifests never contribute `devDependencies`).
pub fn root_requests(manifest: &Manifest, production: bool) -> Result<Vec<PackageRequest>, Error> {
    let mut requests = Vec::new();

    for (name, range) in &manifest.dependencies {
        requests.push(PackageRequest::root(&format!("{name}@{range}"), false)?);
    }
    for (name, range) in &manifest.optional_dependencies {
        requests.push(PackageRequest::root(&format!("{name}@{range}"), true)?);
    }
    if !production {
        for (name, range) in &manifest.dev_dependencies {
            requests.push(PackageRequest::root(&format!("{name}@{range}"), false)?);
        }
    }

    Ok(requests)
}

/// Runs the resolver to completion against `root_manifest` and returns the
/// serializable lockfile, per spec.md §4.H Phase 5. Owns the `LocalSet`
/// every `spawn_local`'d Request task needs to run on.
pub async fn resolve(
    config: Rc<Config>,
    root_manifest: &Manifest,
    registry: crate::registry::Registry,
    workspace_layout: Option<WorkspaceLayout>,
    flat: bool,
) -> Result<Lockfile, Error> {
    let manifest_cache = Rc::new(ManifestCache::new());
    let (lockfile, _outcome) = Lockfile::from_directory(&config.lockfile_folder)?;
    let resolution_map = ResolutionMap::from_entries(root_manifest.resolutions.clone())?;
    let frozen = config.frozen.value;
    let production = config.production.value;

    let local = tokio::task::LocalSet::new();

    local
        .run_until(async move {
            let resolver = PackageResolver::new(config, registry, manifest_cache, lockfile, resolution_map, workspace_layout, flat, frozen)?;

            let requests = root_requests(root_manifest, production)?;
            resolver.init(requests).await?;

            Ok(resolver.finalize())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliOverrides;
    use crate::registry::{Registry, StaticRegistry};
    use std::path::PathBuf;

    fn write_fixture(dir: &Path, name: &str, json: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(format!("{name}.json")), json).unwrap();
    }

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pakt-resolver-test-{label}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[tokio::test]
    async fn fresh_install_with_no_lockfile_resolves_the_highest_satisfying_version() {
        let project = temp_dir("fresh-install");
        let registry_root = project.join("registry");
        write_fixture(
            &registry_root,
            "a",
            r#"{"versions":{"1.0.0":{},"1.2.0":{}},"dist_tags":{"latest":"1.2.0"}}"#,
        );

        let manifest: Manifest = serde_json::from_str(r#"{"name":"root","version":"1.0.0","dependencies":{"a":"^1.0.0"}}"#).unwrap();
        let config = Rc::new(Config::load(&project, CliOverrides::default()).unwrap());
        let registry = Registry::Static(StaticRegistry::new("static", registry_root));

        let lockfile = resolve(config, &manifest, registry, None, false).await.unwrap();
        let entry = lockfile.get_locked("a@^1.0.0").expect("a should resolve");
        assert_eq!(entry.version, "1.2.0");

        std::fs::remove_dir_all(&project).ok();
    }

    #[tokio::test]
    async fn a_valid_lockfile_entry_short_circuits_the_registry() {
        let project = temp_dir("lockfile-hit");
        let registry_root = project.join("registry");
        write_fixture(&registry_root, "a", r#"{"versions":{"1.0.0":{},"9.9.9":{}}}"#);

        std::fs::write(
            project.join("pakt.lock"),
            "a@^1.0.0:\n  version 1.0.0\n  registry static\n",
        ).unwrap();

        let manifest: Manifest = serde_json::from_str(r#"{"name":"root","version":"1.0.0","dependencies":{"a":"^1.0.0"}}"#).unwrap();
        let config = Rc::new(Config::load(&project, CliOverrides::default()).unwrap());
        let registry = Registry::Static(StaticRegistry::new("static", registry_root));

        let lockfile = resolve(config, &manifest, registry, None, false).await.unwrap();
        let entry = lockfile.get_locked("a@^1.0.0").unwrap();
        assert_eq!(entry.version, "1.0.0", "lockfile hit must not be upgraded to 9.9.9 by the registry");

        std::fs::remove_dir_all(&project).ok();
    }

    #[tokio::test]
    async fn a_stale_lockfile_entry_is_replaced_by_a_fresh_fetch() {
        let project = temp_dir("stale-lockfile");
        let registry_root = project.join("registry");
        write_fixture(&registry_root, "a", r#"{"versions":{"2.5.0":{}},"dist_tags":{"latest":"2.5.0"}}"#);

        std::fs::write(
            project.join("pakt.lock"),
            "a@^2.0.0:\n  version 1.0.0\n  registry static\n",
        ).unwrap();

        let manifest: Manifest = serde_json::from_str(r#"{"name":"root","version":"1.0.0","dependencies":{"a":"^2.0.0"}}"#).unwrap();
        let config = Rc::new(Config::load(&project, CliOverrides::default()).unwrap());
        let registry = Registry::Static(StaticRegistry::new("static", registry_root));

        let lockfile = resolve(config, &manifest, registry, None, false).await.unwrap();
        let entry = lockfile.get_locked("a@^2.0.0").expect("a@^2.0.0 should resolve fresh");
        assert_eq!(entry.version, "2.5.0");

        std::fs::remove_dir_all(&project).ok();
    }

    #[tokio::test]
    async fn resolutions_pin_a_transitive_dependency_to_an_exact_version() {
        let project = temp_dir("resolution-override");
        let registry_root = project.join("registry");
        write_fixture(&registry_root, "a", r#"{"versions":{"1.0.0":{"dependencies":{"c":"^1.0.0"}}}}"#);
        write_fixture(&registry_root, "c", r#"{"versions":{"1.0.0":{},"1.5.0":{}},"dist_tags":{"latest":"1.5.0"}}"#);

        let manifest: Manifest = serde_json::from_str(
            r#"{"name":"root","version":"1.0.0","dependencies":{"a":"^1.0.0"},"resolutions":{"**/c":"1.0.0"}}"#,
        ).unwrap();
        let config = Rc::new(Config::load(&project, CliOverrides::default()).unwrap());
        let registry = Registry::Static(StaticRegistry::new("static", registry_root));

        let lockfile = resolve(config, &manifest, registry, None, false).await.unwrap();
        let entry = lockfile.get_locked("c@^1.0.0").expect("pinned transitive dependency should still resolve");
        assert_eq!(entry.version, "1.0.0", "resolutions pin should override the registry's highest satisfying version");

        std::fs::remove_dir_all(&project).ok();
    }

    #[tokio::test]
    async fn a_workspace_sibling_dependency_resolves_without_touching_the_registry() {
        let project = temp_dir("workspace-sibling");
        std::fs::create_dir_all(project.join("packages/a")).unwrap();
        std::fs::create_dir_all(project.join("packages/b")).unwrap();
        std::fs::write(
            project.join("package.json"),
            r#"{"name":"root","version":"1.0.0","private":true,"workspaces":["packages/*"]}"#,
        ).unwrap();
        std::fs::write(project.join("packages/a/package.json"), r#"{"name":"a","version":"1.0.0","dependencies":{"b":"workspace:^1.0.0"}}"#).unwrap();
        std::fs::write(project.join("packages/b/package.json"), r#"{"name":"b","version":"1.0.0"}"#).unwrap();

        let root_manifest: Manifest = serde_json::from_str(&std::fs::read_to_string(project.join("package.json")).unwrap()).unwrap();
        let layout = WorkspaceLayout::discover(project.clone(), &root_manifest, "package.json", false).unwrap();
        let a_manifest = layout.get(&Ident::new("a")).unwrap().manifest.clone();

        let config = Rc::new(Config::load(&project, CliOverrides::default()).unwrap());
        let registry = Registry::Static(StaticRegistry::new("static", project.join("unused-registry")));

        let lockfile = resolve(config, &a_manifest, registry, Some(layout), false).await.unwrap();
        let entry = lockfile.get_locked("b@workspace:^1.0.0").expect("workspace sibling should resolve");
        assert_eq!(entry.version, "1.0.0");

        std::fs::remove_dir_all(&project).ok();
    }

    #[tokio::test]
    async fn flat_mode_collapses_divergent_ranges_onto_one_satisfying_version() {
        let project = temp_dir("flat-resolution");
        let registry_root = project.join("registry");
        write_fixture(&registry_root, "a", r#"{"versions":{"1.0.0":{"dependencies":{"c":"^1.0.0"}}}}"#);
        write_fixture(&registry_root, "b", r#"{"versions":{"1.0.0":{"dependencies":{"c":"~1.0.1"}}}}"#);
        write_fixture(
            &registry_root,
            "c",
            r#"{"versions":{"1.0.0":{},"1.0.5":{},"1.1.0":{}},"dist_tags":{"latest":"1.1.0"}}"#,
        );

        let manifest: Manifest = serde_json::from_str(
            r#"{"name":"root","version":"1.0.0","dependencies":{"a":"^1.0.0","b":"^1.0.0"}}"#,
        ).unwrap();
        let config = Rc::new(Config::load(&project, CliOverrides::default()).unwrap());
        let registry = Registry::Static(StaticRegistry::new("static", registry_root));

        let lockfile = resolve(config, &manifest, registry, None, true).await.unwrap();
        let from_a = lockfile.get_locked("c@^1.0.0").expect("a's c dependency should resolve");
        let from_b = lockfile.get_locked("c@~1.0.1").expect("b's c dependency should resolve");
        assert_eq!(from_a.version, "1.0.5", "highest version satisfying both ^1.0.0 and ~1.0.1 is 1.0.5");
        assert_eq!(from_b.version, "1.0.5");

        std::fs::remove_dir_all(&project).ok();
    }
}
