use std::rc::Rc;

use clipanion::cli;
use colored::Colorize;

use crate::config::{CliOverrides, Config};
use crate::error::Error;
use crate::manifest::read_manifest;
use crate::mutex::{with_mutex, MutexSpec};
use crate::registry::{NpmRegistry, Registry};
use crate::resolver;
use crate::workspace::WorkspaceLayout;

/// Resolves the project at the current directory against its manifest and
/// any lockfile, writing the result back to `pakt.lock`. Fetching,
/// extraction and module-tree linking are a downstream concern (spec.md
/// §1's "out of scope" list) — this command only drives the resolver core.
#[cli::command(default)]
#[cli::path("install")]
#[cli::category("Dependency management")]
#[derive(Debug)]
pub struct Install {
    /// Only read from the local cache, never hit the network
    #[cli::option("--offline", default = false)]
    offline: bool,

    /// Fail instead of updating the lockfile
    #[cli::option("--frozen-lockfile", default = false)]
    frozen: bool,

    /// Collapse packages that share a name onto a single resolved version where possible
    #[cli::option("--flat", default = false)]
    flat: bool,

    /// Only resolve the dependencies of the current workspace
    #[cli::option("--focus", default = false)]
    focus: bool,

    /// Skip devDependencies
    #[cli::option("--production", default = false)]
    production: bool,

    /// Override the registry URL
    #[cli::option("--registry")]
    registry: Option<String>,

    /// Cap on simultaneously outstanding registry fetches
    #[cli::option("--network-concurrency")]
    network_concurrency: Option<usize>,

    /// Cross-process install lock: `file[:path]` or `network[:port]`
    #[cli::option("--mutex")]
    mutex: Option<String>,
}

impl Install {
    pub async fn execute(&self) -> Result<(), Error> {
        let cwd = std::env::current_dir()?;

        let config = Config::load(
            &cwd,
            CliOverrides {
                offline: Some(self.offline),
                frozen: Some(self.frozen),
                flat: Some(self.flat),
                focus: Some(self.focus),
                production: Some(self.production),
                registry: self.registry.clone(),
                network_concurrency: self.network_concurrency,
                mutex: self.mutex.clone(),
            },
        )?;

        let mutex_spec = match &self.mutex {
            Some(raw) => MutexSpec::parse(raw, &cwd)?,
            None => MutexSpec::parse("file", &cwd)?,
        };

        let lockfile = with_mutex(&mutex_spec, &cwd, || run_install(config)).await?;

        let lockfile_path = cwd.join("pakt.lock");
        std::fs::write(&lockfile_path, lockfile.serialize())?;

        println!("➤ {} {}", "resolved".green().bold(), format!("{} packages", lockfile.entry_count()).bold());
        log::info!("resolved lockfile written to {}", lockfile_path.display());
        Ok(())
    }
}

async fn run_install(config: Config) -> Result<crate::lockfile::Lockfile, Error> {
    let config = Rc::new(config);

    let root_manifest_path = config.cwd.join("package.json");
    let root_manifest = read_manifest(&root_manifest_path)?;

    let workspace_layout = if root_manifest.private && root_manifest.workspaces.is_some() {
        let layout = WorkspaceLayout::discover(
            config.cwd.clone(),
            &root_manifest,
            "package.json",
            config.workspaces_nohoist_enabled.value,
        )?;

        // spec.md §4.I: `--focus` installs remote copies of a single
        // workspace's siblings, which is meaningless run from the
        // workspace root itself.
        if config.focus.value && layout.root == config.cwd {
            return Err(Error::FocusAtWorkspaceRoot(config.cwd.display().to_string()));
        }

        Some(layout)
    } else {
        None
    };

    let registry = Registry::Npm(NpmRegistry::new("npm", config.registry.value.clone(), config.network_timeout_ms.value));

    resolver::resolve(config.clone(), &root_manifest, registry, workspace_layout, config.flat.value).await
}
