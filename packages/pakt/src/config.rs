use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

const ENV_PREFIX: &str = "PAKT_";
const RC_FILENAME: &str = ".pmrc";

/// Where a setting's effective value came from, lowest precedence first.
/// Mirrors the teacher's `zpm-config::Source` three (here four, with the rc
/// file split from environment) tier precedence model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Default,
    ProjectRc,
    Environment,
    Cli,
}

#[derive(Clone, Debug)]
pub struct Setting<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Setting<T> {
    fn new(value: T) -> Setting<T> {
        Setting { value, source: Source::Default }
    }

    fn set(&mut self, value: T, source: Source) {
        if source >= self.source {
            self.value = value;
            self.source = source;
        }
    }
}

/// On-disk `.pmrc` document. All fields optional; absence means "inherit
/// the default or a lower-precedence source".
#[derive(Debug, Default, Deserialize)]
struct RcFile {
    registry: Option<String>,
    offline: Option<bool>,
    #[serde(rename = "preferOffline")]
    prefer_offline: Option<bool>,
    frozen: Option<bool>,
    flat: Option<bool>,
    #[serde(rename = "networkConcurrency")]
    network_concurrency: Option<usize>,
    #[serde(rename = "childConcurrency")]
    child_concurrency: Option<usize>,
    #[serde(rename = "networkTimeout")]
    network_timeout_ms: Option<u64>,
    #[serde(rename = "looseSemver")]
    loose_semver: Option<bool>,
    #[serde(rename = "httpProxy")]
    http_proxy: Option<String>,
    #[serde(rename = "httpsProxy")]
    https_proxy: Option<String>,
    #[serde(rename = "ignorePlatform")]
    ignore_platform: Option<bool>,
    #[serde(rename = "ignoreEngines")]
    ignore_engines: Option<bool>,
    #[serde(rename = "ignoreScripts")]
    ignore_scripts: Option<bool>,
    production: Option<bool>,
    #[serde(rename = "workspacesEnabled")]
    workspaces_enabled: Option<bool>,
    #[serde(rename = "workspacesNohoistEnabled")]
    workspaces_nohoist_enabled: Option<bool>,
}

/// CLI flags relevant to the resolver core; the full command surface lives
/// in `cli.rs`, this is just the subset `Config` merges in.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub offline: Option<bool>,
    pub frozen: Option<bool>,
    pub flat: Option<bool>,
    pub focus: Option<bool>,
    pub production: Option<bool>,
    pub registry: Option<String>,
    pub network_concurrency: Option<usize>,
    pub mutex: Option<String>,
}

/// The subset of configuration the resolver core consumes, per spec.md §6.
/// Aggregated from defaults, an optional project `.pmrc`, environment
/// variables prefixed `PAKT_`, and CLI flags, in that precedence order.
#[derive(Debug)]
pub struct Config {
    pub cwd: PathBuf,
    pub lockfile_folder: PathBuf,
    pub cache_folder: PathBuf,
    pub global_folder: PathBuf,
    pub link_folder: PathBuf,
    pub modules_folder: PathBuf,

    pub offline: Setting<bool>,
    pub prefer_offline: Setting<bool>,
    pub frozen: Setting<bool>,
    pub flat: Setting<bool>,
    pub focus: Setting<bool>,
    pub update_checksums: Setting<bool>,
    pub ignore_platform: Setting<bool>,
    pub ignore_engines: Setting<bool>,
    pub ignore_scripts: Setting<bool>,
    pub production: Setting<bool>,
    pub loose_semver: Setting<bool>,
    pub workspaces_enabled: Setting<bool>,
    pub workspaces_nohoist_enabled: Setting<bool>,

    pub network_concurrency: Setting<usize>,
    pub child_concurrency: Setting<usize>,
    pub network_timeout_ms: Setting<u64>,

    pub http_proxy: Setting<Option<String>>,
    pub https_proxy: Setting<Option<String>>,
    pub registry: Setting<String>,
    pub otp: Setting<Option<String>>,

    pub extra: BTreeMap<String, String>,
}

impl Config {
    pub fn defaults(cwd: PathBuf) -> Config {
        Config {
            lockfile_folder: cwd.clone(),
            cache_folder: cwd.join(".pakt-cache"),
            global_folder: cwd.join(".pakt-global"),
            link_folder: cwd.join(".pakt-link"),
            modules_folder: cwd.join("node_modules"),
            cwd,

            offline: Setting::new(false),
            prefer_offline: Setting::new(false),
            frozen: Setting::new(false),
            flat: Setting::new(false),
            focus: Setting::new(false),
            update_checksums: Setting::new(false),
            ignore_platform: Setting::new(false),
            ignore_engines: Setting::new(false),
            ignore_scripts: Setting::new(false),
            production: Setting::new(false),
            loose_semver: Setting::new(false),
            workspaces_enabled: Setting::new(true),
            workspaces_nohoist_enabled: Setting::new(false),

            network_concurrency: Setting::new(8),
            child_concurrency: Setting::new(5),
            network_timeout_ms: Setting::new(30_000),

            http_proxy: Setting::new(None),
            https_proxy: Setting::new(None),
            registry: Setting::new("https://registry.npmjs.org".to_string()),
            otp: Setting::new(None),

            extra: BTreeMap::new(),
        }
    }

    /// Builds a `Config` for `cwd` by layering, in precedence order: built-in
    /// defaults, `<cwd>/.pmrc` if present, `PAKT_*` environment variables,
    /// then `cli` overrides.
    pub fn load(cwd: &Path, cli: CliOverrides) -> Result<Config, Error> {
        let mut config = Config::defaults(cwd.to_path_buf());

        if let Some(rc) = RcFile::read(cwd)? {
            config.apply_rc(rc);
        }

        config.apply_env(std::env::vars());
        config.apply_cli(cli);

        Ok(config)
    }

    fn apply_rc(&mut self, rc: RcFile) {
        let source = Source::ProjectRc;

        if let Some(v) = rc.registry { self.registry.set(v, source); }
        if let Some(v) = rc.offline { self.offline.set(v, source); }
        if let Some(v) = rc.prefer_offline { self.prefer_offline.set(v, source); }
        if let Some(v) = rc.frozen { self.frozen.set(v, source); }
        if let Some(v) = rc.flat { self.flat.set(v, source); }
        if let Some(v) = rc.network_concurrency { self.network_concurrency.set(v, source); }
        if let Some(v) = rc.child_concurrency { self.child_concurrency.set(v, source); }
        if let Some(v) = rc.network_timeout_ms { self.network_timeout_ms.set(v, source); }
        if let Some(v) = rc.loose_semver { self.loose_semver.set(v, source); }
        if let Some(v) = rc.http_proxy { self.http_proxy.set(Some(v), source); }
        if let Some(v) = rc.https_proxy { self.https_proxy.set(Some(v), source); }
        if let Some(v) = rc.ignore_platform { self.ignore_platform.set(v, source); }
        if let Some(v) = rc.ignore_engines { self.ignore_engines.set(v, source); }
        if let Some(v) = rc.ignore_scripts { self.ignore_scripts.set(v, source); }
        if let Some(v) = rc.production { self.production.set(v, source); }
        if let Some(v) = rc.workspaces_enabled { self.workspaces_enabled.set(v, source); }
        if let Some(v) = rc.workspaces_nohoist_enabled { self.workspaces_nohoist_enabled.set(v, source); }
    }

    fn apply_env<I: IntoIterator<Item = (String, String)>>(&mut self, vars: I) {
        let source = Source::Environment;

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else { continue };

            match name {
                "REGISTRY" => self.registry.set(value, source),
                "OFFLINE" => self.offline.set(parse_bool(&value), source),
                "FROZEN" => self.frozen.set(parse_bool(&value), source),
                "FLAT" => self.flat.set(parse_bool(&value), source),
                "PRODUCTION" => self.production.set(parse_bool(&value), source),
                "LOOSE_SEMVER" => self.loose_semver.set(parse_bool(&value), source),
                "NETWORK_CONCURRENCY" => {
                    if let Ok(v) = value.parse() {
                        self.network_concurrency.set(v, source);
                    }
                }
                "CHILD_CONCURRENCY" => {
                    if let Ok(v) = value.parse() {
                        self.child_concurrency.set(v, source);
                    }
                }
                "NETWORK_TIMEOUT" => {
                    if let Ok(v) = value.parse() {
                        self.network_timeout_ms.set(v, source);
                    }
                }
                "HTTP_PROXY" => self.http_proxy.set(Some(value), source),
                "HTTPS_PROXY" => self.https_proxy.set(Some(value), source),
                "OTP" => self.otp.set(Some(value), source),
                other => {
                    self.extra.insert(other.to_string(), value);
                }
            }
        }
    }

    fn apply_cli(&mut self, cli: CliOverrides) {
        let source = Source::Cli;

        if let Some(v) = cli.offline { self.offline.set(v, source); }
        if let Some(v) = cli.frozen { self.frozen.set(v, source); }
        if let Some(v) = cli.flat { self.flat.set(v, source); }
        if let Some(v) = cli.focus { self.focus.set(v, source); }
        if let Some(v) = cli.production { self.production.set(v, source); }
        if let Some(v) = cli.registry { self.registry.set(v, source); }
        if let Some(v) = cli.network_concurrency { self.network_concurrency.set(v, source); }
    }
}

impl RcFile {
    fn read(cwd: &Path) -> Result<Option<RcFile>, Error> {
        let path = cwd.join(RC_FILENAME);

        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let rc: RcFile = toml::from_str(&contents)?;
        Ok(Some(rc))
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_the_documented_values() {
        let config = Config::defaults(PathBuf::from("/tmp/project"));
        assert_eq!(config.network_concurrency.value, 8);
        assert_eq!(config.child_concurrency.value, 5);
        assert_eq!(config.network_timeout_ms.value, 30_000);
        assert!(!config.frozen.value);
        assert!(config.workspaces_enabled.value);
    }

    #[test]
    fn higher_precedence_source_wins() {
        let mut config = Config::defaults(PathBuf::from("/tmp/project"));
        config.apply_rc(RcFile { frozen: Some(true), ..Default::default() });
        assert!(config.frozen.value);
        assert_eq!(config.frozen.source, Source::ProjectRc);

        config.apply_env([("PAKT_FROZEN".to_string(), "0".to_string())]);
        assert!(!config.frozen.value);
        assert_eq!(config.frozen.source, Source::Environment);
    }

    #[test]
    fn cli_overrides_beat_everything() {
        let mut config = Config::defaults(PathBuf::from("/tmp/project"));
        config.apply_rc(RcFile { frozen: Some(true), ..Default::default() });
        config.apply_cli(CliOverrides { frozen: Some(false), ..Default::default() });
        assert!(!config.frozen.value);
        assert_eq!(config.frozen.source, Source::Cli);
    }

    #[test]
    fn unrecognized_env_vars_land_in_extra() {
        let mut config = Config::defaults(PathBuf::from("/tmp/project"));
        config.apply_env([("PAKT_CUSTOM_FLAG".to_string(), "x".to_string())]);
        assert_eq!(config.extra.get("CUSTOM_FLAG"), Some(&"x".to_string()));
    }
}
