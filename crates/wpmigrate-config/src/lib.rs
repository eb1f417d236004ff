//! Configuration for the wpmigrate CLI.
//!
//! TOML profiles (one per install), figment layering (defaults, file, then
//! `WPMIGRATE_` environment), and translation to `wpmigrate_core::WpCliConfig`.
//! Profiles also remember confirmed per-site targets so a repeated run
//! suggests the same answers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wpmigrate_core::{MappingSet, SiteId, Topology, WpCliConfig};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "WPMIGRATE_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named install profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit, then `default_profile`.
    pub fn profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// The named profile, or an empty one when it does not exist yet.
    pub fn profile_or_default(&self, name: &str) -> Profile {
        self.profiles.get(name).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// WP-CLI executable.
    #[serde(default = "default_wp_binary")]
    pub wp_binary: PathBuf,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Columns never rewritten.
    #[serde(default = "default_skip_columns")]
    pub skip_columns: Vec<String>,

    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub allow_root: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            wp_binary: default_wp_binary(),
            timeout: default_timeout(),
            skip_columns: default_skip_columns(),
            output: default_output(),
            color: default_color(),
            allow_root: false,
        }
    }
}

fn default_wp_binary() -> PathBuf {
    PathBuf::from("wp")
}
fn default_timeout() -> u64 {
    600
}
fn default_skip_columns() -> Vec<String> {
    vec!["guid".into()]
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named WordPress install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// WordPress root directory.
    pub wp_path: Option<PathBuf>,

    /// Domain the install currently answers on.
    pub source_domain: Option<String>,

    /// Default target for the main site.
    pub target_domain: Option<String>,

    /// Force the multisite read even when detection says otherwise.
    pub multisite: Option<bool>,

    /// Network-wide target for subdirectory installs.
    pub network_target: Option<String>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Confirmed per-site targets, keyed by site id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sites: BTreeMap<String, String>,
}

impl Profile {
    /// Parse the `sites` table into typed ids.
    pub fn site_targets(&self) -> Result<BTreeMap<SiteId, String>, ConfigError> {
        self.sites
            .iter()
            .map(|(key, target)| {
                let id = key.parse::<SiteId>().map_err(|e| ConfigError::Validation {
                    field: format!("sites.{key}"),
                    reason: e.to_string(),
                })?;
                Ok((id, target.clone()))
            })
            .collect()
    }

    /// Record the targets of a confirmed mapping set.
    ///
    /// The main site's target becomes the profile default; subdirectory
    /// networks store it as the network target, subdomain networks store
    /// every other tenant's host under its id.
    pub fn remember_targets(&mut self, mappings: &MappingSet, main_site: SiteId, topology: Topology) {
        self.multisite = Some(topology.is_multisite());
        if let Some(main) = mappings.get(main_site) {
            self.target_domain = Some(main.target_domain.clone());
            if topology == Topology::MultisiteSubdirectory {
                self.network_target = Some(main.target_domain.clone());
            }
        }
        if topology == Topology::MultisiteSubdomain {
            for mapping in mappings.iter().filter(|m| m.site_id != main_site) {
                self.sites
                    .insert(mapping.site_id.to_string(), mapping.target_domain.clone());
            }
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `WPMIGRATE_CONFIG`, then the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "wpmigrate", "wpmigrate").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wpmigrate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WPMIGRATE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `WpCliConfig` from defaults and a profile, without CLI flags.
pub fn wp_cli_config(defaults: &Defaults, profile: &Profile) -> WpCliConfig {
    WpCliConfig {
        binary: defaults.wp_binary.clone(),
        wp_path: profile.wp_path.clone(),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        allow_root: defaults.allow_root,
    }
}
