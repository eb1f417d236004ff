//! CLI configuration: a thin wrapper around `wpmigrate_config` that lets
//! `GlobalOpts` and per-command flags override profile values.

use std::time::Duration;

use wpmigrate_core::{CoreError, DirectorySettings, WpCliConfig, validate_domain};

use crate::cli::{GlobalOpts, SourceArgs, TargetArgs};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use wpmigrate_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config,
};

// ── Session ─────────────────────────────────────────────────────────

/// Everything a command needs from configuration, resolved once.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub profile_name: String,
    pub profile: Profile,
    pub wp: WpCliConfig,
}

/// Load the config file and resolve the active profile plus flag overrides.
///
/// A missing file is fine; a malformed one is an error. Naming a profile
/// explicitly that does not exist is an error, the implicit default is not.
pub fn load_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let config = wpmigrate_config::load_config()?;
    let profile_name = active_profile_name(global, &config);

    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&config),
            });
        }
        None => Profile::default(),
    };

    let wp = resolve_wp_cli(&config.defaults, &profile, global);
    Ok(Session {
        config,
        profile_name,
        profile,
        wp,
    })
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Translate defaults + profile + global flags into a `WpCliConfig`.
///
/// Flag overrides take priority over profile values.
pub fn resolve_wp_cli(defaults: &Defaults, profile: &Profile, global: &GlobalOpts) -> WpCliConfig {
    let mut wp = wpmigrate_config::wp_cli_config(defaults, profile);
    if let Some(ref binary) = global.wp {
        wp.binary.clone_from(binary);
    }
    if let Some(ref path) = global.path {
        wp.wp_path = Some(path.clone());
    }
    if let Some(secs) = global.timeout {
        wp.timeout = Duration::from_secs(secs);
    }
    wp.allow_root |= global.allow_root;
    wp
}

// ── Per-command resolution ──────────────────────────────────────────

impl Session {
    /// Source domain: `--from`, then the profile.
    pub fn source_domain(&self, args: &SourceArgs) -> Result<String, CliError> {
        let raw = args
            .from
            .clone()
            .or_else(|| self.profile.source_domain.clone())
            .ok_or_else(|| CliError::MissingArgument {
                what: "source domain".into(),
                flag: "--from".into(),
                profile: self.profile_name.clone(),
            })?;
        Ok(validate_domain(&raw).map_err(CoreError::from)?)
    }

    /// Default target: `--to`, then the profile's target or network target.
    pub fn target_domain(&self, args: &TargetArgs) -> Result<String, CliError> {
        let raw = args
            .to
            .clone()
            .or_else(|| self.profile.target_domain.clone())
            .or_else(|| self.profile.network_target.clone())
            .ok_or_else(|| CliError::MissingArgument {
                what: "target domain".into(),
                flag: "--to".into(),
                profile: self.profile_name.clone(),
            })?;
        Ok(validate_domain(&raw).map_err(CoreError::from)?)
    }

    pub fn directory_settings(&self, args: &SourceArgs) -> DirectorySettings {
        DirectorySettings {
            multisite: args.multisite || self.profile.multisite == Some(true),
        }
    }

    /// Columns to leave untouched: config defaults plus extra flags.
    pub fn skip_columns(&self, extra: &[String]) -> Vec<String> {
        let mut columns = self.config.defaults.skip_columns.clone();
        for column in extra {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }
}
