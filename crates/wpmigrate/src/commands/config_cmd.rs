//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Confirm, Input};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display in TOML shape.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "wp_binary = \"{}\"", cfg.defaults.wp_binary.display());
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "skip_columns = {:?}", cfg.defaults.skip_columns);
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "allow_root = {}", cfg.defaults.allow_root);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref path) = p.wp_path {
            let _ = writeln!(out, "wp_path = \"{}\"", path.display());
        }
        if let Some(ref source) = p.source_domain {
            let _ = writeln!(out, "source_domain = \"{source}\"");
        }
        if let Some(ref target) = p.target_domain {
            let _ = writeln!(out, "target_domain = \"{target}\"");
        }
        if let Some(multisite) = p.multisite {
            let _ = writeln!(out, "multisite = {multisite}");
        }
        if let Some(ref network) = p.network_target {
            let _ = writeln!(out, "network_target = \"{network}\"");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if !p.sites.is_empty() {
            let _ = writeln!(out, "\n[profiles.{name}.sites]");
            for (id, target) in &p.sites {
                let _ = writeln!(out, "\"{id}\" = \"{target}\"");
            }
        }
    }

    out.trim_end().to_owned()
}

/// Optional text answer; empty means unset.
fn ask_optional(prompt: &str) -> Result<Option<String>, CliError> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_owned()))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("wpmigrate configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load_config_or_default();

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default(cfg.profile_name(global.profile.as_deref()))
                .interact_text()?;

            let wp_path = ask_optional("WordPress root directory (blank for current directory)")?;
            let source_domain = ask_optional("Current domain")?;
            let target_domain = ask_optional("New domain")?;
            let multisite = Confirm::new()
                .with_prompt("Is this a multisite network?")
                .default(false)
                .interact()?;

            let profile = Profile {
                wp_path: wp_path.map(Into::into),
                source_domain,
                target_domain,
                multisite: multisite.then_some(true),
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = config::save_config(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Try it: wpmigrate sites");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: wpmigrate config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}
