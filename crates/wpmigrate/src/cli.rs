//! Clap derive structures for the `wpmigrate` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.
//! Also compiled by `build.rs` for man pages, so it depends on clap alone.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wpmigrate -- move WordPress installs to new domains
#[derive(Debug, Parser)]
#[command(
    name = "wpmigrate",
    version,
    about = "Move WordPress single-site and multisite installs to new domains",
    long_about = "Rewrites every stored reference to a site's domain after a WordPress\n\
        database has been copied to a new host.\n\n\
        Multisite networks are discovered through WP-CLI: each tenant gets its\n\
        own mapping, routing tables are updated, and content is rewritten one\n\
        tenant at a time with the main site last.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Install profile to use
    #[arg(long, short = 'p', env = "WPMIGRATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// WP-CLI executable (overrides config)
    #[arg(long, env = "WPMIGRATE_WP", global = true, value_name = "BINARY")]
    pub wp: Option<PathBuf>,

    /// WordPress root directory (overrides profile)
    #[arg(long, env = "WPMIGRATE_PATH", global = true, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Per-call WP-CLI timeout in seconds
    #[arg(long, env = "WPMIGRATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Pass --allow-root to WP-CLI
    #[arg(long, global = true)]
    pub allow_root: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WPMIGRATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts and accept suggested targets
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the install's topology and tenants
    #[command(alias = "ls")]
    Sites(SitesArgs),

    /// Build mappings and print the rewrite plan without writing anything
    Plan(PlanArgs),

    /// Rewrite domains across the install
    Migrate(MigrateArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Source/Target Arguments ───────────────────────────────────

/// Where the install lives now.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Domain the install currently answers on (overrides profile)
    #[arg(long, short = 'f', value_name = "DOMAIN")]
    pub from: Option<String>,

    /// Treat the install as multisite even if detection says otherwise
    #[arg(long)]
    pub multisite: bool,
}

/// Where it should answer afterwards.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Target domain for the main site (and the whole network for
    /// subdirectory installs)
    #[arg(long, short = 't', value_name = "DOMAIN")]
    pub to: Option<String>,

    /// Target for one tenant of a subdomain network (repeatable)
    #[arg(long = "site", value_name = "ID=DOMAIN", value_parser = parse_site_target)]
    pub sites: Vec<(u64, String)>,
}

fn parse_site_target(raw: &str) -> Result<(u64, String), String> {
    let (id, target) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=DOMAIN, got '{raw}'"))?;
    let id: u64 = id
        .trim()
        .parse()
        .map_err(|_| format!("site id must be a positive integer, got '{id}'"))?;
    if id == 0 {
        return Err("site id must be a positive integer, got '0'".into());
    }
    Ok((id, target.trim().to_owned()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PLAN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MIGRATE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Count matches without writing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Remember the confirmed targets in the active profile
    #[arg(long)]
    pub save: bool,

    /// Copy the WP-CLI transcript here before the scratch area is removed
    #[arg(long, value_name = "FILE")]
    pub keep_transcript: Option<PathBuf>,

    /// Only rewrite WordPress core tables
    #[arg(long)]
    pub core_tables_only: bool,

    /// Additional column to leave untouched (repeatable)
    #[arg(long = "skip-column", value_name = "COLUMN")]
    pub skip_columns: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
