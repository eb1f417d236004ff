//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use wpmigrate_config::ConfigError;
use wpmigrate_core::{AdminError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const INTERFACE: i32 = 4;
    pub const PARTIAL_FAILURE: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Usage ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wpmigrate::validation))]
    Validation { field: String, reason: String },

    #[error("No {what} given")]
    #[diagnostic(
        code(wpmigrate::missing_argument),
        help("Pass {flag}, or set it in the active profile ({profile}).")
    )]
    MissingArgument {
        what: String,
        flag: String,
        profile: String,
    },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wpmigrate::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(wpmigrate::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: wpmigrate config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(wpmigrate::config))]
    Config(#[from] ConfigError),

    #[error("{message}")]
    #[diagnostic(code(wpmigrate::configuration))]
    Configuration { message: String },

    // ── Site administration ──────────────────────────────────────────
    #[error("WP-CLI failed during {operation}")]
    #[diagnostic(
        code(wpmigrate::interface),
        help(
            "Check that `wp` is installed and that --path points at the WordPress root.\n\
             WP-CLI said: {detail}"
        )
    )]
    Interface {
        operation: String,
        detail: String,
        #[source]
        source: AdminError,
    },

    #[error("Could not build a rewrite plan: {message}")]
    #[diagnostic(code(wpmigrate::plan))]
    Plan { message: String },

    // ── Run outcome ──────────────────────────────────────────────────
    #[error("Rewrite failed for {count} site(s): {sites}")]
    #[diagnostic(
        code(wpmigrate::partial_failure),
        help(
            "Other sites completed. Re-run with -v for the raw WP-CLI errors, \
             or rerun the listed sites after fixing the cause."
        )
    )]
    PartialFailure { count: usize, sites: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Prompt failed: {0}")]
    #[diagnostic(code(wpmigrate::prompt))]
    Prompt(#[from] dialoguer::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. }
            | Self::MissingArgument { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::ProfileNotFound { .. } | Self::Config(_) | Self::Configuration { .. } => {
                exit_code::CONFIG
            }
            Self::Interface { .. } => exit_code::INTERFACE,
            Self::PartialFailure { .. } => exit_code::PARTIAL_FAILURE,
            Self::Plan { .. } | Self::Io(_) | Self::Prompt(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration { message } => Self::Configuration { message },

            CoreError::Validation(e) => Self::Validation {
                field: "domain".into(),
                reason: e.to_string(),
            },

            CoreError::Plan(e) => Self::Plan {
                message: e.to_string(),
            },

            CoreError::ExternalInterface { operation, source } => Self::Interface {
                detail: admin_detail(&source),
                operation,
                source,
            },

            CoreError::RoutingUpdate { message } => Self::Plan { message },

            CoreError::Io(e) => Self::Io(e),
        }
    }
}

/// The most useful single line of an interface failure.
fn admin_detail(err: &AdminError) -> String {
    match err {
        AdminError::Failed { stderr, .. } if !stderr.is_empty() => stderr.clone(),
        other => other.to_string(),
    }
}
