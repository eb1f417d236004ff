// ── Site-administration port ──
//
// Everything the core knows about the database goes through this trait.
// `WpCli` is the production adapter; tests inject a recording fake.

mod wp_cli;

#[cfg(test)]
pub(crate) mod fake;

use serde::Serialize;
use thiserror::Error;

pub use wp_cli::{WpCli, WpCliConfig};

// ── Port errors ──────────────────────────────────────────────────────

/// Failure reported by the site-administration interface. The text of
/// `stderr` is carried verbatim so operators can repair by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("could not run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("`{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("unexpected output from `{command}`: {reason}")]
    Parse { command: String, reason: String },
}

// ── Port value types ─────────────────────────────────────────────────

/// One row of the tenant listing, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRow {
    pub id: u64,
    pub domain: String,
    pub path: String,
}

/// A literal (non-regex) search/replace pass.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    pub search: &'a str,
    pub replace: &'a str,
    /// Tenant selector (`--url`); `None` addresses the whole install.
    pub selector: Option<&'a str>,
    /// Explicit table list; when non-empty it replaces the table scope
    /// implied by `selector` and `all_tables`.
    pub tables: &'a [String],
    /// Also cover tables outside the WordPress core schema.
    pub all_tables: bool,
    /// Count matches without writing.
    pub dry_run: bool,
    pub skip_columns: &'a [String],
}

// ── Port trait ───────────────────────────────────────────────────────

/// The narrow site-administration interface the core depends on.
///
/// Calls are strictly sequential; implementations are never invoked
/// concurrently.
#[allow(async_fn_in_trait)]
pub trait SiteAdmin {
    /// Cheap reachability probe. Failure here means nothing else will work.
    async fn ping(&self) -> Result<(), AdminError>;

    async fn list_tenants(&self, reference: &str) -> Result<Vec<TenantRow>, AdminError>;

    /// Number of rows in the network table.
    async fn network_row_count(&self, reference: &str) -> Result<u64, AdminError>;

    async fn evaluate_boolean(&self, expression: &str, reference: &str)
    -> Result<bool, AdminError>;

    /// Database table prefix (`wp_` by default).
    async fn table_prefix(&self) -> Result<String, AdminError>;

    /// Tables visible to the tenant at `selector`. With `all_tables` this is
    /// every table sharing its prefix, otherwise the registered ones.
    async fn list_tables(&self, selector: Option<&str>, all_tables: bool)
    -> Result<Vec<String>, AdminError>;

    /// Run a literal search/replace and return the number of replacements.
    async fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<u64, AdminError>;

    /// Execute one SQL statement against the routing tables.
    async fn execute_statement(&self, statement: &str) -> Result<(), AdminError>;

    async fn flush_cache(&self, selector: Option<&str>) -> Result<(), AdminError>;

    async fn flush_rewrite_rules(&self, selector: Option<&str>) -> Result<(), AdminError>;

    async fn delete_all_transients(&self, selector: Option<&str>) -> Result<(), AdminError>;
}
