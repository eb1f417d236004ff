// ── WP-CLI process adapter ──
//
// Runs the `wp` binary once per port call. Introspection calls skip
// plugins and themes so a broken plugin cannot block discovery; rewrites
// load the full stack because plugins may register their own tables.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use super::{AdminError, RewriteRequest, SiteAdmin, TenantRow};

const SKIP_EXTENSIONS: [&str; 2] = ["--skip-plugins", "--skip-themes"];

/// How to invoke WP-CLI.
#[derive(Debug, Clone)]
pub struct WpCliConfig {
    /// Path or name of the `wp` executable.
    pub binary: PathBuf,
    /// WordPress root passed as `--path`.
    pub wp_path: Option<PathBuf>,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Pass `--allow-root` (containers commonly run as root).
    pub allow_root: bool,
}

impl Default for WpCliConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("wp"),
            wp_path: None,
            timeout: Duration::from_secs(600),
            allow_root: false,
        }
    }
}

/// [`SiteAdmin`] backed by the `wp` command-line tool.
#[derive(Debug, Clone)]
pub struct WpCli {
    config: WpCliConfig,
    transcript: Option<PathBuf>,
}

impl WpCli {
    pub fn new(config: WpCliConfig) -> Self {
        Self {
            config,
            transcript: None,
        }
    }

    /// Append every invocation and its output to `path`.
    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript = Some(path.into());
        self
    }

    pub fn config(&self) -> &WpCliConfig {
        &self.config
    }

    /// Run one `wp` invocation and return its stdout.
    async fn run(&self, args: &[String]) -> Result<String, AdminError> {
        let mut full_args = Vec::with_capacity(args.len() + 2);
        if let Some(ref path) = self.config.wp_path {
            full_args.push(format!("--path={}", path.display()));
        }
        if self.config.allow_root {
            full_args.push("--allow-root".to_owned());
        }
        full_args.extend_from_slice(args);

        let rendered = self.render(&full_args);
        debug!(command = %rendered, "running wp-cli");

        let mut command = Command::new(&self.config.binary);
        command
            .args(&full_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.timeout, command.output()).await {
            Err(_) => {
                self.record(&rendered, None, "", "timed out").await;
                return Err(AdminError::Timeout {
                    command: rendered,
                    timeout_secs: self.config.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                self.record(&rendered, None, "", &e.to_string()).await;
                return Err(AdminError::Spawn {
                    command: rendered,
                    reason: e.to_string(),
                });
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        self.record(&rendered, output.status.code(), &stdout, &stderr)
            .await;
        trace!(stdout = %stdout, stderr = %stderr, "wp-cli output");

        if !output.status.success() {
            return Err(AdminError::Failed {
                command: rendered,
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_owned(),
            });
        }
        Ok(stdout)
    }

    fn render(&self, args: &[String]) -> String {
        let mut parts = vec![self.config.binary.display().to_string()];
        parts.extend(args.iter().map(|arg| {
            if arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
                format!("{arg:?}")
            } else {
                arg.clone()
            }
        }));
        parts.join(" ")
    }

    async fn record(&self, command: &str, status: Option<i32>, stdout: &str, stderr: &str) {
        let Some(ref path) = self.transcript else {
            return;
        };
        let status = status.map_or_else(|| "-".to_owned(), |code| code.to_string());
        let entry = format!(
            "[{}] $ {command}\nstatus: {status}\n--- stdout\n{stdout}\n--- stderr\n{stderr}\n\n",
            chrono::Utc::now().to_rfc3339(),
        );
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(entry.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "could not append to wp-cli transcript");
        }
    }
}

fn url_arg(selector: &str) -> String {
    format!("--url={selector}")
}

fn introspection(args: &[&str], reference: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    out.extend(SKIP_EXTENSIONS.iter().map(|a| (*a).to_owned()));
    if let Some(reference) = reference.filter(|r| !r.is_empty()) {
        out.push(url_arg(reference));
    }
    out
}

fn parse_count(command: &str, stdout: &str) -> Result<u64, AdminError> {
    let last = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .unwrap_or("");
    last.parse().map_err(|_| AdminError::Parse {
        command: command.to_owned(),
        reason: format!("expected a number, got '{last}'"),
    })
}

fn parse_tables(stdout: &str) -> Vec<String> {
    stdout
        .split([',', '\n'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

// `wp site list --format=json` reports blog_id as a string on most
// versions and as a number on some.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
struct RawTenant {
    blog_id: RawId,
    domain: String,
    path: String,
}

fn parse_tenants(command: &str, stdout: &str) -> Result<Vec<TenantRow>, AdminError> {
    let raw: Vec<RawTenant> = serde_json::from_str(stdout.trim()).map_err(|e| AdminError::Parse {
        command: command.to_owned(),
        reason: e.to_string(),
    })?;
    raw.into_iter()
        .map(|row| {
            let id = match row.blog_id {
                RawId::Number(n) => n,
                RawId::Text(text) => text.trim().parse().map_err(|_| AdminError::Parse {
                    command: command.to_owned(),
                    reason: format!("blog_id '{text}' is not a number"),
                })?,
            };
            Ok(TenantRow {
                id,
                domain: row.domain,
                path: row.path,
            })
        })
        .collect()
}

impl SiteAdmin for WpCli {
    async fn ping(&self) -> Result<(), AdminError> {
        self.run(&introspection(&["core", "is-installed"], None))
            .await
            .map(|_| ())
    }

    async fn list_tenants(&self, reference: &str) -> Result<Vec<TenantRow>, AdminError> {
        let args = introspection(
            &["site", "list", "--fields=blog_id,domain,path", "--format=json"],
            Some(reference),
        );
        let stdout = self.run(&args).await?;
        parse_tenants("wp site list", &stdout)
    }

    async fn network_row_count(&self, reference: &str) -> Result<u64, AdminError> {
        let prefix = self.table_prefix().await?;
        let query = format!("SELECT COUNT(*) FROM {prefix}site");
        let args = introspection(
            &["db", "query", &query, "--skip-column-names"],
            Some(reference),
        );
        let stdout = self.run(&args).await?;
        parse_count("wp db query", &stdout)
    }

    async fn evaluate_boolean(
        &self,
        expression: &str,
        reference: &str,
    ) -> Result<bool, AdminError> {
        let code = format!("echo ({expression}) ? 'yes' : 'no';");
        let args = introspection(&["eval", &code], Some(reference));
        let stdout = self.run(&args).await?;
        match stdout.trim() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(AdminError::Parse {
                command: format!("wp eval {expression}"),
                reason: format!("expected yes/no, got '{other}'"),
            }),
        }
    }

    async fn table_prefix(&self) -> Result<String, AdminError> {
        let stdout = self.run(&introspection(&["db", "prefix"], None)).await?;
        let prefix = stdout.trim();
        if prefix.is_empty() {
            return Err(AdminError::Parse {
                command: "wp db prefix".into(),
                reason: "empty table prefix".into(),
            });
        }
        Ok(prefix.to_owned())
    }

    async fn list_tables(
        &self,
        selector: Option<&str>,
        all_tables: bool,
    ) -> Result<Vec<String>, AdminError> {
        let mut args = vec!["db".to_owned(), "tables".to_owned(), "--format=csv".to_owned()];
        if all_tables {
            args.push("--all-tables-with-prefix".to_owned());
        }
        if let Some(selector) = selector {
            args.push(url_arg(selector));
        }
        let stdout = self.run(&args).await?;
        Ok(parse_tables(&stdout))
    }

    async fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<u64, AdminError> {
        let mut args = vec![
            "search-replace".to_owned(),
            request.search.to_owned(),
            request.replace.to_owned(),
            "--format=count".to_owned(),
        ];
        args.extend(request.tables.iter().cloned());
        if let Some(selector) = request.selector {
            args.push(url_arg(selector));
        }
        if request.all_tables && request.tables.is_empty() {
            // With a tenant selector, `--all-tables` would reach every
            // tenant's tables. The prefixed form is only confined for
            // non-main tenants (`wp_2_`); the main site's `wp_` matches all
            // of them, so its passes arrive with an explicit table list.
            args.push(if request.selector.is_some() {
                "--all-tables-with-prefix".to_owned()
            } else {
                "--all-tables".to_owned()
            });
        }
        if !request.skip_columns.is_empty() {
            args.push(format!("--skip-columns={}", request.skip_columns.join(",")));
        }
        if request.dry_run {
            args.push("--dry-run".to_owned());
        }
        let stdout = self.run(&args).await?;
        parse_count("wp search-replace", &stdout)
    }

    async fn execute_statement(&self, statement: &str) -> Result<(), AdminError> {
        let args = vec!["db".to_owned(), "query".to_owned(), statement.to_owned()];
        self.run(&args).await.map(|_| ())
    }

    async fn flush_cache(&self, selector: Option<&str>) -> Result<(), AdminError> {
        self.run(&introspection(&["cache", "flush"], selector))
            .await
            .map(|_| ())
    }

    async fn flush_rewrite_rules(&self, selector: Option<&str>) -> Result<(), AdminError> {
        let mut args = vec!["rewrite".to_owned(), "flush".to_owned()];
        if let Some(selector) = selector {
            args.push(url_arg(selector));
        }
        self.run(&args).await.map(|_| ())
    }

    async fn delete_all_transients(&self, selector: Option<&str>) -> Result<(), AdminError> {
        self.run(&introspection(&["transient", "delete", "--all"], selector))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_and_numeric_blog_ids() {
        let json = r#"[
            {"blog_id":"1","domain":"example.com","path":"/"},
            {"blog_id":2,"domain":"example.com","path":"/shop/"}
        ]"#;
        let rows = parse_tenants("wp site list", json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].id, 2);
        assert_eq!(rows[1].path, "/shop/");
    }

    #[test]
    fn rejects_non_numeric_blog_id() {
        let json = r#"[{"blog_id":"one","domain":"example.com","path":"/"}]"#;
        let err = parse_tenants("wp site list", json).unwrap_err();
        assert!(matches!(err, AdminError::Parse { .. }));
    }

    #[test]
    fn count_uses_last_non_empty_line() {
        assert_eq!(parse_count("wp", "12\n").unwrap(), 12);
        assert_eq!(parse_count("wp", "Notice: something\n7\n\n").unwrap(), 7);
        assert!(parse_count("wp", "Success: done").is_err());
        assert!(parse_count("wp", "").is_err());
    }

    #[test]
    fn introspection_adds_skip_flags_and_selector() {
        let args = introspection(&["site", "list"], Some("example.com"));
        assert_eq!(
            args,
            vec![
                "site",
                "list",
                "--skip-plugins",
                "--skip-themes",
                "--url=example.com"
            ]
        );
        let args = introspection(&["db", "prefix"], Some(""));
        assert!(!args.iter().any(|a| a.starts_with("--url")));
    }

    #[test]
    fn table_listing_accepts_csv_and_lines() {
        assert_eq!(
            parse_tables("wp_options,wp_posts,wp_2_posts\n"),
            vec!["wp_options", "wp_posts", "wp_2_posts"]
        );
        assert_eq!(parse_tables("wp_options\nwp_users\n\n"), vec!["wp_options", "wp_users"]);
        assert!(parse_tables("").is_empty());
    }

    #[test]
    fn render_quotes_arguments_with_spaces() {
        let cli = WpCli::new(WpCliConfig::default());
        let rendered = cli.render(&["db".into(), "query".into(), "SELECT 1".into()]);
        assert_eq!(rendered, r#"wp db query "SELECT 1""#);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let cli = WpCli::new(WpCliConfig {
            binary: PathBuf::from("/nonexistent/wpmigrate-test-wp"),
            ..WpCliConfig::default()
        });
        let err = cli.ping().await.unwrap_err();
        assert!(matches!(err, AdminError::Spawn { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn transcript_records_failed_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = dir.path().join("wp-cli.log");
        let cli = WpCli::new(WpCliConfig {
            binary: PathBuf::from("/nonexistent/wpmigrate-test-wp"),
            ..WpCliConfig::default()
        })
        .with_transcript(&transcript);
        let _ = cli.table_prefix().await;
        let _ = cli.list_tables(Some("example.test"), true).await;
        let logged = std::fs::read_to_string(&transcript).unwrap();
        assert!(logged.contains("db prefix"));
        assert!(logged.contains("db tables --format=csv --all-tables-with-prefix --url=example.test"));
        assert_eq!(logged.matches("status: -").count(), 2);
    }
}
