// In-memory `SiteAdmin` for unit tests: canned directory answers, injected
// failures, and a log of every mutating call.

use std::cell::RefCell;
use std::collections::HashSet;

use super::{AdminError, RewriteRequest, SiteAdmin, TenantRow};
use crate::directory::{IS_MULTISITE_EXPRESSION, SUBDOMAIN_INSTALL_EXPRESSION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRewrite {
    pub search: String,
    pub replace: String,
    pub selector: Option<String>,
    pub tables: Vec<String>,
    pub all_tables: bool,
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FakeAdmin {
    pub reachable: bool,
    pub tenants: Option<Vec<TenantRow>>,
    pub network_rows: u64,
    pub is_multisite: bool,
    pub subdomain_install: bool,
    pub prefix: String,
    pub table_names: Vec<String>,
    pub fail_tables: bool,
    pub failing_selectors: HashSet<String>,
    pub fail_statements: bool,
    pub fail_flush: bool,
    pub replacements_per_step: u64,
    rewrites: RefCell<Vec<RecordedRewrite>>,
    statements: RefCell<Vec<String>>,
    housekeeping: RefCell<Vec<String>>,
}

impl FakeAdmin {
    /// A reachable single-site install.
    pub fn single() -> Self {
        Self {
            reachable: true,
            prefix: "wp_".into(),
            replacements_per_step: 1,
            ..Self::default()
        }
    }

    /// A reachable multisite install with the given `(id, domain, path)` rows.
    pub fn multisite(rows: &[(u64, &str, &str)], subdomain: bool) -> Self {
        Self {
            tenants: Some(
                rows.iter()
                    .map(|(id, domain, path)| TenantRow {
                        id: *id,
                        domain: (*domain).to_owned(),
                        path: (*path).to_owned(),
                    })
                    .collect(),
            ),
            network_rows: 1,
            is_multisite: true,
            table_names: [
                "wp_blogs",
                "wp_options",
                "wp_posts",
                "wp_site",
                "wp_sitemeta",
                "wp_users",
                "wp_2_options",
                "wp_2_posts",
                "wp_12_posts",
                "wp_2fa_tokens",
            ]
            .map(str::to_owned)
            .to_vec(),
            subdomain_install: subdomain,
            ..Self::single()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, selector: &str) -> Self {
        self.failing_selectors.insert(selector.to_owned());
        self
    }

    pub fn rewrites(&self) -> Vec<RecordedRewrite> {
        self.rewrites.borrow().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    pub fn housekeeping(&self) -> Vec<String> {
        self.housekeeping.borrow().clone()
    }

    fn down(command: &str) -> AdminError {
        AdminError::Spawn {
            command: command.to_owned(),
            reason: "connection refused".into(),
        }
    }

    fn note(&self, what: &str) -> Result<(), AdminError> {
        self.housekeeping.borrow_mut().push(what.to_owned());
        if self.fail_flush {
            return Err(AdminError::Failed {
                command: what.to_owned(),
                status: 1,
                stderr: "Error: object cache unavailable".into(),
            });
        }
        Ok(())
    }
}

impl SiteAdmin for FakeAdmin {
    async fn ping(&self) -> Result<(), AdminError> {
        if self.reachable {
            Ok(())
        } else {
            Err(Self::down("wp core is-installed"))
        }
    }

    async fn list_tenants(&self, _reference: &str) -> Result<Vec<TenantRow>, AdminError> {
        self.tenants.clone().ok_or_else(|| AdminError::Failed {
            command: "wp site list".into(),
            status: 1,
            stderr: "Error: This is not a multisite installation.".into(),
        })
    }

    async fn network_row_count(&self, _reference: &str) -> Result<u64, AdminError> {
        if self.tenants.is_none() {
            return Err(AdminError::Failed {
                command: "wp db query".into(),
                status: 1,
                stderr: "ERROR 1146 (42S02): Table 'wp_site' doesn't exist".into(),
            });
        }
        Ok(self.network_rows)
    }

    async fn evaluate_boolean(
        &self,
        expression: &str,
        _reference: &str,
    ) -> Result<bool, AdminError> {
        match expression {
            IS_MULTISITE_EXPRESSION => Ok(self.is_multisite),
            SUBDOMAIN_INSTALL_EXPRESSION => Ok(self.subdomain_install),
            other => Err(AdminError::Parse {
                command: format!("wp eval {other}"),
                reason: "unknown expression".into(),
            }),
        }
    }

    async fn table_prefix(&self) -> Result<String, AdminError> {
        if self.reachable {
            Ok(self.prefix.clone())
        } else {
            Err(Self::down("wp db prefix"))
        }
    }

    async fn list_tables(
        &self,
        _selector: Option<&str>,
        _all_tables: bool,
    ) -> Result<Vec<String>, AdminError> {
        if self.fail_tables {
            return Err(AdminError::Failed {
                command: "wp db tables".into(),
                status: 1,
                stderr: "Error: Couldn't find any tables matching: wp_*".into(),
            });
        }
        Ok(self.table_names.clone())
    }

    async fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<u64, AdminError> {
        self.rewrites.borrow_mut().push(RecordedRewrite {
            search: request.search.to_owned(),
            replace: request.replace.to_owned(),
            selector: request.selector.map(str::to_owned),
            tables: request.tables.to_vec(),
            all_tables: request.all_tables,
            dry_run: request.dry_run,
        });
        if let Some(selector) = request.selector {
            if self.failing_selectors.contains(selector) {
                return Err(AdminError::Failed {
                    command: format!("wp search-replace --url={selector}"),
                    status: 1,
                    stderr: format!("Error: Site '{selector}' not found."),
                });
            }
        }
        Ok(self.replacements_per_step)
    }

    async fn execute_statement(&self, statement: &str) -> Result<(), AdminError> {
        self.statements.borrow_mut().push(statement.to_owned());
        if self.fail_statements {
            return Err(AdminError::Failed {
                command: "wp db query".into(),
                status: 1,
                stderr: "ERROR 1142 (42000): UPDATE command denied".into(),
            });
        }
        Ok(())
    }

    async fn flush_cache(&self, _selector: Option<&str>) -> Result<(), AdminError> {
        self.note("cache flush")
    }

    async fn flush_rewrite_rules(&self, _selector: Option<&str>) -> Result<(), AdminError> {
        self.note("rewrite flush")
    }

    async fn delete_all_transients(&self, _selector: Option<&str>) -> Result<(), AdminError> {
        self.note("transient delete")
    }
}
