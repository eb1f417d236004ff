//! Routing table updates for multisite installs.
//!
//! `{prefix}blogs` maps tenant ids to `(domain, path)` and `{prefix}site`
//! describes the network. Updates are plain idempotent `UPDATE`s; the exact
//! statements run automatically are the ones handed back for manual repair
//! when any of them fails.

use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

use crate::admin::SiteAdmin;
use crate::error::CoreError;
use crate::model::{DomainMapping, SiteId, Topology, normalize_path};
use crate::sanitize::host_of;

/// Table prefix assumed when the install cannot report its own.
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Id of the network row in `{prefix}site`.
const NETWORK_ID: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoutingTable {
    Blogs,
    Network,
}

impl RoutingTable {
    pub fn table_name(self, prefix: &str) -> String {
        match self {
            Self::Blogs => format!("{prefix}blogs"),
            Self::Network => format!("{prefix}site"),
        }
    }
}

/// One row to rewrite in a routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingUpdate {
    pub table: RoutingTable,
    pub site_id: Option<SiteId>,
    pub domain: String,
    pub path: Option<String>,
}

impl RoutingUpdate {
    /// Render as a standalone SQL statement.
    pub fn to_sql(&self, prefix: &str) -> String {
        let table = self.table.table_name(prefix);
        let mut assignments = format!("domain = '{}'", escape_sql(&self.domain));
        if let Some(ref path) = self.path {
            assignments.push_str(&format!(", path = '{}'", escape_sql(path)));
        }
        let predicate = match self.table {
            RoutingTable::Blogs => format!(
                "blog_id = {}",
                self.site_id.map_or(NETWORK_ID, SiteId::get)
            ),
            RoutingTable::Network => format!("id = {NETWORK_ID}"),
        };
        format!("UPDATE {table} SET {assignments} WHERE {predicate};")
    }
}

fn escape_sql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoutingStatus {
    /// Every row was written.
    Applied,
    /// Statements were rendered but not run.
    DryRun,
    /// Automated update failed; the statements must be run by hand.
    ManualRequired,
}

/// What happened to the routing tables, with the statements either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingOutcome {
    pub status: RoutingStatus,
    pub updates: Vec<RoutingUpdate>,
    pub statements: Vec<String>,
    pub error: Option<String>,
}

impl RoutingOutcome {
    pub fn applied(&self) -> bool {
        self.status == RoutingStatus::Applied
    }

    fn manual(updates: Vec<RoutingUpdate>, statements: Vec<String>, error: String) -> Self {
        Self {
            status: RoutingStatus::ManualRequired,
            updates,
            statements,
            error: Some(error),
        }
    }
}

/// Derive the routing rows for `mappings`.
///
/// The base domain is the host of the main site's target. Subdirectory
/// networks store the base domain on every row and distinguish tenants by
/// path; subdomain networks store each tenant's own host with path `/`.
pub fn plan_routing<'a>(
    mappings: impl IntoIterator<Item = &'a DomainMapping>,
    main_site: SiteId,
    topology: Topology,
) -> Result<Vec<RoutingUpdate>, CoreError> {
    if !topology.is_multisite() {
        return Ok(Vec::new());
    }
    let mut mappings: Vec<&DomainMapping> = mappings.into_iter().collect();
    mappings.sort_by_key(|m| m.site_id);

    let main = mappings
        .iter()
        .find(|m| m.site_id == main_site)
        .ok_or_else(|| CoreError::RoutingUpdate {
            message: format!("main site {main_site} has no mapping; base domain is unknown"),
        })?;
    let base = host_of(&main.target_domain).to_owned();
    let subdomain = topology == Topology::MultisiteSubdomain;

    let mut updates: Vec<RoutingUpdate> = mappings
        .iter()
        .map(|m| {
            let (domain, path) = if subdomain {
                (host_of(&m.target_domain).to_owned(), "/".to_owned())
            } else {
                (base.clone(), normalize_path(&m.target_path))
            };
            RoutingUpdate {
                table: RoutingTable::Blogs,
                site_id: Some(m.site_id),
                domain,
                path: Some(path),
            }
        })
        .collect();
    updates.push(RoutingUpdate {
        table: RoutingTable::Network,
        site_id: None,
        domain: base,
        path: Some("/".to_owned()),
    });
    Ok(updates)
}

/// Plan and apply the routing rows for `mappings`.
///
/// Never fails: any problem degrades to [`RoutingStatus::ManualRequired`]
/// with the full statement set.
pub async fn update_routing<'a, A: SiteAdmin>(
    admin: &A,
    mappings: impl IntoIterator<Item = &'a DomainMapping>,
    main_site: SiteId,
    topology: Topology,
    dry_run: bool,
) -> RoutingOutcome {
    let updates = match plan_routing(mappings, main_site, topology) {
        Ok(updates) => updates,
        Err(e) => {
            warn!(error = %e, "routing update could not be planned");
            return RoutingOutcome::manual(Vec::new(), Vec::new(), e.to_string());
        }
    };
    apply_routing(admin, updates, dry_run).await
}

/// Run `updates` through the interface, all-or-manual.
pub async fn apply_routing<A: SiteAdmin>(
    admin: &A,
    updates: Vec<RoutingUpdate>,
    dry_run: bool,
) -> RoutingOutcome {
    let (prefix, prefix_error) = match admin.table_prefix().await {
        Ok(prefix) => (prefix, None),
        Err(e) => (DEFAULT_TABLE_PREFIX.to_owned(), Some(e)),
    };
    let statements: Vec<String> = updates.iter().map(|u| u.to_sql(&prefix)).collect();

    if dry_run {
        return RoutingOutcome {
            status: RoutingStatus::DryRun,
            updates,
            statements,
            error: None,
        };
    }
    if let Some(e) = prefix_error {
        warn!(error = %e, "table prefix unavailable, routing left for manual update");
        return RoutingOutcome::manual(
            updates,
            statements,
            format!("could not read table prefix: {e}"),
        );
    }

    for (update, statement) in updates.iter().zip(&statements) {
        if let Err(e) = admin.execute_statement(statement).await {
            warn!(
                table = %update.table,
                site_id = ?update.site_id.map(SiteId::get),
                error = %e,
                "routing update failed, falling back to manual statements"
            );
            return RoutingOutcome::manual(updates, statements, e.to_string());
        }
    }

    info!(rows = statements.len(), "routing tables updated");
    RoutingOutcome {
        status: RoutingStatus::Applied,
        updates,
        statements,
        error: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::admin::fake::FakeAdmin;
    use crate::model::Site;
    use pretty_assertions::assert_eq;

    fn id(raw: u64) -> SiteId {
        SiteId::new(raw).unwrap()
    }

    fn mapping(site: u64, source: (&str, &str), target: (&str, &str)) -> DomainMapping {
        DomainMapping::for_site(&Site::new(id(site), source.0, source.1), target.0, target.1)
    }

    fn rows(updates: &[RoutingUpdate]) -> Vec<(Option<u64>, &str, Option<&str>)> {
        updates
            .iter()
            .map(|u| (u.site_id.map(SiteId::get), u.domain.as_str(), u.path.as_deref()))
            .collect()
    }

    #[test]
    fn subdirectory_rows_share_base_domain() {
        let mappings = [
            mapping(1, ("example.com", "/"), ("example.test", "/")),
            mapping(2, ("example.com", "/shop/"), ("example.test", "/shop/")),
        ];
        let updates = plan_routing(&mappings, id(1), Topology::MultisiteSubdirectory).unwrap();
        assert_eq!(
            rows(&updates),
            vec![
                (Some(1), "example.test", Some("/")),
                (Some(2), "example.test", Some("/shop/")),
                (None, "example.test", Some("/")),
            ]
        );
    }

    #[test]
    fn subdomain_rows_share_root_path() {
        let mappings = [
            mapping(2, ("shop.example.com", "/"), ("shop.example.test", "/")),
            mapping(1, ("example.com", "/"), ("example.test", "/")),
        ];
        let updates = plan_routing(&mappings, id(1), Topology::MultisiteSubdomain).unwrap();
        assert_eq!(
            rows(&updates),
            vec![
                (Some(1), "example.test", Some("/")),
                (Some(2), "shop.example.test", Some("/")),
                (None, "example.test", Some("/")),
            ]
        );
    }

    #[test]
    fn base_domain_drops_path() {
        let mappings = [mapping(1, ("example.com", "/"), ("example.test/wp", "/"))];
        let updates = plan_routing(&mappings, id(1), Topology::MultisiteSubdirectory).unwrap();
        assert_eq!(updates[0].domain, "example.test");
    }

    #[test]
    fn single_site_has_no_routing() {
        let mappings = [mapping(1, ("example.com", "/"), ("example.test", "/"))];
        assert!(plan_routing(&mappings, id(1), Topology::Single).unwrap().is_empty());
    }

    #[test]
    fn missing_main_mapping_is_a_routing_error() {
        let mappings = [mapping(2, ("example.com", "/shop/"), ("example.test", "/shop/"))];
        let err = plan_routing(&mappings, id(1), Topology::MultisiteSubdirectory).unwrap_err();
        assert!(matches!(err, CoreError::RoutingUpdate { .. }));
    }

    #[test]
    fn statements_escape_quotes() {
        let update = RoutingUpdate {
            table: RoutingTable::Blogs,
            site_id: Some(id(3)),
            domain: "o'brien.test".into(),
            path: Some("/".into()),
        };
        assert_eq!(
            update.to_sql("wp_"),
            "UPDATE wp_blogs SET domain = 'o''brien.test', path = '/' WHERE blog_id = 3;"
        );
        let network = RoutingUpdate {
            table: RoutingTable::Network,
            site_id: None,
            domain: "example.test".into(),
            path: None,
        };
        assert_eq!(
            network.to_sql("custom_"),
            "UPDATE custom_site SET domain = 'example.test' WHERE id = 1;"
        );
    }

    #[tokio::test]
    async fn applies_every_statement() {
        let admin = FakeAdmin::multisite(&[(1, "example.com", "/")], false);
        let mappings = [
            mapping(1, ("example.com", "/"), ("example.test", "/")),
            mapping(2, ("example.com", "/shop/"), ("example.test", "/shop/")),
        ];
        let outcome =
            update_routing(&admin, &mappings, id(1), Topology::MultisiteSubdirectory, false).await;
        assert!(outcome.applied());
        assert_eq!(admin.statements(), outcome.statements);
        assert_eq!(outcome.statements.len(), 3);
    }

    #[tokio::test]
    async fn failure_returns_full_manual_statement_set() {
        let mut admin = FakeAdmin::multisite(&[(1, "example.com", "/")], false);
        admin.fail_statements = true;
        let mappings = [
            mapping(1, ("example.com", "/"), ("example.test", "/")),
            mapping(2, ("example.com", "/shop/"), ("example.test", "/shop/")),
        ];
        let outcome =
            update_routing(&admin, &mappings, id(1), Topology::MultisiteSubdirectory, false).await;
        assert_eq!(outcome.status, RoutingStatus::ManualRequired);
        assert!(!outcome.applied());
        assert_eq!(outcome.statements.len(), 3);
        assert_eq!(admin.statements().len(), 1);
        assert!(outcome.error.unwrap().contains("UPDATE command denied"));
    }

    #[tokio::test]
    async fn dry_run_renders_without_writing() {
        let admin = FakeAdmin::multisite(&[(1, "example.com", "/")], true);
        let mappings = [mapping(1, ("example.com", "/"), ("example.test", "/"))];
        let outcome =
            update_routing(&admin, &mappings, id(1), Topology::MultisiteSubdomain, true).await;
        assert_eq!(outcome.status, RoutingStatus::DryRun);
        assert!(admin.statements().is_empty());
        assert_eq!(
            outcome.statements[0],
            "UPDATE wp_blogs SET domain = 'example.test', path = '/' WHERE blog_id = 1;"
        );
    }
}
