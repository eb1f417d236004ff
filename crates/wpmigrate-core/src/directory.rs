//! Site directory: which tenants exist and how the install routes them.
//!
//! Multisite detection is layered because each signal can be missing on a
//! half-configured install: routing-table rows first, then the persisted
//! setting, then asking WordPress itself.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::admin::{AdminError, SiteAdmin, TenantRow};
use crate::error::CoreError;
use crate::main_site::resolve_main_site;
use crate::model::{Site, SiteId, Topology};
use crate::sanitize::{sanitize, validate_domain};

pub const IS_MULTISITE_EXPRESSION: &str = "is_multisite()";
pub const SUBDOMAIN_INSTALL_EXPRESSION: &str = "defined('SUBDOMAIN_INSTALL') && SUBDOMAIN_INSTALL";

/// Persisted hints that feed topology detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorySettings {
    /// The operator recorded this install as multisite.
    pub multisite: bool,
}

/// Tenants and topology as read at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteDirectory {
    pub topology: Topology,
    pub sites: Vec<Site>,
}

impl SiteDirectory {
    pub fn main_site(&self) -> SiteId {
        resolve_main_site(&self.sites)
    }

    pub fn get(&self, id: SiteId) -> Option<&Site> {
        self.sites.iter().find(|site| site.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultisiteSignal {
    RoutingRows,
    PersistedSetting,
    Interface,
    None,
}

/// Read the tenant list and topology for the install addressed by
/// `reference_domain`. Any failure to reach the interface is fatal.
pub async fn list_sites<A: SiteAdmin>(
    admin: &A,
    reference_domain: &str,
    settings: &DirectorySettings,
) -> Result<SiteDirectory, CoreError> {
    let reference = validate_domain(reference_domain)?;

    admin
        .ping()
        .await
        .map_err(|e| CoreError::interface("site directory read", e))?;

    let (rows, list_error) = match admin.list_tenants(&reference).await {
        Ok(rows) => (rows, None),
        Err(e) => {
            debug!(error = %e, "tenant listing unavailable, assuming single site");
            (Vec::new(), Some(e))
        }
    };

    let signal = detect_multisite(admin, &reference, &rows, settings).await;
    debug!(?signal, rows = rows.len(), "multisite detection");

    if signal == MultisiteSignal::None {
        info!(domain = %reference, "single-site install");
        return Ok(SiteDirectory {
            topology: Topology::Single,
            sites: vec![Site::new(SiteId::PRIMARY, reference, "/")],
        });
    }

    let sites = normalize_rows(rows);
    if sites.is_empty() {
        return Err(CoreError::interface(
            "site list",
            list_error.unwrap_or_else(|| AdminError::Parse {
                command: "wp site list".into(),
                reason: "multisite install returned no tenants".into(),
            }),
        ));
    }

    let topology = classify(admin, &reference, &sites).await;
    info!(%topology, sites = sites.len(), "multisite install");
    Ok(SiteDirectory { topology, sites })
}

async fn detect_multisite<A: SiteAdmin>(
    admin: &A,
    reference: &str,
    rows: &[TenantRow],
    settings: &DirectorySettings,
) -> MultisiteSignal {
    if rows.len() > 1 {
        return MultisiteSignal::RoutingRows;
    }
    match admin.network_row_count(reference).await {
        Ok(count) if count > 0 => return MultisiteSignal::RoutingRows,
        Ok(_) => {}
        Err(e) => debug!(error = %e, "network table unavailable"),
    }
    if settings.multisite {
        return MultisiteSignal::PersistedSetting;
    }
    match admin
        .evaluate_boolean(IS_MULTISITE_EXPRESSION, reference)
        .await
    {
        Ok(true) => MultisiteSignal::Interface,
        Ok(false) => MultisiteSignal::None,
        Err(e) => {
            warn!(error = %e, "could not evaluate is_multisite(), assuming single site");
            MultisiteSignal::None
        }
    }
}

async fn classify<A: SiteAdmin>(admin: &A, reference: &str, sites: &[Site]) -> Topology {
    match admin
        .evaluate_boolean(SUBDOMAIN_INSTALL_EXPRESSION, reference)
        .await
    {
        Ok(true) => Topology::MultisiteSubdomain,
        Ok(false) => Topology::MultisiteSubdirectory,
        Err(e) => {
            // Subdirectory networks are the only ones that route on path.
            let by_path = sites.iter().any(|site| !site.is_root());
            warn!(error = %e, by_path, "SUBDOMAIN_INSTALL unreadable, inferring from paths");
            if by_path {
                Topology::MultisiteSubdirectory
            } else {
                Topology::MultisiteSubdomain
            }
        }
    }
}

fn normalize_rows(rows: Vec<TenantRow>) -> Vec<Site> {
    let mut sites: Vec<Site> = rows
        .into_iter()
        .filter_map(|row| {
            let Some(id) = SiteId::new(row.id) else {
                warn!(domain = %row.domain, "ignoring tenant row with id 0");
                return None;
            };
            Some(Site::new(id, sanitize(&row.domain), &row.path))
        })
        .collect();
    sites.sort_by_key(|site| site.id);
    sites.dedup_by_key(|site| site.id);
    sites
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::admin::fake::FakeAdmin;

    #[tokio::test]
    async fn unreachable_interface_is_fatal() {
        let admin = FakeAdmin::unreachable();
        let err = list_sites(&admin, "example.com", &DirectorySettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ExternalInterface { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn invalid_reference_is_rejected() {
        let admin = FakeAdmin::single();
        let err = list_sites(&admin, "   ", &DirectorySettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn single_site_yields_site_one() {
        let admin = FakeAdmin::single();
        let dir = list_sites(&admin, "https://www.example.com/", &DirectorySettings::default())
            .await
            .unwrap();
        assert_eq!(dir.topology, Topology::Single);
        assert_eq!(dir.sites, vec![Site::new(SiteId::PRIMARY, "www.example.com", "/")]);
        assert_eq!(dir.main_site(), SiteId::PRIMARY);
    }

    #[tokio::test]
    async fn multiple_rows_mean_multisite_subdirectory() {
        let admin = FakeAdmin::multisite(
            &[(2, "example.com", "shop"), (1, "example.com", "/")],
            false,
        );
        let dir = list_sites(&admin, "example.com", &DirectorySettings::default())
            .await
            .unwrap();
        assert_eq!(dir.topology, Topology::MultisiteSubdirectory);
        assert_eq!(dir.sites[0].id.get(), 1);
        assert_eq!(dir.sites[1].path, "/shop/");
    }

    #[tokio::test]
    async fn subdomain_constant_selects_subdomain_topology() {
        let admin = FakeAdmin::multisite(
            &[(1, "example.com", "/"), (2, "shop.example.com", "/")],
            true,
        );
        let dir = list_sites(&admin, "example.com", &DirectorySettings::default())
            .await
            .unwrap();
        assert_eq!(dir.topology, Topology::MultisiteSubdomain);
    }

    #[tokio::test]
    async fn network_row_marks_single_row_install_as_multisite() {
        let mut admin = FakeAdmin::multisite(&[(1, "example.com", "/")], false);
        admin.is_multisite = false;
        let dir = list_sites(&admin, "example.com", &DirectorySettings::default())
            .await
            .unwrap();
        assert!(dir.topology.is_multisite());
    }

    #[tokio::test]
    async fn persisted_setting_is_consulted_before_interface() {
        let mut admin = FakeAdmin::multisite(&[(1, "example.com", "/")], false);
        admin.network_rows = 0;
        admin.is_multisite = false;
        let settings = DirectorySettings { multisite: true };
        let dir = list_sites(&admin, "example.com", &settings).await.unwrap();
        assert!(dir.topology.is_multisite());

        let dir = list_sites(&admin, "example.com", &DirectorySettings::default())
            .await
            .unwrap();
        assert_eq!(dir.topology, Topology::Single);
    }

    #[tokio::test]
    async fn multisite_without_rows_is_an_interface_error() {
        let mut admin = FakeAdmin::single();
        admin.is_multisite = true;
        let err = list_sites(&admin, "example.com", &DirectorySettings::default())
            .await
            .unwrap_err();
        match err {
            CoreError::ExternalInterface { operation, source } => {
                assert_eq!(operation, "site list");
                assert!(source.to_string().contains("not a multisite"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rows_are_sanitized_sorted_and_deduplicated() {
        let rows = vec![
            TenantRow { id: 3, domain: "https://c.example.com/".into(), path: "/".into() },
            TenantRow { id: 0, domain: "bogus".into(), path: "/".into() },
            TenantRow { id: 1, domain: "example.com".into(), path: String::new() },
            TenantRow { id: 3, domain: "dup.example.com".into(), path: "/".into() },
        ];
        let sites = normalize_rows(rows);
        let ids: Vec<u64> = sites.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(sites[0].path, "/");
        assert_eq!(sites[1].domain, "c.example.com");
    }
}
