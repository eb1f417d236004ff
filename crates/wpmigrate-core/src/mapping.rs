//! Mapping builder: turns the site directory plus operator input into one
//! source → target mapping per tenant.
//!
//! Where the answers come from is abstracted behind [`TargetProvider`]:
//! the CLI prompts, persisted profiles supply a fixed table, and tests use
//! [`FixedTargets`] directly.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::directory::SiteDirectory;
use crate::error::CoreError;
use crate::model::{DomainMapping, MappingOutcome, MappingSet, Site, SiteId, Topology};
use crate::sanitize::{sanitize, validate_domain};

/// Caller-provided defaults for a run.
#[derive(Debug, Clone)]
pub struct MappingRequest {
    /// Domain the install currently answers on (single-site source).
    pub source_domain: String,
    /// Target for the main site, and for the whole network when paths route.
    pub default_target: String,
}

/// Source of target domains.
pub trait TargetProvider {
    /// Network-wide target for subdirectory installs, collected once.
    fn network_target(&mut self, suggestion: &str) -> Result<String, CoreError>;

    /// Target for a single tenant of a subdomain install.
    fn site_target(&mut self, site: &Site, is_main: bool, suggestion: &str)
    -> Result<String, CoreError>;

    /// A target recorded in an earlier run, if any.
    fn persisted_target(&self, _site: SiteId) -> Option<String> {
        None
    }
}

/// Non-interactive provider: answers from a fixed table and otherwise
/// accepts the suggestion.
#[derive(Debug, Clone, Default)]
pub struct FixedTargets {
    pub network: Option<String>,
    pub sites: BTreeMap<SiteId, String>,
}

impl FixedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, target: impl Into<String>) -> Self {
        self.network = Some(target.into());
        self
    }

    pub fn with_site(mut self, id: SiteId, target: impl Into<String>) -> Self {
        self.sites.insert(id, target.into());
        self
    }
}

impl TargetProvider for FixedTargets {
    fn network_target(&mut self, suggestion: &str) -> Result<String, CoreError> {
        Ok(self.network.clone().unwrap_or_else(|| suggestion.to_owned()))
    }

    fn site_target(
        &mut self,
        site: &Site,
        _is_main: bool,
        suggestion: &str,
    ) -> Result<String, CoreError> {
        Ok(self
            .sites
            .get(&site.id)
            .cloned()
            .unwrap_or_else(|| suggestion.to_owned()))
    }

    fn persisted_target(&self, site: SiteId) -> Option<String> {
        self.sites.get(&site).cloned()
    }
}

/// Build one mapping per tenant in `directory`.
///
/// Candidates that sanitize to nothing are skipped and malformed ones are
/// rejected; both are logged and recorded in the returned set, never fatal.
pub fn build_mappings<P: TargetProvider + ?Sized>(
    directory: &SiteDirectory,
    request: &MappingRequest,
    provider: &mut P,
) -> Result<MappingSet, CoreError> {
    let main = directory.main_site();
    let mut set = MappingSet::new();

    match directory.topology {
        Topology::Single => {
            let source = sanitize(&request.source_domain);
            if source.is_empty() {
                return Err(CoreError::configuration("source domain is required"));
            }
            let site = Site::new(main, source, "/");
            set.record(accept(&site, &request.default_target, |target| {
                DomainMapping::for_site(&site, target, "/")
            }));
        }
        Topology::MultisiteSubdirectory => {
            let target = provider.network_target(&request.default_target)?;
            debug!(target = %target, "network-wide target");
            for site in &directory.sites {
                set.record(accept(site, &target, |target| {
                    DomainMapping::for_site(site, target, &site.path)
                }));
            }
        }
        Topology::MultisiteSubdomain => {
            for site in &directory.sites {
                let is_main = site.id == main;
                let suggestion = if is_main {
                    request.default_target.clone()
                } else {
                    provider
                        .persisted_target(site.id)
                        .unwrap_or_else(|| site.domain.clone())
                };
                let answer = provider.site_target(site, is_main, &suggestion)?;
                set.record(accept(site, &answer, |target| {
                    DomainMapping::for_site(site, target, "/")
                }));
            }
        }
    }

    for outcome in &set.rejected {
        match outcome {
            MappingOutcome::Skipped { site_id, reason } => {
                warn!(%site_id, %reason, "site skipped");
            }
            MappingOutcome::Invalid {
                site_id,
                input,
                reason,
            } => warn!(%site_id, %input, %reason, "site target rejected"),
            MappingOutcome::Mapped(_) => {}
        }
    }

    set.detect_anomalies(&directory.sites);
    for anomaly in &set.anomalies {
        warn!(
            kind = ?anomaly.kind,
            address = %anomaly.address,
            sites = ?anomaly.site_ids,
            "address shared by several sites"
        );
    }

    Ok(set)
}

fn accept(site: &Site, raw: &str, map: impl FnOnce(String) -> DomainMapping) -> MappingOutcome {
    if sanitize(raw).is_empty() {
        return MappingOutcome::Skipped {
            site_id: site.id,
            reason: "empty target domain".into(),
        };
    }
    match validate_domain(raw) {
        Ok(target) => MappingOutcome::Mapped(map(target)),
        Err(e) => MappingOutcome::Invalid {
            site_id: site.id,
            input: raw.to_owned(),
            reason: e.reason,
        },
    }
}
