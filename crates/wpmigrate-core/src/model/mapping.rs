// ── Domain mappings ──
//
// One mapping per tenant, keyed by site id. Rejected candidates are kept
// as tagged outcomes so callers can report them without sentinel strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::site::{Site, SiteId, join_address, normalize_path};

// ── DomainMapping ───────────────────────────────────────────────────

/// Source → target `(domain, path)` for a single tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMapping {
    pub site_id: SiteId,
    pub source_domain: String,
    pub source_path: String,
    pub target_domain: String,
    pub target_path: String,
}

impl DomainMapping {
    /// Map `site` to a new domain and path, keeping the site's source values.
    pub fn for_site(site: &Site, target_domain: impl Into<String>, target_path: &str) -> Self {
        Self {
            site_id: site.id,
            source_domain: site.domain.clone(),
            source_path: site.path.clone(),
            target_domain: target_domain.into(),
            target_path: normalize_path(target_path),
        }
    }

    /// True when applying this mapping would change nothing.
    pub fn is_identity(&self) -> bool {
        self.source_domain == self.target_domain
            && normalize_path(&self.source_path) == normalize_path(&self.target_path)
    }

    pub fn source_address(&self) -> String {
        join_address(&self.source_domain, &self.source_path)
    }

    pub fn target_address(&self) -> String {
        join_address(&self.target_domain, &self.target_path)
    }

    /// Operator-facing label, e.g. `site 2 (example.com/shop/ -> example.test/shop/)`.
    pub fn display_name(&self) -> String {
        format!(
            "site {} ({} -> {})",
            self.site_id,
            self.source_address(),
            self.target_address()
        )
    }
}

// ── MappingOutcome ──────────────────────────────────────────────────

/// Result of turning one candidate target into a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MappingOutcome {
    Mapped(DomainMapping),
    /// The candidate sanitized to nothing; the tenant is left untouched.
    Skipped { site_id: SiteId, reason: String },
    /// The candidate was malformed and rejected at the boundary.
    Invalid {
        site_id: SiteId,
        input: String,
        reason: String,
    },
}

impl MappingOutcome {
    pub fn site_id(&self) -> SiteId {
        match self {
            Self::Mapped(mapping) => mapping.site_id,
            Self::Skipped { site_id, .. } | Self::Invalid { site_id, .. } => *site_id,
        }
    }
}

// ── Anomalies ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Two tenants are read from the same `(domain, path)` pair.
    DuplicateSource,
    /// Two tenants would be written to the same `(domain, path)` pair.
    DuplicateTarget,
}

/// A `(domain, path)` pair shared by more than one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressAnomaly {
    pub kind: AnomalyKind,
    pub address: String,
    pub site_ids: Vec<SiteId>,
}

// ── MappingSet ──────────────────────────────────────────────────────

/// Confirmed mappings ordered by tenant id, plus everything that was left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingSet {
    pub mappings: BTreeMap<SiteId, DomainMapping>,
    pub rejected: Vec<MappingOutcome>,
    pub anomalies: Vec<AddressAnomaly>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: MappingOutcome) {
        match outcome {
            MappingOutcome::Mapped(mapping) => {
                self.mappings.insert(mapping.site_id, mapping);
            }
            rejected => self.rejected.push(rejected),
        }
    }

    pub fn get(&self, id: SiteId) -> Option<&DomainMapping> {
        self.mappings.get(&id)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainMapping> {
        self.mappings.values()
    }

    /// Mappings that would actually change something.
    pub fn changes(&self) -> impl Iterator<Item = &DomainMapping> {
        self.iter().filter(|m| !m.is_identity())
    }

    /// Record duplicate source addresses among `sites` and duplicate target
    /// addresses among the accepted mappings.
    pub(crate) fn detect_anomalies(&mut self, sites: &[Site]) {
        let mut found = find_duplicates(
            AnomalyKind::DuplicateSource,
            sites.iter().map(|s| (s.id, s.address())),
        );
        found.extend(find_duplicates(
            AnomalyKind::DuplicateTarget,
            self.mappings.values().map(|m| (m.site_id, m.target_address())),
        ));
        self.anomalies = found;
    }
}

fn find_duplicates(
    kind: AnomalyKind,
    entries: impl Iterator<Item = (SiteId, String)>,
) -> Vec<AddressAnomaly> {
    let mut by_address: BTreeMap<String, Vec<SiteId>> = BTreeMap::new();
    for (id, address) in entries {
        by_address
            .entry(address.to_ascii_lowercase())
            .or_default()
            .push(id);
    }
    by_address
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(address, site_ids)| AddressAnomaly {
            kind,
            address,
            site_ids,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn site(id: u64, domain: &str, path: &str) -> Site {
        Site::new(SiteId::new(id).unwrap(), domain, path)
    }

    #[test]
    fn identity_ignores_path_formatting() {
        let mut mapping = DomainMapping::for_site(&site(2, "example.com", "/shop/"), "example.com", "shop");
        assert!(mapping.is_identity());
        mapping.target_domain = "example.test".into();
        assert!(!mapping.is_identity());
    }

    #[test]
    fn display_name_shows_both_addresses() {
        let mapping = DomainMapping::for_site(&site(2, "example.com", "/shop/"), "example.test", "/shop/");
        assert_eq!(
            mapping.display_name(),
            "site 2 (example.com/shop/ -> example.test/shop/)"
        );
    }

    #[test]
    fn record_splits_mapped_from_rejected() {
        let mut set = MappingSet::new();
        set.record(MappingOutcome::Mapped(DomainMapping::for_site(
            &site(1, "example.com", "/"),
            "example.test",
            "/",
        )));
        set.record(MappingOutcome::Skipped {
            site_id: SiteId::new(2).unwrap(),
            reason: "empty".into(),
        });
        assert_eq!(set.len(), 1);
        assert_eq!(set.rejected.len(), 1);
        assert_eq!(set.rejected[0].site_id().get(), 2);
    }

    #[test]
    fn duplicate_targets_are_flagged() {
        let sites = vec![site(1, "a.example.com", "/"), site(2, "b.example.com", "/")];
        let mut set = MappingSet::new();
        for s in &sites {
            set.record(MappingOutcome::Mapped(DomainMapping::for_site(s, "same.test", "/")));
        }
        set.detect_anomalies(&sites);
        assert_eq!(set.anomalies.len(), 1);
        assert_eq!(set.anomalies[0].kind, AnomalyKind::DuplicateTarget);
        assert_eq!(set.anomalies[0].address, "same.test");
        assert_eq!(set.anomalies[0].site_ids.len(), 2);
    }

    #[test]
    fn shared_domain_with_distinct_paths_is_not_an_anomaly() {
        let sites = vec![site(1, "example.com", "/"), site(2, "example.com", "/shop/")];
        let mut set = MappingSet::new();
        set.detect_anomalies(&sites);
        assert!(set.anomalies.is_empty());
    }
}
