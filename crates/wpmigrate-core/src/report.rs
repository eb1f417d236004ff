// ── Execution report ──
//
// Everything an operator needs to repair a run by hand: per-site domain
// pairs, the exact steps, which phase failed and the raw interface error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use uuid::Uuid;

use crate::model::{MappingOutcome, MappingSet, SiteId};
use crate::plan::{RewriteStep, SitePlan};
use crate::routing::{RoutingOutcome, RoutingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Routing table update, before any content is touched.
    Routing,
    /// Non-main tenants.
    Tenants,
    /// The main tenant, last.
    Main,
}

/// Result of applying one tenant's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteOutcome {
    pub site_id: SiteId,
    pub phase: Phase,
    pub source: String,
    pub target: String,
    pub selector: Option<String>,
    pub steps: Vec<RewriteStep>,
    /// Steps that completed before a failure (all of them on success).
    pub completed_steps: usize,
    pub replacements: u64,
    pub error: Option<String>,
}

impl SiteOutcome {
    pub(crate) fn start(plan: &SitePlan, phase: Phase, selector: Option<String>) -> Self {
        Self {
            site_id: plan.mapping.site_id,
            phase,
            source: plan.mapping.source_address(),
            target: plan.mapping.target_address(),
            selector,
            steps: plan.steps.clone(),
            completed_steps: 0,
            replacements: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub routing: Option<RoutingOutcome>,
    pub sites: Vec<SiteOutcome>,
    /// Identity mappings that needed no rewrite.
    pub unchanged: Vec<SiteId>,
    /// Tenants skipped or rejected while collecting targets.
    pub rejected: Vec<MappingOutcome>,
    /// Best-effort housekeeping problems; never failures.
    pub warnings: Vec<String>,
}

impl ExecutionReport {
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            routing: None,
            sites: Vec::new(),
            unchanged: Vec::new(),
            rejected: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Carry over the tenants `mappings` left out, so the report names
    /// every site of the run.
    pub fn record_rejected(&mut self, mappings: &MappingSet) {
        self.rejected.extend(mappings.rejected.iter().cloned());
    }

    pub fn failed_sites(&self) -> Vec<SiteId> {
        self.sites
            .iter()
            .filter(|s| !s.succeeded())
            .map(|s| s.site_id)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.sites.iter().all(SiteOutcome::succeeded)
    }

    /// Routing needs manual attention (dry runs never do).
    pub fn routing_needs_manual_update(&self) -> bool {
        self.routing
            .as_ref()
            .is_some_and(|r| r.status == RoutingStatus::ManualRequired)
    }

    pub fn steps(&self) -> impl Iterator<Item = &RewriteStep> {
        self.sites.iter().flat_map(|s| s.steps.iter())
    }

    pub fn total_replacements(&self) -> u64 {
        self.sites.iter().map(|s| s.replacements).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejected_tenants_are_carried_into_the_report() {
        let mut mappings = MappingSet::new();
        mappings.record(MappingOutcome::Skipped {
            site_id: SiteId::new(4).unwrap(),
            reason: "empty target".into(),
        });
        let mut report = ExecutionReport::new(Uuid::nil(), false);
        report.record_rejected(&mappings);

        assert_eq!(report.rejected.len(), 1);
        assert!(report.is_success());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rejected"][0]["status"], "skipped");
        assert_eq!(json["rejected"][0]["site_id"], 4);
    }
}
