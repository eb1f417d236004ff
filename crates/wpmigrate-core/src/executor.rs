//! Rewrite executor.
//!
//! Order matters: routing rows first (so every later call can address its
//! tenant), then every non-main tenant, then the main tenant last so the
//! reference address stays valid for as long as possible. Tenants are
//! independent failure domains; nothing is rolled back across tenants.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::admin::{AdminError, RewriteRequest, SiteAdmin};
use crate::context::RunContext;
use crate::model::{SiteId, Topology};
use crate::plan::SitePlan;
use crate::report::{ExecutionReport, Phase, SiteOutcome};
use crate::routing::{self, RoutingTable};

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Also rewrite tables outside the WordPress core schema.
    pub all_tables: bool,
    /// Columns never rewritten (`guid` by convention).
    pub skip_columns: Vec<String>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            all_tables: true,
            skip_columns: vec!["guid".into()],
        }
    }
}

/// Apply compiled plans through `admin`, sequentially.
///
/// Per-tenant failures are recorded in the report and do not stop the run.
/// In a dry run every step goes through the non-mutating form and neither
/// routing rows nor caches are touched.
pub async fn execute<A: SiteAdmin>(
    admin: &A,
    ctx: &RunContext,
    plans: &BTreeMap<SiteId, SitePlan>,
    main_site: SiteId,
    topology: Topology,
    options: &ExecuteOptions,
) -> ExecutionReport {
    let dry_run = ctx.is_dry_run();
    let mut report = ExecutionReport::new(ctx.run_id(), dry_run);
    info!(run_id = %ctx.run_id(), sites = plans.len(), %topology, dry_run, "starting rewrite");

    let routing_updated = if topology.is_multisite() {
        debug!(phase = %Phase::Routing, "updating routing tables");
        let outcome = routing::update_routing(
            admin,
            plans.values().map(|p| &p.mapping),
            main_site,
            topology,
            dry_run,
        )
        .await;
        let applied = outcome.applied();
        report.routing = Some(outcome);
        applied
    } else {
        false
    };

    let selector_for = |plan: &SitePlan| {
        topology
            .is_multisite()
            .then(|| plan.selector(routing_updated))
    };

    for (id, plan) in plans {
        if *id == main_site {
            continue;
        }
        if plan.mapping.is_identity() {
            debug!(site_id = %id, "mapping unchanged, skipping");
            report.unchanged.push(*id);
            continue;
        }
        let outcome = apply_plan(
            admin,
            plan,
            Phase::Tenants,
            selector_for(plan),
            topology,
            options,
            dry_run,
        )
        .await;
        report.sites.push(outcome);
    }

    if let Some(plan) = plans.get(&main_site) {
        if plan.mapping.is_identity() {
            report.unchanged.push(main_site);
        } else {
            let outcome = apply_plan(
                admin,
                plan,
                Phase::Main,
                selector_for(plan),
                topology,
                options,
                dry_run,
            )
            .await;
            report.sites.push(outcome);
        }
    }

    if !dry_run {
        let selector = plans.get(&main_site).and_then(selector_for);
        housekeeping(admin, selector.as_deref(), &mut report).await;
    }

    report.finished_at = Some(chrono::Utc::now());
    let failed = report.failed_sites();
    if failed.is_empty() {
        info!(replacements = report.total_replacements(), "rewrite finished");
    } else {
        warn!(failed = ?failed.iter().map(|id| id.get()).collect::<Vec<_>>(), "rewrite finished with failures");
    }
    report
}

async fn apply_plan<A: SiteAdmin>(
    admin: &A,
    plan: &SitePlan,
    phase: Phase,
    selector: Option<String>,
    topology: Topology,
    options: &ExecuteOptions,
    dry_run: bool,
) -> SiteOutcome {
    let mut outcome = SiteOutcome::start(plan, phase, selector);
    info!(site = %plan.mapping.display_name(), %phase, steps = plan.steps.len(), "rewriting site");

    let tables = if plan.is_main && topology.is_multisite() {
        match main_site_tables(admin, outcome.selector.as_deref(), options.all_tables).await {
            Ok(tables) => tables,
            Err(e) => {
                warn!(site_id = %plan.mapping.site_id, %phase, error = %e, "could not list main site tables");
                outcome.error = Some(e.to_string());
                return outcome;
            }
        }
    } else {
        Vec::new()
    };

    for step in &plan.steps {
        let request = RewriteRequest {
            search: &step.search,
            replace: &step.replace,
            selector: outcome.selector.as_deref(),
            tables: &tables,
            all_tables: options.all_tables,
            dry_run,
            skip_columns: &options.skip_columns,
        };
        match admin.rewrite(&request).await {
            Ok(count) => {
                debug!(
                    site_id = %step.site_id,
                    variant = %step.variant,
                    search = %step.search,
                    replace = %step.replace,
                    count,
                    "step applied"
                );
                outcome.completed_steps += 1;
                outcome.replacements += count;
            }
            Err(e) => {
                warn!(
                    site_id = %step.site_id,
                    %phase,
                    search = %step.search,
                    replace = %step.replace,
                    error = %e,
                    "rewrite failed, continuing with remaining sites"
                );
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }
    outcome
}

/// The tables a multisite main-site pass may touch.
///
/// The main tenant's prefix is a prefix of every other tenant's, so its
/// table scope is listed and narrowed explicitly: other tenants'
/// `{prefix}{id}_` tables and the routing tables are left alone.
async fn main_site_tables<A: SiteAdmin>(
    admin: &A,
    selector: Option<&str>,
    all_tables: bool,
) -> Result<Vec<String>, AdminError> {
    let prefix = admin.table_prefix().await?;
    let listed = admin.list_tables(selector, all_tables).await?;
    let tables = own_tables(listed, &prefix);
    if tables.is_empty() {
        return Err(AdminError::Parse {
            command: "wp db tables".into(),
            reason: format!("no tables left for the main site under prefix '{prefix}'"),
        });
    }
    debug!(count = tables.len(), "main site tables");
    Ok(tables)
}

fn own_tables(listed: Vec<String>, prefix: &str) -> Vec<String> {
    let routing = [
        RoutingTable::Blogs.table_name(prefix),
        RoutingTable::Network.table_name(prefix),
    ];
    listed
        .into_iter()
        .filter(|table| !routing.contains(table))
        .filter(|table| {
            let Some(rest) = table.strip_prefix(prefix) else {
                return true;
            };
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            !(digits > 0 && rest.as_bytes().get(digits) == Some(&b'_'))
        })
        .collect()
}

async fn housekeeping<A: SiteAdmin>(admin: &A, selector: Option<&str>, report: &mut ExecutionReport) {
    note(report, "cache flush", admin.flush_cache(selector).await);
    note(report, "rewrite rule flush", admin.flush_rewrite_rules(selector).await);
    note(report, "transient cleanup", admin.delete_all_transients(selector).await);
}

fn note(report: &mut ExecutionReport, what: &str, result: Result<(), AdminError>) {
    if let Err(e) = result {
        warn!(error = %e, "{what} failed");
        report.warnings.push(format!("{what} failed: {e}"));
    }
}
