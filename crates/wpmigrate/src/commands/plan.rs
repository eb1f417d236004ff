//! Plan command: everything `migrate` would do, printed instead of run.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;
use wpmigrate_core::{
    AddressAnomaly, DEFAULT_TABLE_PREFIX, MappingOutcome, MappingSet, RoutingUpdate, SiteAdmin,
    SiteId, SitePlan, Topology, WpCli, plan_routing,
};

use crate::cli::{GlobalOpts, PlanArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{self, Prepared};

/// Serializable view of a compiled run.
#[derive(Debug, Serialize)]
pub struct PlanView<'a> {
    pub topology: Topology,
    pub main_site: SiteId,
    pub sites: Vec<&'a SitePlan>,
    pub routing: Vec<String>,
    /// Why routing rows could not be derived; the run still proceeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_error: Option<String>,
    pub rejected: &'a [MappingOutcome],
    pub anomalies: &'a [AddressAnomaly],
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Search")]
    search: String,
    #[tabled(rename = "Replace")]
    replace: String,
}

/// Build the view, rendering routing statements with the install's prefix.
pub async fn view<'a, A: SiteAdmin>(admin: &A, prepared: &'a Prepared) -> PlanView<'a> {
    let topology = prepared.directory.topology;
    let (updates, routing_error) = routing_preview(&prepared.mappings, prepared.main_site, topology);
    let routing = if updates.is_empty() {
        Vec::new()
    } else {
        let prefix = admin
            .table_prefix()
            .await
            .unwrap_or_else(|_| DEFAULT_TABLE_PREFIX.to_owned());
        updates.iter().map(|u| u.to_sql(&prefix)).collect()
    };

    PlanView {
        topology,
        main_site: prepared.main_site,
        sites: prepared.plans.values().collect(),
        routing,
        routing_error,
        rejected: &prepared.mappings.rejected,
        anomalies: &prepared.mappings.anomalies,
    }
}

/// Routing rows for the preview. A mapping set the rows cannot be derived
/// from is reported, not fatal: the executor falls back to manual routing.
fn routing_preview(
    mappings: &MappingSet,
    main_site: SiteId,
    topology: Topology,
) -> (Vec<RoutingUpdate>, Option<String>) {
    match plan_routing(mappings.iter(), main_site, topology) {
        Ok(updates) => (updates, None),
        Err(e) => {
            warn!(error = %e, "routing rows unavailable for preview");
            (Vec::new(), Some(e.to_string()))
        }
    }
}

pub fn detail(view: &PlanView<'_>, painter: Painter) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}   {} {}",
        painter.dim("topology:"),
        painter.heading(&view.topology.to_string()),
        painter.dim("main site:"),
        view.main_site
    );

    let rows: Vec<StepRow> = view
        .sites
        .iter()
        .filter(|plan| !plan.mapping.is_identity())
        .flat_map(|plan| {
            plan.steps.iter().map(|step| StepRow {
                site: step.site_id.to_string(),
                variant: step.variant.to_string(),
                search: step.search.clone(),
                replace: step.replace.clone(),
            })
        })
        .collect();
    if rows.is_empty() {
        let _ = writeln!(out, "{}", painter.warn("Nothing to rewrite: every target equals its source."));
    } else {
        let _ = writeln!(out, "{}", output::render_table(&rows));
    }

    let unchanged: Vec<String> = view
        .sites
        .iter()
        .filter(|plan| plan.mapping.is_identity())
        .map(|plan| plan.mapping.site_id.to_string())
        .collect();
    if !unchanged.is_empty() {
        let _ = writeln!(out, "{} {}", painter.dim("unchanged:"), unchanged.join(", "));
    }

    if !view.routing.is_empty() {
        let _ = writeln!(out, "\n{}", painter.heading("Routing updates"));
        for statement in &view.routing {
            let _ = writeln!(out, "  {statement}");
        }
    }

    if let Some(ref error) = view.routing_error {
        let _ = writeln!(
            out,
            "{}",
            painter.warn(&format!("routing tables need a manual update: {error}"))
        );
    }

    for outcome in view.rejected {
        let line = match outcome {
            MappingOutcome::Skipped { site_id, reason } => format!("site {site_id} skipped: {reason}"),
            MappingOutcome::Invalid {
                site_id,
                input,
                reason,
            } => format!("site {site_id} rejected '{input}': {reason}"),
            MappingOutcome::Mapped(_) => continue,
        };
        let _ = writeln!(out, "{}", painter.warn(&line));
    }
    for anomaly in view.anomalies {
        let ids: Vec<String> = anomaly.site_ids.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{}",
            painter.warn(&format!(
                "{:?}: {} shared by sites {}",
                anomaly.kind,
                anomaly.address,
                ids.join(", ")
            ))
        );
    }
    out.trim_end().to_owned()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let admin = WpCli::new(session.wp.clone());
    let prepared = util::prepare(&admin, session, &args.source, &args.target, global).await?;
    let view = view(&admin, &prepared).await;

    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, painter),
        |v| {
            v.sites
                .iter()
                .flat_map(|plan| &plan.steps)
                .map(|step| format!("{}\t{}", step.search, step.replace))
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
