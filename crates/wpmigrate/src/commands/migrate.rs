//! Migrate command: the full pipeline, with confirmation.

use std::fmt::Write as _;

use tabled::Tabled;
use tracing::info;
use wpmigrate_core::{
    ExecuteOptions, ExecutionReport, MappingOutcome, RoutingStatus, RunContext, SiteOutcome, WpCli,
    execute,
};

use crate::cli::{GlobalOpts, MigrateArgs};
use crate::config::{self, Session};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::plan;
use super::util::{self, Prepared};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Steps")]
    steps: String,
    #[tabled(rename = "Matches")]
    replacements: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl OutcomeRow {
    fn new(outcome: &SiteOutcome, dry_run: bool, painter: Painter) -> Self {
        let status = match (&outcome.error, dry_run) {
            (Some(e), _) => painter.error(&format!("failed: {e}")),
            (None, true) => painter.dim("dry run"),
            (None, false) => painter.ok("done"),
        };
        Self {
            site: outcome.site_id.to_string(),
            phase: outcome.phase.to_string(),
            source: outcome.source.clone(),
            target: outcome.target.clone(),
            steps: format!("{}/{}", outcome.completed_steps, outcome.steps.len()),
            replacements: outcome.replacements.to_string(),
            status,
        }
    }
}

fn detail(report: &ExecutionReport, painter: Painter) -> String {
    let mut out = String::new();
    if let Some(ref routing) = report.routing {
        let status = match routing.status {
            RoutingStatus::Applied => painter.ok("routing tables updated"),
            RoutingStatus::DryRun => painter.dim("routing tables not written (dry run)"),
            RoutingStatus::ManualRequired => painter.error("routing tables need a manual update"),
        };
        let _ = writeln!(out, "{status}");
        if routing.status != RoutingStatus::Applied {
            if let Some(ref error) = routing.error {
                let _ = writeln!(out, "  {}", painter.dim(error));
            }
            for statement in &routing.statements {
                let _ = writeln!(out, "  {statement}");
            }
        }
    }

    let rows: Vec<OutcomeRow> = report
        .sites
        .iter()
        .map(|o| OutcomeRow::new(o, report.dry_run, painter))
        .collect();
    if !rows.is_empty() {
        let _ = writeln!(out, "{}", output::render_table(&rows));
    }
    if !report.unchanged.is_empty() {
        let ids: Vec<String> = report.unchanged.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "{} {}", painter.dim("unchanged:"), ids.join(", "));
    }
    for outcome in &report.rejected {
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
    for warning in &report.warnings {
        let _ = writeln!(out, "{}", painter.warn(warning));
    }
    let _ = write!(
        out,
        "{} {}",
        painter.dim("total matches:"),
        report.total_replacements()
    );
    out
}

/// One `site<TAB>status` line per tenant the run knows about.
fn plain(report: &ExecutionReport) -> String {
    let ran = report.sites.iter().map(|s| {
        let status = if s.succeeded() { "ok" } else { "failed" };
        format!("{}\t{status}", s.site_id)
    });
    let unchanged = report.unchanged.iter().map(|id| format!("{id}\tunchanged"));
    let rejected = report.rejected.iter().map(|outcome| {
        let status = match outcome {
            MappingOutcome::Skipped { .. } => "skipped",
            MappingOutcome::Invalid { .. } => "invalid",
            MappingOutcome::Mapped(_) => "mapped",
        };
        format!("{}\t{status}", outcome.site_id())
    });
    ran.chain(unchanged).chain(rejected).collect::<Vec<_>>().join("\n")
}

/// Persist the confirmed targets (and how to reach the install) to the
/// active profile.
fn save_profile(session: &Session, prepared: &Prepared, source: &str) -> Result<(), CliError> {
    let mut cfg = session.config.clone();
    let profile = cfg.profiles.entry(session.profile_name.clone()).or_default();
    profile.remember_targets(
        &prepared.mappings,
        prepared.main_site,
        prepared.directory.topology,
    );
    if profile.source_domain.is_none() {
        profile.source_domain = Some(source.to_owned());
    }
    if profile.wp_path.is_none() {
        profile.wp_path.clone_from(&session.wp.wp_path);
    }
    let path = config::save_config(&cfg)?;
    eprintln!(
        "✓ Targets saved to profile '{}' ({})",
        session.profile_name,
        path.display()
    );
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: MigrateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = RunContext::new(args.dry_run)?;
    let admin = WpCli::new(session.wp.clone()).with_transcript(ctx.transcript_path());
    let painter = Painter::new(&global.color);

    let prepared = util::prepare(&admin, session, &args.source, &args.target, global).await?;
    let changes = prepared.mappings.changes().count();

    if !global.quiet {
        let view = plan::view(&admin, &prepared).await;
        eprintln!("{}", plan::detail(&view, painter));
    }
    if changes == 0 {
        eprintln!("Nothing to rewrite.");
        return Ok(());
    }
    if !args.dry_run
        && !util::confirm(
            &format!(
                "Rewrite {changes} site(s) in place? Take a database backup first."
            ),
            global,
        )?
    {
        eprintln!("Aborted.");
        return Ok(());
    }

    let options = ExecuteOptions {
        all_tables: !args.core_tables_only,
        skip_columns: session.skip_columns(&args.skip_columns),
    };
    info!(run_id = %ctx.run_id(), changes, "starting migration");
    let mut report = util::with_spinner(
        global,
        if args.dry_run { "Counting matches" } else { "Rewriting" },
        execute(
            &admin,
            &ctx,
            &prepared.plans,
            prepared.main_site,
            prepared.directory.topology,
            &options,
        ),
    )
    .await;
    report.record_rejected(&prepared.mappings);

    if let Some(ref destination) = args.keep_transcript {
        if ctx.keep_transcript(destination)? {
            eprintln!("✓ WP-CLI transcript written to {}", destination.display());
        }
    }

    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, painter),
        plain,
    );
    output::print_output(&out, global.quiet);

    if args.save && !args.dry_run {
        let source = session.source_domain(&args.source)?;
        save_profile(session, &prepared, &source)?;
    }

    let failed = report.failed_sites();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            count: failed.len(),
            sites: failed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::ColorMode;
    use wpmigrate_core::{Phase, SiteId};

    fn outcome(error: Option<&str>) -> SiteOutcome {
        SiteOutcome {
            site_id: SiteId::new(3).unwrap(),
            phase: Phase::Tenants,
            source: "blog.example.com".into(),
            target: "blog.example.test".into(),
            selector: Some("blog.example.test".into()),
            steps: Vec::new(),
            completed_steps: 0,
            replacements: 0,
            error: error.map(str::to_owned),
        }
    }

    #[test]
    fn outcome_row_shows_raw_error() {
        let row = OutcomeRow::new(
            &outcome(Some("Error: Site 'blog.example.test' not found.")),
            false,
            Painter::new(&ColorMode::Never),
        );
        assert_eq!(row.status, "failed: Error: Site 'blog.example.test' not found.");
        assert_eq!(row.phase, "tenants");
        assert_eq!(row.steps, "0/0");
    }

    #[test]
    fn plain_output_names_skipped_and_invalid_sites() {
        let ctx = RunContext::new(false).unwrap();
        let mut report = ExecutionReport::new(ctx.run_id(), false);
        report.sites.push(outcome(None));
        report.unchanged.push(SiteId::new(2).unwrap());

        let mut mappings = wpmigrate_core::MappingSet::new();
        mappings.record(MappingOutcome::Skipped {
            site_id: SiteId::new(5).unwrap(),
            reason: "empty target".into(),
        });
        mappings.record(MappingOutcome::Invalid {
            site_id: SiteId::new(6).unwrap(),
            input: "bad host".into(),
            reason: "contains whitespace".into(),
        });
        report.record_rejected(&mappings);

        assert_eq!(plain(&report), "3\tok\n2\tunchanged\n5\tskipped\n6\tinvalid");
        let text = detail(&report, Painter::new(&ColorMode::Never));
        assert!(text.contains("site 5 skipped: empty target"));
        assert!(text.contains("site 6 rejected 'bad host': contains whitespace"));
    }

    #[test]
    fn outcome_row_marks_dry_runs() {
        let row = OutcomeRow::new(&outcome(None), true, Painter::new(&ColorMode::Never));
        assert_eq!(row.status, "dry run");
    }
}
