//! Site directory command.

use std::fmt::Write as _;

use tabled::Tabled;
use wpmigrate_core::{Site, SiteDirectory, SiteId, WpCli, list_sites};

use crate::cli::{GlobalOpts, SitesArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Main")]
    main: String,
}

impl SiteRow {
    fn new(site: &Site, main: SiteId) -> Self {
        Self {
            id: site.id.to_string(),
            domain: site.domain.clone(),
            path: site.path.clone(),
            main: if site.id == main { "*".into() } else { String::new() },
        }
    }
}

fn detail(directory: &SiteDirectory, painter: Painter) -> String {
    let main = directory.main_site();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}   {} {}",
        painter.dim("topology:"),
        painter.heading(&directory.topology.to_string()),
        painter.dim("main site:"),
        main
    );
    let rows: Vec<SiteRow> = directory.sites.iter().map(|s| SiteRow::new(s, main)).collect();
    out.push_str(&output::render_table(&rows));
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: SitesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let reference = session.source_domain(&args.source)?;
    let admin = WpCli::new(session.wp.clone());
    let directory = util::with_spinner(
        global,
        "Reading site directory",
        list_sites(&admin, &reference, &session.directory_settings(&args.source)),
    )
    .await?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &directory,
        |d| detail(d, painter),
        |d| {
            d.sites
                .iter()
                .map(Site::address)
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::ColorMode;
    use wpmigrate_core::Topology;

    #[test]
    fn detail_marks_main_site() {
        let directory = SiteDirectory {
            topology: Topology::MultisiteSubdirectory,
            sites: vec![
                Site::new(SiteId::PRIMARY, "example.com", "/"),
                Site::new(SiteId::new(2).unwrap(), "example.com", "/shop/"),
            ],
        };
        let out = detail(&directory, Painter::new(&ColorMode::Never));
        assert!(out.starts_with("topology: multisite-subdirectory   main site: 1"));
        assert!(out.contains("/shop/"));
        assert!(out.contains('*'));
    }
}
