//! Shared helpers for command handlers.

use std::collections::BTreeMap;
use std::future::Future;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use wpmigrate_core::{
    MappingRequest, MappingSet, SiteAdmin, SiteDirectory, SiteId, SitePlan, Topology,
    build_mappings, compile_all, list_sites,
};

use crate::cli::{GlobalOpts, SourceArgs, TargetArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::prompt::PromptTargets;

/// Whether the operator can answer prompts.
pub fn is_interactive(global: &GlobalOpts) -> bool {
    !global.yes && io::stdin().is_terminal()
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.to_owned(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()?;
    Ok(confirmed)
}

/// Await `fut` behind a stderr spinner (suppressed when quiet or piped).
pub async fn with_spinner<F: Future>(global: &GlobalOpts, message: &str, fut: F) -> F::Output {
    let spinner = (!global.quiet && io::stderr().is_terminal()).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_owned());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });
    let output = fut.await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    output
}

// ── Pipeline up to compiled plans ───────────────────────────────────

/// Directory, mappings and compiled plans for one run.
#[derive(Debug)]
pub struct Prepared {
    pub directory: SiteDirectory,
    pub mappings: MappingSet,
    pub plans: BTreeMap<SiteId, SitePlan>,
    pub main_site: SiteId,
}

/// Check `--site ID=DOMAIN` overrides against the directory. Only subdomain
/// networks take per-site targets; anywhere else an override would be
/// silently ignored, so it is refused.
fn site_overrides(
    directory: &SiteDirectory,
    raw: &[(u64, String)],
) -> Result<Vec<(SiteId, String)>, CliError> {
    if !raw.is_empty() && directory.topology != Topology::MultisiteSubdomain {
        return Err(CliError::Validation {
            field: "--site".into(),
            reason: format!(
                "per-site targets need a subdomain network, this install is {}; use --to instead",
                directory.topology
            ),
        });
    }
    raw.iter()
        .map(|(raw_id, domain)| {
            let id = SiteId::new(*raw_id).ok_or_else(|| CliError::Validation {
                field: "--site".into(),
                reason: format!("site id must be a positive integer, got '{raw_id}'"),
            })?;
            if directory.get(id).is_none() {
                return Err(CliError::Validation {
                    field: "--site".into(),
                    reason: format!("site {id} does not exist in this install"),
                });
            }
            Ok((id, domain.clone()))
        })
        .collect()
}

/// Read the install, collect targets and compile every plan. Never writes.
pub async fn prepare<A: SiteAdmin>(
    admin: &A,
    session: &Session,
    source: &SourceArgs,
    target: &TargetArgs,
    global: &GlobalOpts,
) -> Result<Prepared, CliError> {
    let source_domain = session.source_domain(source)?;
    let default_target = session.target_domain(target)?;
    let settings = session.directory_settings(source);

    let directory = with_spinner(
        global,
        "Reading site directory",
        list_sites(admin, &source_domain, &settings),
    )
    .await?;
    let main_site = directory.main_site();
    debug!(topology = %directory.topology, sites = directory.sites.len(), %main_site, "directory read");

    let overrides = site_overrides(&directory, &target.sites)?;

    let mut provider = PromptTargets::new(is_interactive(global))
        .with_overrides(overrides)
        .with_persisted(session.profile.site_targets()?);
    let request = MappingRequest {
        source_domain,
        default_target,
    };
    let mappings = build_mappings(&directory, &request, &mut provider)?;
    if mappings.is_empty() {
        return Err(CliError::Validation {
            field: "targets".into(),
            reason: "no site has a usable target domain".into(),
        });
    }

    let plans = compile_all(&mappings, main_site).map_err(wpmigrate_core::CoreError::from)?;
    Ok(Prepared {
        directory,
        mappings,
        plans,
        main_site,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wpmigrate_core::Site;

    fn directory(topology: Topology) -> SiteDirectory {
        let id = |raw| SiteId::new(raw).unwrap();
        SiteDirectory {
            topology,
            sites: vec![
                Site::new(id(1), "example.com", "/"),
                Site::new(id(2), "shop.example.com", "/"),
            ],
        }
    }

    #[test]
    fn site_overrides_apply_to_subdomain_networks() {
        let raw = vec![(2, "shop.example.test".to_owned())];
        let overrides = site_overrides(&directory(Topology::MultisiteSubdomain), &raw).unwrap();
        assert_eq!(overrides, vec![(SiteId::new(2).unwrap(), "shop.example.test".to_owned())]);

        let missing = vec![(9, "nine.example.test".to_owned())];
        let err = site_overrides(&directory(Topology::MultisiteSubdomain), &missing).unwrap_err();
        assert!(err.to_string().contains("--site"));
    }

    #[test]
    fn site_overrides_are_refused_where_they_would_be_ignored() {
        let raw = vec![(2, "shop.example.test".to_owned())];
        for topology in [Topology::MultisiteSubdirectory, Topology::Single] {
            let err = site_overrides(&directory(topology), &raw).unwrap_err();
            match err {
                CliError::Validation { field, reason } => {
                    assert_eq!(field, "--site");
                    assert!(reason.contains("subdomain network"), "{reason}");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(site_overrides(&directory(Topology::Single), &[]).unwrap().is_empty());
    }
}
