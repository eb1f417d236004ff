//! Rewrite plan compiler.
//!
//! A mapping becomes a fixed sequence of literal search/replace passes:
//! plain text first, then the slash-escaped form that JSON-encoded and
//! serialized values use. A `www.` source adds a second variant of each.
//! The target side is never varied.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::model::site::is_root_path;
use crate::model::{DomainMapping, MappingSet, SiteId};

const WWW: &str = "www.";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum PlanError {
    #[error("site {site_id}: {side} domain is empty")]
    EmptyDomain { site_id: SiteId, side: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StepVariant {
    PlainNonWww,
    PlainWww,
    SerializedNonWww,
    SerializedWww,
}

/// One literal substitution, scoped to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteStep {
    pub site_id: SiteId,
    pub variant: StepVariant,
    pub search: String,
    pub replace: String,
    pub serialized: bool,
}

/// A tenant's mapping together with its compiled steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitePlan {
    pub mapping: DomainMapping,
    pub is_main: bool,
    pub steps: Vec<RewriteStep>,
}

impl SitePlan {
    /// The `--url` value that routes to this tenant, given whether the
    /// routing tables already carry the target address.
    pub fn selector(&self, routing_updated: bool) -> String {
        if routing_updated {
            self.mapping.target_address()
        } else {
            self.mapping.source_address()
        }
    }
}

/// Compile one mapping into its ordered rewrite steps.
pub fn compile_plan(mapping: &DomainMapping, main_site: SiteId) -> Result<Vec<RewriteStep>, PlanError> {
    if mapping.source_domain.is_empty() {
        return Err(PlanError::EmptyDomain {
            site_id: mapping.site_id,
            side: "source",
        });
    }
    if mapping.target_domain.is_empty() {
        return Err(PlanError::EmptyDomain {
            site_id: mapping.site_id,
            side: "target",
        });
    }

    let (source, target) = endpoints(mapping, main_site);
    let (bare, www) = match source.strip_prefix(WWW) {
        Some(bare) => (bare.to_owned(), Some(source.clone())),
        None => (source, None),
    };

    let step = |variant, search: &str, serialized: bool| RewriteStep {
        site_id: mapping.site_id,
        variant,
        search: if serialized { escape_slashes(search) } else { search.to_owned() },
        replace: if serialized { escape_slashes(&target) } else { target.clone() },
        serialized,
    };

    let mut steps = vec![step(StepVariant::PlainNonWww, &bare, false)];
    if let Some(ref www) = www {
        steps.push(step(StepVariant::PlainWww, www, false));
    }
    steps.push(step(StepVariant::SerializedNonWww, &bare, true));
    if let Some(ref www) = www {
        steps.push(step(StepVariant::SerializedWww, www, true));
    }
    Ok(steps)
}

/// Compile every mapping in `set`, keyed by site id.
pub fn compile_all(set: &MappingSet, main_site: SiteId) -> Result<BTreeMap<SiteId, SitePlan>, PlanError> {
    set.iter()
        .map(|mapping| {
            let steps = compile_plan(mapping, main_site)?;
            Ok((
                mapping.site_id,
                SitePlan {
                    mapping: mapping.clone(),
                    is_main: mapping.site_id == main_site,
                    steps,
                },
            ))
        })
        .collect()
}

/// Search and replace strings before www/escape variants.
///
/// The main site and root-path tenants rewrite the bare domain. Others
/// rewrite `domain + path`, and the source carries a trailing slash exactly
/// when the target does, so both halves of a substitution anchor the same way.
fn endpoints(mapping: &DomainMapping, main_site: SiteId) -> (String, String) {
    if mapping.site_id == main_site || is_root_path(&mapping.source_path) {
        return (mapping.source_domain.clone(), mapping.target_domain.clone());
    }
    let target = format!("{}{}", mapping.target_domain, mapping.target_path);
    let source = format!(
        "{}{}",
        mapping.source_domain,
        mapping.source_path.trim_end_matches('/')
    );
    if target.ends_with('/') {
        (format!("{source}/"), target)
    } else {
        (source, target)
    }
}

fn escape_slashes(value: &str) -> String {
    value.replace('/', "\\/")
}
