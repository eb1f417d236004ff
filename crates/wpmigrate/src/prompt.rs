// ── Interactive target collection ──
//
// `TargetProvider` for the CLI. `--site` overrides answer without asking;
// otherwise the operator is prompted with the suggestion as default, or the
// suggestion is accepted outright when prompting is off.

use std::collections::BTreeMap;

use dialoguer::Input;
use wpmigrate_core::{CoreError, Site, SiteId, TargetProvider};

#[derive(Debug, Default)]
pub struct PromptTargets {
    interactive: bool,
    overrides: BTreeMap<SiteId, String>,
    persisted: BTreeMap<SiteId, String>,
}

impl PromptTargets {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            ..Self::default()
        }
    }

    /// Answers given on the command line; never prompted for.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (SiteId, String)>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Targets remembered by an earlier run; used as suggestions.
    pub fn with_persisted(mut self, persisted: BTreeMap<SiteId, String>) -> Self {
        self.persisted = persisted;
        self
    }

    fn ask(&self, prompt: String, suggestion: &str) -> Result<String, CoreError> {
        if !self.interactive {
            return Ok(suggestion.to_owned());
        }
        Input::<String>::new()
            .with_prompt(prompt)
            .default(suggestion.to_owned())
            .allow_empty(true)
            .interact_text()
            .map_err(|e| CoreError::Io(std::io::Error::other(e)))
    }
}

impl TargetProvider for PromptTargets {
    fn network_target(&mut self, suggestion: &str) -> Result<String, CoreError> {
        self.ask("Target domain for the whole network".into(), suggestion)
    }

    fn site_target(&mut self, site: &Site, is_main: bool, suggestion: &str) -> Result<String, CoreError> {
        if let Some(target) = self.overrides.get(&site.id) {
            return Ok(target.clone());
        }
        let role = if is_main { " (main site)" } else { "" };
        self.ask(
            format!("Target for site {} {}{role}", site.id, site.address()),
            suggestion,
        )
    }

    fn persisted_target(&self, site: SiteId) -> Option<String> {
        self.persisted.get(&site).cloned()
    }
}
