//! Domain input normalization.
//!
//! Operators paste domains in every shape (`https://www.example.com/`,
//! `example.com `, `http://example.com/blog`). [`sanitize`] reduces them to
//! a comparable form and never fails; [`validate_domain`] is the boundary
//! check that rejects what cannot be a host.

use serde::Serialize;
use thiserror::Error;
use url::Url;

const SCHEMES: [&str; 2] = ["https://", "http://"];

/// A domain that was rejected at the input boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("invalid domain '{input}': {reason}")]
pub struct ValidationError {
    pub input: String,
    pub reason: String,
}

impl ValidationError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Strip surrounding whitespace, one leading `http://` or `https://`, and
/// exactly one trailing `/`.
pub fn sanitize(raw: &str) -> String {
    let trimmed = strip_scheme(raw.trim()).trim();
    let without_slash = trimmed.strip_suffix('/').unwrap_or(trimmed);
    without_slash.trim().to_owned()
}

fn strip_scheme(value: &str) -> &str {
    for scheme in SCHEMES {
        let matches = value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme));
        if matches {
            return &value[scheme.len()..];
        }
    }
    value
}

/// Sanitize `raw` and reject anything that is not a usable host with an
/// optional path.
pub fn validate_domain(raw: &str) -> Result<String, ValidationError> {
    let domain = sanitize(raw);
    if domain.is_empty() {
        return Err(ValidationError::new(raw, "domain is empty"));
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(raw, "domain contains whitespace"));
    }
    if domain.contains("://") {
        return Err(ValidationError::new(
            raw,
            "only http:// and https:// prefixes are understood",
        ));
    }
    let host = host_of(&domain);
    if host.is_empty() {
        return Err(ValidationError::new(raw, "missing host"));
    }
    let parsed = Url::parse(&format!("http://{host}/"))
        .map_err(|e| ValidationError::new(raw, format!("not a valid host: {e}")))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::new(raw, "not a valid host"));
    }
    Ok(domain)
}

/// Host portion of a sanitized `domain[/path]` value.
pub fn host_of(domain: &str) -> &str {
    domain.split_once('/').map_or(domain, |(host, _)| host)
}
