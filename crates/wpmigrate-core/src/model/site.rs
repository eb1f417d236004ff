// ── Site identity and topology ──
//
// A `Site` is one tenant row as read from the routing tables at the start
// of a run. Ids are assigned by WordPress and never minted here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

// ── SiteId ──────────────────────────────────────────────────────────

/// Tenant identifier (`blog_id`). Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SiteId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid site id '{0}': expected a positive integer")]
pub struct InvalidSiteId(pub String);

impl SiteId {
    /// Conventional id of the first site in any installation.
    pub const PRIMARY: Self = Self(1);

    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SiteId {
    type Err = InvalidSiteId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidSiteId(s.to_owned()))
    }
}

impl TryFrom<u64> for SiteId {
    type Error = InvalidSiteId;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| InvalidSiteId(raw.to_string()))
    }
}

impl From<SiteId> for u64 {
    fn from(id: SiteId) -> Self {
        id.0
    }
}

// ── Topology ────────────────────────────────────────────────────────

/// Installation layout, determined once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Topology {
    Single,
    MultisiteSubdomain,
    MultisiteSubdirectory,
}

impl Topology {
    pub fn is_multisite(self) -> bool {
        !matches!(self, Self::Single)
    }
}

// ── Site ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub domain: String,
    /// `/` for root, otherwise `/segment/` with both slashes present.
    pub path: String,
}

impl Site {
    pub fn new(id: SiteId, domain: impl Into<String>, path: &str) -> Self {
        Self {
            id,
            domain: domain.into(),
            path: normalize_path(path),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// The address WP-CLI's `--url` selector resolves to this tenant.
    pub fn address(&self) -> String {
        join_address(&self.domain, &self.path)
    }
}

/// Normalize a routing-table path: `""` and `"/"` become `/`, anything else
/// gains a leading and trailing slash.
pub fn normalize_path(raw: &str) -> String {
    let inner = raw.trim().trim_matches('/');
    if inner.is_empty() {
        "/".into()
    } else {
        format!("/{inner}/")
    }
}

pub(crate) fn is_root_path(path: &str) -> bool {
    path.is_empty() || path == "/"
}

pub(crate) fn join_address(domain: &str, path: &str) -> String {
    if is_root_path(path) {
        domain.to_owned()
    } else {
        format!("{domain}{path}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn site_id_rejects_zero() {
        assert!(SiteId::new(0).is_none());
        assert!("0".parse::<SiteId>().is_err());
        assert!(SiteId::try_from(0).is_err());
    }

    #[test]
    fn site_id_parses_with_whitespace() {
        let id: SiteId = " 12 ".parse().unwrap();
        assert_eq!(id.get(), 12);
        assert_eq!(id.to_string(), "12");
    }

    #[test]
    fn site_id_deserializes_from_number() {
        let id: SiteId = serde_json::from_str("3").unwrap();
        assert_eq!(id, SiteId::new(3).unwrap());
        assert!(serde_json::from_str::<SiteId>("0").is_err());
    }

    #[test]
    fn normalize_path_adds_slashes() {
        assert_eq!(normalize_path("shop"), "/shop/");
        assert_eq!(normalize_path("/shop"), "/shop/");
        assert_eq!(normalize_path("/shop/"), "/shop/");
        assert_eq!(normalize_path("/a/b"), "/a/b/");
    }

    #[test]
    fn normalize_path_root_forms() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
    }

    #[test]
    fn site_address_omits_root_slash() {
        let root = Site::new(SiteId::PRIMARY, "example.com", "/");
        let shop = Site::new(SiteId::new(2).unwrap(), "example.com", "shop");
        assert_eq!(root.address(), "example.com");
        assert_eq!(shop.address(), "example.com/shop/");
        assert!(root.is_root());
        assert!(!shop.is_root());
    }

    #[test]
    fn topology_round_trips_through_strum() {
        assert_eq!(Topology::MultisiteSubdomain.to_string(), "multisite-subdomain");
        assert_eq!(
            "multisite-subdirectory".parse::<Topology>().unwrap(),
            Topology::MultisiteSubdirectory
        );
        assert!(!Topology::Single.is_multisite());
        assert!(Topology::MultisiteSubdomain.is_multisite());
    }
}
