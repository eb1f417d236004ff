// ── Domain model ──

pub mod mapping;
pub mod site;

pub use mapping::{AddressAnomaly, AnomalyKind, DomainMapping, MappingOutcome, MappingSet};
pub use site::{InvalidSiteId, Site, SiteId, Topology, normalize_path};
