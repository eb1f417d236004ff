// wpmigrate-core: topology discovery, mapping, plan compilation and execution
// for WordPress domain migrations. All database access goes through the
// `SiteAdmin` port.

pub mod admin;
pub mod context;
pub mod directory;
pub mod error;
pub mod executor;
pub mod main_site;
pub mod mapping;
pub mod model;
pub mod plan;
pub mod report;
pub mod routing;
pub mod sanitize;

// ── Primary re-exports ──────────────────────────────────────────────
pub use admin::{AdminError, RewriteRequest, SiteAdmin, TenantRow, WpCli, WpCliConfig};
pub use context::RunContext;
pub use directory::{DirectorySettings, SiteDirectory, list_sites};
pub use error::CoreError;
pub use executor::{ExecuteOptions, execute};
pub use main_site::resolve_main_site;
pub use mapping::{FixedTargets, MappingRequest, TargetProvider, build_mappings};
pub use plan::{PlanError, RewriteStep, SitePlan, StepVariant, compile_all, compile_plan};
pub use report::{ExecutionReport, Phase, SiteOutcome};
pub use routing::{
    DEFAULT_TABLE_PREFIX, RoutingOutcome, RoutingStatus, RoutingTable, RoutingUpdate,
    apply_routing, plan_routing, update_routing,
};
pub use sanitize::{ValidationError, host_of, sanitize, validate_domain};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AddressAnomaly, AnomalyKind, DomainMapping, InvalidSiteId, MappingOutcome, MappingSet, Site,
    SiteId, Topology, normalize_path,
};
