// ── Core error types ──
//
// The run-level taxonomy. Port failures arrive as `AdminError` and are
// wrapped with the operation that triggered them, so the raw WP-CLI output
// stays attached to the error that reaches the operator.

use thiserror::Error;

use crate::admin::AdminError;
use crate::plan::PlanError;
use crate::sanitize::ValidationError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    // ── External interface errors ────────────────────────────────────
    #[error("{operation} failed: {source}")]
    ExternalInterface {
        operation: String,
        #[source]
        source: AdminError,
    },

    #[error("Routing table update failed: {message}")]
    RoutingUpdate { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn interface(operation: impl Into<String>, source: AdminError) -> Self {
        Self::ExternalInterface {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
