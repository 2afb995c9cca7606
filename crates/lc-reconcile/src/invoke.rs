//! Invocation entry point.
//!
//! A trigger (scheduler, event hook, CLI) hands over an opaque event and an
//! execution context. Neither influences the run; both are accepted so the
//! entry point can sit behind any invoker unchanged.

use serde_json::Value;
use tracing::info;

use crate::{ReconciliationEngine, ValidationOutcome};
use lc_query::QueryError;

/// Invoker-supplied metadata. Only used for log correlation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: Option<String>,
}

impl InvocationContext {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
        }
    }
}

/// Run one validation and shape the result for the invoker.
///
/// Returns `Err` for infrastructure faults so the invocation terminates
/// abnormally; mismatches come back as `Ok(ValidationOutcome::Fail { .. })`.
pub async fn handle(
    engine: &ReconciliationEngine,
    _event: &Value,
    ctx: &InvocationContext,
) -> Result<ValidationOutcome, QueryError> {
    let verdict = engine.run().await?;
    let outcome = ValidationOutcome::from(&verdict);
    info!(
        request_id = ctx.request_id.as_deref().unwrap_or("-"),
        pass = outcome.is_pass(),
        "invocation complete"
    );
    Ok(outcome)
}
