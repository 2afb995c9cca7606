//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g., `"LC_QUERY_API_TOKEN"`).
//! - Callers invoke [`resolve_secrets`] once at startup and pass the result
//!   into constructors; `std::env::var` is not scattered across the codebase.
//! - `Debug` output redacts values.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! Both secrets are optional: the query gateway may be unauthenticated, and
//! without a webhook the CLI falls back to a log-only notifier. A name that
//! is configured but unset is an error, since that is almost always a
//! deployment mistake.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::validation::read_str_at;

/// All runtime-resolved secrets for one validation run.
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Bearer token for the query gateway.
    pub query_api_token: Option<String>,
    /// Webhook URL alerts are posted to. The URL itself carries auth.
    pub alert_webhook_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "query_api_token",
                &self.query_api_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "alert_webhook_url",
                &self.alert_webhook_url.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn resolve_named(config_json: &Value, pointer: &str, what: &str) -> Result<Option<String>> {
    let Some(var_name) = read_str_at(config_json, pointer) else {
        return Ok(None);
    };
    match resolve_env(&var_name) {
        Some(v) => Ok(Some(v)),
        None => bail!(
            "SECRETS_MISSING: env var '{}' ({}) named at {} is not set or empty",
            var_name,
            what,
            pointer,
        ),
    }
}

/// Resolve every secret named in the config from the environment.
pub fn resolve_secrets(config_json: &Value) -> Result<ResolvedSecrets> {
    let query_api_token =
        resolve_named(config_json, "/engine/keys_env/api_token", "query api token")?;
    let alert_webhook_url = resolve_named(config_json, "/alerts/webhook_env", "alert webhook")?;

    Ok(ResolvedSecrets {
        query_api_token,
        alert_webhook_url,
    })
}
