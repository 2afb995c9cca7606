//! lc-config
//!
//! Layered YAML configuration for validation runs.
//!
//! - Docs are merged in order (base -> env -> overrides), later docs win.
//! - The merged document is hashed so every run can log exactly which
//!   configuration it executed against.
//! - Literal secrets are refused; config stores env var NAMES only
//!   (see [`secrets`]).
//! - [`report_unused_keys`] flags leaves nothing reads.
//!
//! The typed view consumed by the engine lives in [`validation`].

pub mod secrets;
pub mod validation;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

pub use validation::{CheckDef, CheckRule, ValidationConfig};

/// Leading text of credentials that must never sit in a config file. Query
/// tokens and webhook URLs belong in env vars named under `keys_env` /
/// `webhook_env` instead.
const SECRET_PREFIXES: &[&str] = &[
    "AKIA",
    "ASIA",
    "-----BEGIN",
    "https://hooks.slack.com/services/",
    "xoxb-",
    "xoxp-",
    "ghp_",
    "glpat-",
    "sk_live",
    "sk-",
];

/// JSON-pointer prefixes read by [`ValidationConfig::from_config_json`] and
/// [`secrets::resolve_secrets`].
///
/// Keep this in sync with the readers. A leaf under none of these prefixes is
/// reported as unused.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/engine/dataset",
    "/engine/output_location",
    "/engine/base_url",
    "/engine/keys_env/api_token",
    "/polling/interval_ms",
    "/polling/timeout_ms",
    "/alerts/topic",
    "/alerts/subject",
    "/alerts/webhook_env",
    "/checks",
];

/// How many unused pointers a `Fail` error lists before truncating.
const UNUSED_PREVIEW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

impl UnusedKeyPolicy {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(UnusedKeyPolicy::Warn),
            "fail" => Ok(UnusedKeyPolicy::Fail),
            other => bail!("invalid unused-key policy '{other}'. expected: warn | fail"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Sorted leaf pointers no reader consumes.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Leaves of `config_json` that no reader consumes. Under `Fail` a non-empty
/// result is an error (`CONFIG_UNUSED_KEYS`).
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let unused: BTreeSet<String> = leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !is_consumed(ptr))
        .collect();
    let report = UnusedKeyReport {
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let shown: Vec<&str> = report
            .unused_leaf_pointers
            .iter()
            .take(UNUSED_PREVIEW)
            .map(String::as_str)
            .collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused key(s); remove them or add a reader: {}",
            report.unused_leaf_pointers.len(),
            shown.join(", ")
        );
    }
    Ok(report)
}

/// `/checks` consumes `/checks` and `/checks/0/label`, not `/checksum`.
fn is_consumed(leaf: &str) -> bool {
    CONSUMED_POINTERS.iter().any(|p| {
        leaf.strip_prefix(p)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Every scalar leaf with its RFC 6901 pointer. A scalar root is `"/"`.
fn leaves(root: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    let mut stack = vec![(String::new(), root)];
    while let Some((ptr, v)) = stack.pop() {
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    let token = k.replace('~', "~0").replace('/', "~1");
                    stack.push((format!("{ptr}/{token}"), child));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    stack.push((format!("{ptr}/{i}"), child));
                }
            }
            leaf if ptr.is_empty() => out.push(("/".to_string(), leaf)),
            leaf => out.push((ptr, leaf)),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else (scalars, arrays such as
/// `checks`) is replaced wholesale by the later layer.
fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's default Map is BTreeMap-backed, so keys serialize sorted.
    let s = serde_json::to_string(v).context("canonical json serialize failed")?;
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    for (ptr, leaf) in leaves(v) {
        if leaf.as_str().is_some_and(looks_like_secret) {
            bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
        }
    }
    Ok(())
}

/// Short strings are never flagged; `AKIA` alone is not a key.
fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
