//! Typed view of a loaded config, as consumed by a validation run.
//!
//! Every pointer read here must be listed in [`crate::CONSUMED_POINTERS`].

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 15 * 60 * 1_000;
pub const DEFAULT_ALERT_SUBJECT: &str = "❌ Data Validation FAILED";
pub const DEFAULT_DECIMALS: u32 = 2;
/// Past this, an f64 carries no further decimal digits to compare.
pub const MAX_DECIMALS: u32 = 15;

/// How the two scalars of a check are typed and compared.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckRule {
    /// Both sides parsed as integers; exact equality.
    ExactInteger,
    /// Both sides parsed as floats and rounded to `decimals` places; equal
    /// when the rounded values differ by at most `tolerance`.
    RoundedDecimal { decimals: u32, tolerance: f64 },
}

/// One gold/silver comparison pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckDef {
    pub label: String,
    pub gold_query: String,
    pub silver_query: String,
    pub rule: CheckRule,
}

impl CheckDef {
    pub fn new(
        label: impl Into<String>,
        gold_query: impl Into<String>,
        silver_query: impl Into<String>,
        rule: CheckRule,
    ) -> Self {
        Self {
            label: label.into(),
            gold_query: gold_query.into(),
            silver_query: silver_query.into(),
            rule,
        }
    }
}

/// The standard checklist: unit count and revenue, gold summary vs silver
/// detail rows.
pub fn default_checks(dataset: &str) -> Vec<CheckDef> {
    vec![
        CheckDef::new(
            "Count",
            format!("SELECT SUM(model_total_units_sold) FROM {dataset}.sales_summary;"),
            format!("SELECT COUNT(*) FROM {dataset}.silver;"),
            CheckRule::ExactInteger,
        ),
        CheckDef::new(
            "Revenue",
            format!("SELECT SUM(model_total_revenue) FROM {dataset}.sales_summary;"),
            format!("SELECT SUM(price) FROM {dataset}.silver;"),
            CheckRule::RoundedDecimal {
                decimals: DEFAULT_DECIMALS,
                tolerance: 0.0,
            },
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Dataset / catalog database the queries run against.
    pub dataset: String,
    /// Where the query engine writes result files.
    pub output_location: String,
    /// Query gateway endpoint. Only required by the HTTP executor.
    pub base_url: Option<String>,
    pub poll_interval: Duration,
    /// `None` waits forever.
    pub poll_timeout: Option<Duration>,
    pub alert_topic: String,
    pub alert_subject: String,
    pub checks: Vec<CheckDef>,
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    label: String,
    gold: String,
    silver: String,
    rule: String,
    decimals: Option<u32>,
    tolerance: Option<f64>,
}

impl ValidationConfig {
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let dataset = required_str(config, "/engine/dataset")?;
        let output_location = required_str(config, "/engine/output_location")?;
        let base_url = read_str_at(config, "/engine/base_url");

        let interval_ms = match config.pointer("/polling/interval_ms") {
            None | Some(Value::Null) => DEFAULT_POLL_INTERVAL_MS,
            Some(v) => v
                .as_u64()
                .context("CONFIG_INVALID /polling/interval_ms: expected a positive integer")?,
        };
        if interval_ms == 0 {
            bail!("CONFIG_INVALID /polling/interval_ms: must be > 0");
        }

        // Absent -> default deadline; explicit null -> no deadline.
        let poll_timeout = match config.pointer("/polling/timeout_ms") {
            None => Some(Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS)),
            Some(Value::Null) => None,
            Some(v) => Some(Duration::from_millis(v.as_u64().context(
                "CONFIG_INVALID /polling/timeout_ms: expected a non-negative integer or null",
            )?)),
        };

        let alert_topic = required_str(config, "/alerts/topic")?;
        let alert_subject = read_str_at(config, "/alerts/subject")
            .unwrap_or_else(|| DEFAULT_ALERT_SUBJECT.to_string());

        let checks = match config.pointer("/checks") {
            None | Some(Value::Null) => default_checks(&dataset),
            Some(v) => parse_checks(v)?,
        };

        Ok(Self {
            dataset,
            output_location,
            base_url,
            poll_interval: Duration::from_millis(interval_ms),
            poll_timeout,
            alert_topic,
            alert_subject,
            checks,
        })
    }
}

fn parse_checks(v: &Value) -> Result<Vec<CheckDef>> {
    let raw: Vec<RawCheck> = serde_json::from_value(v.clone())
        .context("CONFIG_INVALID /checks: expected a list of {label, gold, silver, rule}")?;
    if raw.is_empty() {
        bail!("CONFIG_INVALID /checks: list is empty; omit it to use the default checklist");
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, rc)| {
            if rc.label.trim().is_empty() {
                bail!("CONFIG_INVALID /checks/{i}/label: must not be blank");
            }
            if rc.gold.trim().is_empty() || rc.silver.trim().is_empty() {
                bail!(
                    "CONFIG_INVALID /checks/{i} ({}): gold and silver queries must not be blank",
                    rc.label
                );
            }
            let rule = match rc.rule.trim().to_ascii_lowercase().as_str() {
                "exact_integer" => CheckRule::ExactInteger,
                "rounded_decimal" => {
                    let tolerance = rc.tolerance.unwrap_or(0.0);
                    if !tolerance.is_finite() || tolerance < 0.0 {
                        bail!(
                            "CONFIG_INVALID /checks/{i}/tolerance: must be a finite value >= 0"
                        );
                    }
                    let decimals = rc.decimals.unwrap_or(DEFAULT_DECIMALS);
                    if decimals > MAX_DECIMALS {
                        bail!(
                            "CONFIG_INVALID /checks/{i}/decimals: {decimals} is outside 0..={MAX_DECIMALS}"
                        );
                    }
                    CheckRule::RoundedDecimal {
                        decimals,
                        tolerance,
                    }
                }
                other => bail!(
                    "CONFIG_INVALID /checks/{i}/rule: '{other}'. expected one of: \
                     exact_integer | rounded_decimal"
                ),
            };
            Ok(CheckDef::new(rc.label.trim(), rc.gold, rc.silver, rule))
        })
        .collect()
}

/// Read a non-empty string value at `pointer`. Blank or non-string -> `None`.
pub(crate) fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn required_str(config: &Value, pointer: &str) -> Result<String> {
    match read_str_at(config, pointer) {
        Some(s) => Ok(s),
        None => bail!("CONFIG_MISSING_KEY {pointer}: required string value is absent or blank"),
    }
}
