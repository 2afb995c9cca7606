use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use lc_config::secrets::resolve_secrets;
use lc_config::{
    load_layered_yaml, report_unused_keys, CheckRule, LoadedConfig, UnusedKeyPolicy,
    ValidationConfig,
};
use lc_notify::{LogNotifier, Notifier, WebhookNotifier};
use lc_query::{HttpQueryExecutor, QueryExecutor};
use lc_reconcile::{handle, InvocationContext, ReconciliationEngine, ValidationOutcome};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Exit code for a completed run that found mismatches.
const EXIT_VALIDATION_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "layercheck")]
#[command(about = "Gold/silver layer reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured checklist once and print the outcome as JSON.
    /// Exit 0 on PASS, 2 on FAIL, 1 when the run aborts.
    Validate {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Unused config keys: warn | fail
        #[arg(long, default_value = "warn")]
        unused_keys: String,

        /// Trigger event payload (JSON). Passed through to the entry point.
        #[arg(long)]
        event: Option<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the effective checklist
    Checks {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Serialize)]
struct RunEnvelope<'a> {
    run_id: String,
    started_at: String,
    config_hash: &'a str,
    result: &'a ValidationOutcome,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Validate {
            config_paths,
            unused_keys,
            event,
        } => {
            let policy = UnusedKeyPolicy::parse(&unused_keys)?;
            let event: Value = match event {
                Some(raw) => serde_json::from_str(&raw).context("--event is not valid JSON")?,
                None => serde_json::json!({}),
            };
            validate(&config_paths, policy, event).await
        }
        Commands::ConfigHash { paths } => {
            let loaded = load(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Checks { config_paths } => {
            let loaded = load(&config_paths)?;
            let cfg = ValidationConfig::from_config_json(&loaded.config_json)?;
            for c in &cfg.checks {
                let rule = match &c.rule {
                    CheckRule::ExactInteger => "exact_integer".to_string(),
                    CheckRule::RoundedDecimal {
                        decimals,
                        tolerance,
                    } => format!("rounded_decimal(decimals={decimals}, tolerance={tolerance})"),
                };
                println!("{} [{}]", c.label, rule);
                println!("  gold:   {}", c.gold_query);
                println!("  silver: {}", c.silver_query);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn validate(config_paths: &[String], policy: UnusedKeyPolicy, event: Value) -> Result<ExitCode> {
    let loaded = load(config_paths)?;

    let unused = report_unused_keys(&loaded.config_json, policy)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "unused config keys");
    }

    let cfg = ValidationConfig::from_config_json(&loaded.config_json)?;
    let secrets = resolve_secrets(&loaded.config_json)?;

    let base_url = cfg
        .base_url
        .clone()
        .context("CONFIG_MISSING_KEY /engine/base_url: required by the HTTP query gateway")?;
    let executor: Arc<dyn QueryExecutor> = Arc::new(HttpQueryExecutor::new(
        base_url,
        secrets.query_api_token.clone(),
    ));
    let notifier: Arc<dyn Notifier> = match secrets.alert_webhook_url.clone() {
        Some(url) => Arc::new(WebhookNotifier::new(url)),
        None => {
            info!("no alert webhook configured; alerts go to the log");
            Arc::new(LogNotifier)
        }
    };

    let engine = ReconciliationEngine::from_config(executor, notifier, &cfg);

    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now().to_rfc3339();
    let span = info_span!("validation", run_id = %run_id, config_hash = %loaded.config_hash);
    let ctx = InvocationContext::with_request_id(run_id.clone());

    let outcome = handle(&engine, &event, &ctx)
        .instrument(span)
        .await
        .context("validation run aborted")?;

    let envelope = RunEnvelope {
        run_id,
        started_at,
        config_hash: &loaded.config_hash,
        result: &outcome,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if outcome.is_pass() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_VALIDATION_FAILED))
    }
}

fn load(paths: &[String]) -> Result<LoadedConfig> {
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    load_layered_yaml(&refs)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
