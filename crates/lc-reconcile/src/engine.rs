//! Orchestration of one validation run.
//!
//! submit all -> await all (concurrently) -> read scalars -> compare -> alert.
//!
//! Every query is submitted before any is awaited, so the engine runs them
//! side by side. Waits are joined, so a run takes as long as its slowest
//! query rather than the sum of all of them.

use std::sync::Arc;

use futures_util::future::try_join_all;
use lc_config::{CheckDef, ValidationConfig};
use lc_notify::Notifier;
use lc_query::{await_success, read_scalar, PollPolicy, QueryError, QueryExecutor, QueryHandle};
use tracing::{error, info, warn};

use crate::compare::{evaluate, scalar_kind, Observation};
use crate::Verdict;

/// Everything a run needs besides its collaborators and checklist.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub dataset: String,
    pub output_location: String,
    pub poll: PollPolicy,
    pub alert_topic: String,
    pub alert_subject: String,
}

impl EngineSettings {
    pub fn from_config(cfg: &ValidationConfig) -> Self {
        Self {
            dataset: cfg.dataset.clone(),
            output_location: cfg.output_location.clone(),
            poll: PollPolicy::new(cfg.poll_interval, cfg.poll_timeout),
            alert_topic: cfg.alert_topic.clone(),
            alert_subject: cfg.alert_subject.clone(),
        }
    }
}

struct Submitted<'a> {
    check: &'a CheckDef,
    gold: QueryHandle,
    silver: QueryHandle,
}

pub struct ReconciliationEngine {
    executor: Arc<dyn QueryExecutor>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    checks: Vec<CheckDef>,
}

impl ReconciliationEngine {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
        checks: Vec<CheckDef>,
    ) -> Self {
        Self {
            executor,
            notifier,
            settings,
            checks,
        }
    }

    pub fn from_config(
        executor: Arc<dyn QueryExecutor>,
        notifier: Arc<dyn Notifier>,
        cfg: &ValidationConfig,
    ) -> Self {
        Self::new(
            executor,
            notifier,
            EngineSettings::from_config(cfg),
            cfg.checks.clone(),
        )
    }

    pub fn checks(&self) -> &[CheckDef] {
        &self.checks
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run the checklist once.
    ///
    /// `Err` means the run could not be completed (submission rejected, query
    /// FAILED/CANCELLED, timeout, unreadable result) and no verdict exists.
    /// A data mismatch is `Ok(Verdict::Fail(..))`, never an error.
    pub async fn run(&self) -> Result<Verdict, QueryError> {
        info!(
            engine = self.executor.engine_name(),
            dataset = %self.settings.dataset,
            checks = self.checks.len(),
            "validation run started"
        );

        let result = self.run_inner().await;
        if let Err(e) = &result {
            error!(code = e.code(), error = %e, "validation run aborted");
        }
        result
    }

    async fn run_inner(&self) -> Result<Verdict, QueryError> {
        let submitted = self.submit_all().await?;

        let handles: Vec<&QueryHandle> = submitted
            .iter()
            .flat_map(|s| [&s.gold, &s.silver])
            .collect();
        let executor = self.executor.as_ref();
        let poll = &self.settings.poll;
        try_join_all(handles.into_iter().map(|h| await_success(executor, h, poll))).await?;

        let mut observations = Vec::with_capacity(submitted.len());
        for s in &submitted {
            let kind = scalar_kind(&s.check.rule);
            let gold = read_scalar(executor, &s.gold, kind).await?;
            let silver = read_scalar(executor, &s.silver, kind).await?;
            observations.push(Observation {
                check: s.check.clone(),
                gold,
                silver,
            });
        }

        let verdict = evaluate(&observations);
        match &verdict {
            Verdict::Pass => info!("validation PASS"),
            Verdict::Fail(report) => {
                for m in report.messages() {
                    warn!(discrepancy = %m, "validation mismatch");
                }
                self.alert(&report.body()).await;
            }
        }
        Ok(verdict)
    }

    /// Submit gold then silver for every check, in checklist order, without
    /// waiting on any of them.
    async fn submit_all(&self) -> Result<Vec<Submitted<'_>>, QueryError> {
        let mut out = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let gold = self.submit(&check.gold_query).await?;
            let silver = self.submit(&check.silver_query).await?;
            out.push(Submitted {
                check,
                gold,
                silver,
            });
        }
        Ok(out)
    }

    async fn submit(&self, query: &str) -> Result<QueryHandle, QueryError> {
        self.executor
            .submit(query, &self.settings.dataset, &self.settings.output_location)
            .await
    }

    /// Best effort: a delivery failure is logged and does not change the
    /// verdict.
    async fn alert(&self, body: &str) {
        let res = self
            .notifier
            .publish(&self.settings.alert_topic, &self.settings.alert_subject, body)
            .await;
        if let Err(e) = res {
            warn!(
                channel = self.notifier.channel_name(),
                error = %e,
                "alert delivery failed"
            );
        }
    }
}
