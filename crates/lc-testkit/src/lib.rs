//! lc-testkit
//!
//! In-memory doubles for the engine's collaborators:
//!
//! - [`ScriptedExecutor`]: answers each query text from a script (state
//!   sequence + result rows) and records every call in order.
//! - [`RecordingNotifier`]: keeps every published alert; can be told to fail.
//!
//! Test-only. Nothing here talks to a network.

use std::collections::HashMap;
use std::sync::Mutex;

use lc_config::validation::default_checks;
use lc_notify::{Notifier, NotifyError};
use lc_query::{ExecutionState, QueryError, QueryExecutor, QueryHandle, ResultRow};

// ---------------------------------------------------------------------------
// Scripted executor
// ---------------------------------------------------------------------------

/// Behaviour of one query text.
#[derive(Debug, Clone)]
pub struct ScriptedQuery {
    /// Reported one per status call; the last one repeats forever.
    pub states: Vec<ExecutionState>,
    /// Returned by `result_rows`, header row included.
    pub rows: Vec<ResultRow>,
    /// When set, `submit` fails with this message.
    pub reject_with: Option<String>,
}

impl ScriptedQuery {
    /// Runs once, then succeeds with a single-cell result `value`.
    pub fn scalar(value: &str) -> Self {
        Self {
            states: vec![ExecutionState::Running, ExecutionState::Succeeded],
            rows: vec![
                vec![Some("_col0".to_string())],
                vec![Some(value.to_string())],
            ],
            reject_with: None,
        }
    }

    /// Succeeds with exactly `rows`.
    pub fn rows(rows: Vec<ResultRow>) -> Self {
        Self {
            states: vec![ExecutionState::Succeeded],
            rows,
            reject_with: None,
        }
    }

    /// Reaches `state` after one RUNNING poll, with no rows.
    pub fn ends_in(state: ExecutionState) -> Self {
        Self {
            states: vec![ExecutionState::Running, state],
            rows: Vec::new(),
            reject_with: None,
        }
    }

    /// Never leaves RUNNING.
    pub fn stuck() -> Self {
        Self::ends_in(ExecutionState::Running)
    }

    pub fn rejected(message: &str) -> Self {
        Self {
            states: vec![ExecutionState::Failed],
            rows: Vec::new(),
            reject_with: Some(message.to_string()),
        }
    }

    pub fn with_states(mut self, states: Vec<ExecutionState>) -> Self {
        self.states = states;
        self
    }
}

/// One executor call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit {
        query: String,
        dataset: String,
        output_location: String,
    },
    Status(QueryHandle),
    Rows(QueryHandle),
}

#[derive(Default)]
struct ExecState {
    next_id: u64,
    /// handle -> (query text, status calls answered so far)
    running: HashMap<QueryHandle, (String, usize)>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, ScriptedQuery>,
    state: Mutex<ExecState>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `query`, replacing any earlier script for the same text.
    pub fn on(mut self, query: impl Into<String>, script: ScriptedQuery) -> Self {
        self.scripts.insert(query.into(), script);
        self
    }

    /// Scripts the default checklist for `dataset` with the four figures,
    /// in checklist order.
    pub fn layer_figures(
        dataset: &str,
        gold_count: &str,
        silver_count: &str,
        gold_revenue: &str,
        silver_revenue: &str,
    ) -> Self {
        let checks = default_checks(dataset);
        Self::new()
            .on(checks[0].gold_query.clone(), ScriptedQuery::scalar(gold_count))
            .on(checks[0].silver_query.clone(), ScriptedQuery::scalar(silver_count))
            .on(checks[1].gold_query.clone(), ScriptedQuery::scalar(gold_revenue))
            .on(checks[1].silver_query.clone(), ScriptedQuery::scalar(silver_revenue))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn submitted_queries(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Submit { query, .. } => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExecState> {
        // a poisoned lock only happens after a panicking test thread
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn script_for(&self, handle: &QueryHandle, st: &ExecState) -> Result<ScriptedQuery, QueryError> {
        let (query, _) = st.running.get(handle).ok_or_else(|| QueryError::StatusCheck {
            handle: handle.clone(),
            message: "unknown query execution id".to_string(),
        })?;
        self.scripts
            .get(query)
            .cloned()
            .ok_or_else(|| QueryError::StatusCheck {
                handle: handle.clone(),
                message: "no script for query".to_string(),
            })
    }
}

#[async_trait::async_trait]
impl QueryExecutor for ScriptedExecutor {
    fn engine_name(&self) -> &'static str {
        "scripted"
    }

    async fn submit(
        &self,
        query: &str,
        dataset: &str,
        output_location: &str,
    ) -> Result<QueryHandle, QueryError> {
        let mut st = self.lock();
        st.calls.push(Call::Submit {
            query: query.to_string(),
            dataset: dataset.to_string(),
            output_location: output_location.to_string(),
        });

        let script = self.scripts.get(query).ok_or_else(|| QueryError::Submission {
            query: query.to_string(),
            message: "no script for query".to_string(),
        })?;
        if let Some(message) = &script.reject_with {
            return Err(QueryError::Submission {
                query: query.to_string(),
                message: message.clone(),
            });
        }

        st.next_id += 1;
        let handle = QueryHandle::new(format!("q-{}", st.next_id));
        st.running
            .insert(handle.clone(), (query.to_string(), 0));
        Ok(handle)
    }

    async fn status(&self, handle: &QueryHandle) -> Result<ExecutionState, QueryError> {
        let mut st = self.lock();
        st.calls.push(Call::Status(handle.clone()));
        let script = self.script_for(handle, &st)?;

        let entry = st
            .running
            .get_mut(handle)
            .ok_or_else(|| QueryError::StatusCheck {
                handle: handle.clone(),
                message: "unknown query execution id".to_string(),
            })?;
        let idx = entry.1.min(script.states.len().saturating_sub(1));
        entry.1 += 1;

        script
            .states
            .get(idx)
            .copied()
            .ok_or_else(|| QueryError::StatusCheck {
                handle: handle.clone(),
                message: "script has no states".to_string(),
            })
    }

    async fn result_rows(&self, handle: &QueryHandle) -> Result<Vec<ResultRow>, QueryError> {
        let mut st = self.lock();
        st.calls.push(Call::Rows(handle.clone()));
        Ok(self.script_for(handle, &st)?.rows)
    }
}

// ---------------------------------------------------------------------------
// Recording notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<Published>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then reports a transport failure.
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn channel_name(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.published
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Published {
                topic: topic.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        if self.fail {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_states_advance_then_repeat() {
        let ex = ScriptedExecutor::new().on("SELECT 1", ScriptedQuery::scalar("1"));
        let h = ex.submit("SELECT 1", "db", "out").await.unwrap();
        assert_eq!(ex.status(&h).await.unwrap(), ExecutionState::Running);
        assert_eq!(ex.status(&h).await.unwrap(), ExecutionState::Succeeded);
        assert_eq!(ex.status(&h).await.unwrap(), ExecutionState::Succeeded);
    }

    #[tokio::test]
    async fn unscripted_query_is_rejected() {
        let ex = ScriptedExecutor::new();
        let err = ex.submit("SELECT 2", "db", "out").await.unwrap_err();
        assert_eq!(err.code(), "SUBMISSION_ERROR");
    }

    #[tokio::test]
    async fn handles_are_distinct_per_submission() {
        let ex = ScriptedExecutor::new().on("SELECT 1", ScriptedQuery::scalar("1"));
        let a = ex.submit("SELECT 1", "db", "out").await.unwrap();
        let b = ex.submit("SELECT 1", "db", "out").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn failing_notifier_still_records() {
        let n = RecordingNotifier::failing();
        assert!(n.publish("t", "s", "b").await.is_err());
        assert_eq!(n.published().len(), 1);
    }
}
