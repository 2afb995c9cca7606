//! Infrastructure faults abort the run; none of them produces a verdict or
//! an alert.

use std::sync::Arc;
use std::time::Duration;

use lc_config::validation::{default_checks, DEFAULT_ALERT_SUBJECT};
use lc_query::{ExecutionState, PollPolicy, QueryError};
use lc_reconcile::{EngineSettings, ReconciliationEngine};
use lc_testkit::{Call, RecordingNotifier, ScriptedExecutor, ScriptedQuery};

const DATASET: &str = "car_sales_db";

fn engine_with(
    ex: Arc<ScriptedExecutor>,
    n: Arc<RecordingNotifier>,
    timeout: Option<Duration>,
) -> ReconciliationEngine {
    let settings = EngineSettings {
        dataset: DATASET.to_string(),
        output_location: "s3://out/".to_string(),
        poll: PollPolicy::new(Duration::from_millis(1), timeout),
        alert_topic: "data-alerts".to_string(),
        alert_subject: DEFAULT_ALERT_SUBJECT.to_string(),
    };
    ReconciliationEngine::new(ex, n, settings, default_checks(DATASET))
}

fn figures() -> ScriptedExecutor {
    ScriptedExecutor::layer_figures(DATASET, "1000", "1000", "1.00", "1.00")
}

#[tokio::test]
async fn cancelled_query_aborts() {
    let checks = default_checks(DATASET);
    let ex = Arc::new(figures().on(
        checks[0].gold_query.clone(),
        ScriptedQuery::ends_in(ExecutionState::Cancelled),
    ));
    let n = Arc::new(RecordingNotifier::new());

    let err = engine_with(ex, n.clone(), None).run().await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::ExecutionFailed {
            state: ExecutionState::Cancelled,
            ..
        }
    ));
    assert!(n.published().is_empty());
}

#[tokio::test]
async fn rejected_submission_aborts_before_any_poll() {
    let checks = default_checks(DATASET);
    let ex = Arc::new(figures().on(
        checks[1].gold_query.clone(),
        ScriptedQuery::rejected("TABLE_NOT_FOUND: sales_summary"),
    ));
    let n = Arc::new(RecordingNotifier::new());

    let err = engine_with(ex.clone(), n, None).run().await.unwrap_err();
    assert_eq!(err.code(), "SUBMISSION_ERROR");
    assert!(
        !ex.calls().iter().any(|c| matches!(c, Call::Status(_))),
        "no status check may happen after a rejected submission"
    );
}

#[tokio::test]
async fn header_only_result_is_no_result() {
    let checks = default_checks(DATASET);
    let ex = Arc::new(figures().on(
        checks[0].silver_query.clone(),
        ScriptedQuery::rows(vec![vec![Some("_col0".to_string())]]),
    ));
    let n = Arc::new(RecordingNotifier::new());

    let err = engine_with(ex, n, None).run().await.unwrap_err();
    assert_eq!(err.code(), "NO_RESULT");
}

#[tokio::test]
async fn non_numeric_count_is_type_conversion_error() {
    let checks = default_checks(DATASET);
    let ex = Arc::new(figures().on(
        checks[0].gold_query.clone(),
        ScriptedQuery::scalar("one thousand"),
    ));
    let n = Arc::new(RecordingNotifier::new());

    let err = engine_with(ex, n, None).run().await.unwrap_err();
    assert_eq!(err.code(), "TYPE_CONVERSION_ERROR");
}

#[tokio::test(start_paused = true)]
async fn stuck_query_times_out() {
    let checks = default_checks(DATASET);
    let ex = Arc::new(figures().on(checks[1].silver_query.clone(), ScriptedQuery::stuck()));
    let n = Arc::new(RecordingNotifier::new());

    let err = engine_with(ex, n.clone(), Some(Duration::from_secs(30)))
        .run()
        .await
        .unwrap_err();
    match err {
        QueryError::Timeout { waited, .. } => assert!(waited >= Duration::from_secs(30)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(n.published().is_empty());
}
