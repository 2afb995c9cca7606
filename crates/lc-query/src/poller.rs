//! Waiting for asynchronous query completion.
//!
//! There is one loop, [`poll_until`], parameterized by what counts as done.
//! [`await_completion`] and [`await_success`] are thin wrappers that share the
//! same terminal predicate ([`ExecutionState::is_terminal`]), so the two can
//! never disagree about when a query has finished.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::{ExecutionState, QueryError, QueryExecutor, QueryHandle};

/// How often to poll and how long to wait in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until a terminal state, however long that takes.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }
}

/// Poll `handle` every `policy.interval` until `is_done(state)` holds, and
/// return that state.
///
/// Status-check errors propagate unchanged. With a timeout, one last status
/// check is made at the deadline before giving up with
/// [`QueryError::Timeout`].
pub async fn poll_until<E, F>(
    executor: &E,
    handle: &QueryHandle,
    policy: &PollPolicy,
    is_done: F,
) -> Result<ExecutionState, QueryError>
where
    E: QueryExecutor + ?Sized,
    F: Fn(ExecutionState) -> bool,
{
    let started = Instant::now();
    let deadline = policy.timeout.map(|t| started + t);
    let mut attempts: u64 = 0;

    loop {
        let state = executor.status(handle).await?;
        attempts += 1;
        debug!(query_id = %handle, state = %state, attempts, "polled query status");

        if is_done(state) {
            return Ok(state);
        }

        let pause = match deadline {
            None => policy.interval,
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    return Err(QueryError::Timeout {
                        handle: handle.clone(),
                        waited: now - started,
                    });
                }
                // never sleep past the deadline
                policy.interval.min(d - now)
            }
        };
        tokio::time::sleep(pause).await;
    }
}

/// Wait until the query is terminal and return the state, whether or not it
/// succeeded.
pub async fn await_completion<E>(
    executor: &E,
    handle: &QueryHandle,
    policy: &PollPolicy,
) -> Result<ExecutionState, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let state = poll_until(executor, handle, policy, |s| s.is_terminal()).await?;
    info!(query_id = %handle, state = %state, "query reached terminal state");
    Ok(state)
}

/// Wait until the query is terminal; anything but `SUCCEEDED` is an
/// [`QueryError::ExecutionFailed`].
pub async fn await_success<E>(
    executor: &E,
    handle: &QueryHandle,
    policy: &PollPolicy,
) -> Result<(), QueryError>
where
    E: QueryExecutor + ?Sized,
{
    match await_completion(executor, handle, policy).await? {
        ExecutionState::Succeeded => Ok(()),
        state => Err(QueryError::ExecutionFailed {
            handle: handle.clone(),
            state,
        }),
    }
}
