//! lc-query
//!
//! Boundary to the analytical query engine.
//!
//! - [`QueryExecutor`]: submit / status / result rows. Submission never waits
//!   for completion; the engine runs queries asynchronously.
//! - [`poller`]: wait for a handle to reach a terminal [`ExecutionState`].
//! - [`reader`]: pull one typed scalar out of a finished result set.
//! - [`gateway`]: HTTP implementation of [`QueryExecutor`].
//!
//! No comparison logic lives here; see lc-reconcile.

pub mod gateway;
pub mod poller;
pub mod reader;

use std::fmt;
use std::time::Duration;

pub use gateway::HttpQueryExecutor;
pub use poller::{await_completion, await_success, poll_until, PollPolicy};
pub use reader::{extract_scalar, read_scalar};

// ---------------------------------------------------------------------------
// Handle / state
// ---------------------------------------------------------------------------

/// Opaque identifier for one submitted query, as issued by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution status of a submitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// `SUCCEEDED`, `FAILED` and `CANCELLED` are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }

    /// Parse an engine-reported state. Queued states are treated as running.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" | "QUEUED" | "SUBMITTED" | "PENDING" => Some(ExecutionState::Running),
            "SUCCEEDED" => Some(ExecutionState::Succeeded),
            "FAILED" => Some(ExecutionState::Failed),
            "CANCELLED" | "CANCELED" => Some(ExecutionState::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Numeric type the caller expects a result cell to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Integer,
    Float,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
        }
    }

    /// Parse `raw` as this kind. Non-finite floats are refused.
    pub fn parse(&self, raw: &str) -> Option<ScalarValue> {
        let t = raw.trim();
        match self {
            ScalarKind::Integer => t.parse::<i64>().ok().map(ScalarValue::Integer),
            ScalarKind::Float => t
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ScalarValue::Float),
        }
    }
}

/// One typed value read from a result set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
}

impl ScalarValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            ScalarValue::Float(_) => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> f64 {
        match self {
            ScalarValue::Integer(v) => *v as f64,
            ScalarValue::Float(v) => *v,
        }
    }
}

/// Floats always keep a fractional part (`100.0`, not `100`).
impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// One result row; `None` is a SQL NULL cell.
pub type ResultRow = Vec<Option<String>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong between submitting a query and holding its
/// scalar. All variants are fatal to a validation run.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The engine rejected the query at submit time.
    Submission { query: String, message: String },
    /// Checking status or fetching rows failed at the engine/transport.
    StatusCheck { handle: QueryHandle, message: String },
    /// The query reached `FAILED` or `CANCELLED`.
    ExecutionFailed {
        handle: QueryHandle,
        state: ExecutionState,
    },
    /// No terminal state was observed before the poll deadline.
    Timeout { handle: QueryHandle, waited: Duration },
    /// The result set had no data row / first cell.
    NoResult { handle: QueryHandle, reason: String },
    /// The first cell did not parse as the expected kind.
    TypeConversion {
        handle: QueryHandle,
        raw: String,
        expected: ScalarKind,
    },
}

impl QueryError {
    /// Stable machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Submission { .. } => "SUBMISSION_ERROR",
            QueryError::StatusCheck { .. } => "STATUS_CHECK_ERROR",
            QueryError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            QueryError::Timeout { .. } => "TIMEOUT",
            QueryError::NoResult { .. } => "NO_RESULT",
            QueryError::TypeConversion { .. } => "TYPE_CONVERSION_ERROR",
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Submission { query, message } => {
                write!(f, "query submission rejected: {message} (query: {query})")
            }
            QueryError::StatusCheck { handle, message } => {
                write!(f, "status check failed for query {handle}: {message}")
            }
            QueryError::ExecutionFailed { handle, state } => {
                write!(f, "query failed: {state}. query_execution_id: {handle}")
            }
            QueryError::Timeout { handle, waited } => write!(
                f,
                "query {handle} did not reach a terminal state within {}ms",
                waited.as_millis()
            ),
            QueryError::NoResult { handle, reason } => {
                write!(f, "no result for query {handle}: {reason}")
            }
            QueryError::TypeConversion {
                handle,
                raw,
                expected,
            } => write!(
                f,
                "query {handle} returned '{raw}', which is not a valid {}",
                expected.as_str()
            ),
        }
    }
}

impl std::error::Error for QueryError {}

// ---------------------------------------------------------------------------
// Executor trait
// ---------------------------------------------------------------------------

/// Query engine contract.
///
/// Object-safe so the engine can hold an `Arc<dyn QueryExecutor>`;
/// `Send + Sync` so handles can be awaited from concurrent tasks.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Human-readable engine name (e.g. `"http-gateway"`).
    fn engine_name(&self) -> &'static str;

    /// Start `query` against `dataset`. Returns as soon as the engine has
    /// accepted it.
    async fn submit(
        &self,
        query: &str,
        dataset: &str,
        output_location: &str,
    ) -> Result<QueryHandle, QueryError>;

    async fn status(&self, handle: &QueryHandle) -> Result<ExecutionState, QueryError>;

    /// All rows of a finished query, header row included.
    async fn result_rows(&self, handle: &QueryHandle) -> Result<Vec<ResultRow>, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Succeeded.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(ExecutionState::Cancelled.is_terminal());
    }

    #[test]
    fn state_parse_variants() {
        assert_eq!(ExecutionState::parse("queued"), Some(ExecutionState::Running));
        assert_eq!(ExecutionState::parse("SUCCEEDED"), Some(ExecutionState::Succeeded));
        assert_eq!(ExecutionState::parse("canceled"), Some(ExecutionState::Cancelled));
        assert_eq!(ExecutionState::parse("exploded"), None);
    }

    #[test]
    fn scalar_kind_parse() {
        assert_eq!(ScalarKind::Integer.parse(" 1000 "), Some(ScalarValue::Integer(1000)));
        assert_eq!(ScalarKind::Integer.parse("10.5"), None);
        assert_eq!(ScalarKind::Float.parse("50000.004"), Some(ScalarValue::Float(50000.004)));
        assert_eq!(ScalarKind::Float.parse("NaN"), None);
        assert_eq!(ScalarKind::Float.parse("inf"), None);
    }

    #[test]
    fn whole_floats_display_with_fraction() {
        assert_eq!(ScalarValue::Float(100.0).to_string(), "100.0");
        assert_eq!(ScalarValue::Float(100.5).to_string(), "100.5");
        assert_eq!(ScalarValue::Float(50000.004).to_string(), "50000.004");
        assert_eq!(ScalarValue::Integer(100).to_string(), "100");
    }

    #[test]
    fn execution_failed_display_names_state_and_id() {
        let err = QueryError::ExecutionFailed {
            handle: QueryHandle::new("q-42"),
            state: ExecutionState::Cancelled,
        };
        assert_eq!(err.to_string(), "query failed: CANCELLED. query_execution_id: q-42");
        assert_eq!(err.code(), "EXECUTION_FAILED");
    }
}
