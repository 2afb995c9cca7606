//! HTTP query gateway client.
//!
//! Speaks to a small REST facade in front of the query engine:
//!
//! | call          | request                              | response                                  |
//! |---------------|--------------------------------------|-------------------------------------------|
//! | submit        | `POST /v1/queries`                   | `{"query_execution_id": "..."}`           |
//! | status        | `GET /v1/queries/{id}`               | `{"state": "RUNNING", "state_change_reason": "..."}` |
//! | result rows   | `GET /v1/queries/{id}/results`       | `{"rows": [["_col0"], ["1000"]]}`         |
//!
//! Non-2xx responses carry `{"message": "..."}`. The API token is passed in
//! by the caller (see lc-config secrets); do not log it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ExecutionState, QueryError, QueryExecutor, QueryHandle, ResultRow};

#[derive(Clone)]
pub struct HttpQueryExecutor {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl std::fmt::Debug for HttpQueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpQueryExecutor")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    query: &'a str,
    database: &'a str,
    output_location: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    query_execution_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: String,
    #[serde(default)]
    state_change_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    rows: Vec<ResultRow>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpQueryExecutor {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// Best-effort extraction of `{"message": ...}` from an error response.
    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        let body: ErrorBody = resp.json().await.unwrap_or_default();
        match body.message {
            Some(m) => format!("http {} {}", status.as_u16(), m),
            None => format!("http {}", status.as_u16()),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        handle: &QueryHandle,
        path: String,
    ) -> Result<T, QueryError> {
        let status_err = |message: String| QueryError::StatusCheck {
            handle: handle.clone(),
            message,
        };

        let resp = self
            .authorize(self.http.get(self.url(&path)))
            .send()
            .await
            .map_err(|e| status_err(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(status_err(Self::error_message(resp).await));
        }

        resp.json::<T>()
            .await
            .map_err(|e| status_err(format!("response json decode failed: {e}")))
    }
}

#[async_trait::async_trait]
impl QueryExecutor for HttpQueryExecutor {
    fn engine_name(&self) -> &'static str {
        "http-gateway"
    }

    async fn submit(
        &self,
        query: &str,
        dataset: &str,
        output_location: &str,
    ) -> Result<QueryHandle, QueryError> {
        let rejected = |message: String| QueryError::Submission {
            query: query.to_string(),
            message,
        };

        let body = SubmitRequest {
            query,
            database: dataset,
            output_location,
        };
        let resp = self
            .authorize(self.http.post(self.url("queries")))
            .json(&body)
            .send()
            .await
            .map_err(|e| rejected(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(rejected(Self::error_message(resp).await));
        }

        let parsed: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| rejected(format!("response json decode failed: {e}")))?;
        if parsed.query_execution_id.trim().is_empty() {
            return Err(rejected("engine returned an empty query_execution_id".to_string()));
        }

        let handle = QueryHandle::new(parsed.query_execution_id);
        info!(query_id = %handle, dataset, "query submitted");
        Ok(handle)
    }

    async fn status(&self, handle: &QueryHandle) -> Result<ExecutionState, QueryError> {
        let body: StatusResponse = self
            .get_json(handle, format!("queries/{}", handle.as_str()))
            .await?;

        let state = ExecutionState::parse(&body.state).ok_or_else(|| QueryError::StatusCheck {
            handle: handle.clone(),
            message: format!("unknown execution state '{}'", body.state),
        })?;

        if matches!(state, ExecutionState::Failed | ExecutionState::Cancelled) {
            warn!(
                query_id = %handle,
                state = %state,
                reason = body.state_change_reason.as_deref().unwrap_or("unknown"),
                "query did not succeed"
            );
        }
        Ok(state)
    }

    async fn result_rows(&self, handle: &QueryHandle) -> Result<Vec<ResultRow>, QueryError> {
        let body: ResultsResponse = self
            .get_json(handle, format!("queries/{}/results", handle.as_str()))
            .await?;
        Ok(body.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let ex = HttpQueryExecutor::new("http://localhost:8080/", None);
        assert_eq!(ex.url("queries"), "http://localhost:8080/v1/queries");
    }

    #[test]
    fn debug_redacts_token() {
        let ex = HttpQueryExecutor::new("http://gw", Some("tok-123".to_string()));
        let dbg = format!("{ex:?}");
        assert!(!dbg.contains("tok-123"));
        assert!(dbg.contains("<REDACTED>"));
    }
}
