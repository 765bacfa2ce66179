//! Warehouse API client: query submission and result polling.
//!
//! The warehouse executes SQL asynchronously: a `POST` to the execute
//! endpoint returns an execution identifier, and repeated `GET`s to the
//! results endpoint report the execution state until it is terminal.
//! All requests carry the API credential in the `X-Api-Key` header.
//!
//! The client does not loop or sleep -- pacing and timeout budgets belong
//! to the pipeline. It only performs single requests and classifies the
//! responses.

use chainpulse_types::ResultRow;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Provider state string for a completed execution.
const STATE_COMPLETED: &str = "QUERY_STATE_COMPLETED";

/// Provider state string for a failed execution.
const STATE_FAILED: &str = "QUERY_STATE_FAILED";

/// Marker the provider embeds in quota/datapoint-limit error payloads.
const QUOTA_MARKER: &str = "datapoint limit";

/// Status of a submitted execution as reported by the provider.
#[derive(Debug)]
pub enum ExecutionStatus {
    /// Terminal: the query completed with the given row sequence.
    Completed(Vec<ResultRow>),
    /// Terminal: the provider reported failure with this detail.
    Failed(String),
    /// Queued or still executing; poll again later.
    Pending,
}

/// HTTP client for the warehouse execute/results endpoints.
#[derive(Debug, Clone)]
pub struct WarehouseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    performance: String,
}

impl WarehouseClient {
    /// Create a client from engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            performance: config.performance.clone(),
        }
    }

    /// Submit one query for execution and return its execution identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] on transport failure,
    /// [`EngineError::QuotaExceeded`] when the provider reports a
    /// datapoint-limit error, and [`EngineError::Submission`] for any other
    /// rejection or malformed response.
    pub async fn submit(&self, sql: &str) -> Result<String, EngineError> {
        let url = format!("{}/sql/execute", self.base_url);
        let body = serde_json::json!({
            "sql": sql,
            "performance": self.performance,
        });

        let response = self
            .http
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Http(format!("submit request failed: {e}")))?;

        let status = response.status();
        let json: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Http(format!("submit response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(classify_submission(format!("{status}: {json}")));
        }

        extract_execution_id(&json)
    }

    /// Fetch the current status of one execution.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] on transport failure or an
    /// unreadable response body.
    pub async fn fetch_status(&self, execution_id: &str) -> Result<ExecutionStatus, EngineError> {
        let url = format!("{}/execution/{execution_id}/results", self.base_url);

        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| EngineError::Http(format!("results request failed: {e}")))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Http(format!("results response unreadable: {e}")))?;

        Ok(parse_status(&json))
    }
}

/// Pull the execution identifier out of a submission response, or classify
/// the provider's error payload.
fn extract_execution_id(json: &Value) -> Result<String, EngineError> {
    if let Some(id) = json.get("execution_id").and_then(Value::as_str) {
        return Ok(id.to_owned());
    }
    let detail = json.get("error").unwrap_or(json);
    Err(classify_submission(detail.to_string()))
}

/// Map a submission error message to the quota or generic variant.
fn classify_submission(message: String) -> EngineError {
    if message.contains(QUOTA_MARKER) {
        EngineError::QuotaExceeded(message)
    } else {
        EngineError::Submission(message)
    }
}

/// Map a terminal-failure message to the quota or remote-failure variant.
pub(crate) fn classify_failure(message: String) -> EngineError {
    if message.contains(QUOTA_MARKER) {
        EngineError::QuotaExceeded(message)
    } else {
        EngineError::RemoteFailed(message)
    }
}

/// Interpret a results-endpoint response body.
///
/// A `COMPLETED` state without a `result.rows` array is treated as still
/// pending: the provider reports completion slightly before result
/// materialization.
fn parse_status(json: &Value) -> ExecutionStatus {
    match json.get("state").and_then(Value::as_str) {
        Some(STATE_COMPLETED) => {
            match json
                .get("result")
                .and_then(|r| r.get("rows"))
                .and_then(Value::as_array)
            {
                Some(rows) => ExecutionStatus::Completed(
                    rows.iter()
                        .filter_map(Value::as_object)
                        .cloned()
                        .collect(),
                ),
                None => ExecutionStatus::Pending,
            }
        }
        Some(STATE_FAILED) => {
            let detail = json
                .get("error")
                .map_or_else(|| "unknown failure".to_owned(), Value::to_string);
            ExecutionStatus::Failed(detail)
        }
        _ => ExecutionStatus::Pending,
    }
}
