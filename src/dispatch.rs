//! CI automation dispatch.
//!
//! Builds and sends a single workflow-dispatch request against the CI
//! system for a given stage. One attempt, no retry, no backoff: the
//! orchestration layer treats a failed dispatch as non-fatal to the
//! webhook response but surfaces it in the returned payload so operators
//! can see it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::stage::StageId;

/// Base URL of the CI system's REST API.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Workflow file invoked for every stage; stage identity travels in the
/// dispatch inputs, not the workflow name.
const WORKFLOW_FILE: &str = "llm-pipeline-auto.yml";

/// Bound on the outbound call; nothing here suspends indefinitely.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a single workflow-dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Ok,
    Failed { reason: String },
}

impl DispatchResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, DispatchResult::Ok)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DispatchResult::Ok => None,
            DispatchResult::Failed { reason } => Some(reason),
        }
    }

    /// Map a remote response to a result. 204 ("accepted, no content") is
    /// the only success status; anything else keeps the observed status
    /// and body for logging.
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 204 {
            DispatchResult::Ok
        } else {
            DispatchResult::Failed {
                reason: format!("HTTP {}: {}", status, body.trim()),
            }
        }
    }
}

/// Seam between the router and the CI system, so transition handling is
/// unit-testable without network access.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn trigger(
        &self,
        project: &str,
        stage: StageId,
        previous: Option<StageId>,
    ) -> DispatchResult;
}

/// Repository coordinate derived from the project name.
pub fn repo_slug(project: &str) -> String {
    format!("llm-app-{}", project.to_lowercase().replace('_', "-"))
}

#[derive(Debug, Serialize)]
struct WorkflowDispatch {
    #[serde(rename = "ref")]
    git_ref: &'static str,
    inputs: WorkflowInputs,
}

/// Inputs attached to the workflow-dispatch request. All values are
/// strings — workflow-dispatch inputs are untyped on the wire.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WorkflowInputs {
    pub stage: String,
    pub project_name: String,
    pub previous_stage: String,
    pub auto_triggered: String,
    pub triggered_by: String,
    pub timestamp: String,
}

/// Build the dispatch inputs for a stage transition. Pure; the timestamp
/// is injected by the caller.
pub fn build_inputs(
    project: &str,
    stage: StageId,
    previous: Option<StageId>,
    timestamp: DateTime<Utc>,
) -> WorkflowInputs {
    WorkflowInputs {
        stage: stage.to_string(),
        project_name: project.to_string(),
        previous_stage: previous.map(|s| s.to_string()).unwrap_or_default(),
        auto_triggered: "true".to_string(),
        triggered_by: "webhook".to_string(),
        timestamp: timestamp.to_rfc3339(),
    }
}

/// Dispatcher backed by the CI system's workflow-dispatch endpoint.
pub struct WorkflowDispatcher {
    client: reqwest::Client,
    api_base: String,
    owner: Option<String>,
    token: Option<String>,
}

impl WorkflowDispatcher {
    pub fn new(owner: Option<String>, token: Option<String>) -> Self {
        Self::with_api_base(GITHUB_API_URL, owner, token)
    }

    /// Same dispatcher against a different API base; used by tests.
    pub fn with_api_base(
        api_base: impl Into<String>,
        owner: Option<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            owner,
            token,
        }
    }
}

#[async_trait]
impl Dispatcher for WorkflowDispatcher {
    async fn trigger(
        &self,
        project: &str,
        stage: StageId,
        previous: Option<StageId>,
    ) -> DispatchResult {
        let (Some(owner), Some(token)) = (&self.owner, &self.token) else {
            warn!("CI credentials not configured, dispatch skipped");
            return DispatchResult::Failed {
                reason: "CI credentials not configured".to_string(),
            };
        };

        let url = format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            self.api_base,
            owner,
            repo_slug(project),
            WORKFLOW_FILE
        );
        let body = WorkflowDispatch {
            git_ref: "main",
            inputs: build_inputs(project, stage, previous, Utc::now()),
        };

        debug!(%url, %stage, "dispatching workflow");

        match self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "relay-webhook")
            .timeout(DISPATCH_TIMEOUT)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                let result = DispatchResult::from_response(status, &text);
                match &result {
                    DispatchResult::Ok => info!(%stage, "workflow dispatch accepted"),
                    DispatchResult::Failed { reason } => {
                        error!(%stage, %reason, "workflow dispatch rejected")
                    }
                }
                result
            }
            Err(err) => {
                error!(%stage, error = %err, "workflow dispatch request failed");
                DispatchResult::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── repo_slug ────────────────────────────────────────────────────

    #[test]
    fn test_repo_slug_lowercases_and_replaces_underscores() {
        assert_eq!(repo_slug("My_Project"), "llm-app-my-project");
    }

    #[test]
    fn test_repo_slug_passes_through_simple_names() {
        assert_eq!(repo_slug("acme"), "llm-app-acme");
        assert_eq!(repo_slug("already-hyphenated"), "llm-app-already-hyphenated");
    }

    // ── DispatchResult ───────────────────────────────────────────────

    #[test]
    fn test_accepted_status_maps_to_ok() {
        assert_eq!(DispatchResult::from_response(204, ""), DispatchResult::Ok);
    }

    #[test]
    fn test_other_statuses_map_to_failed_with_status_and_body() {
        let result = DispatchResult::from_response(404, "{\"message\":\"Not Found\"}");
        let reason = result.failure_reason().unwrap();
        assert!(reason.contains("404"));
        assert!(reason.contains("Not Found"));
    }

    #[test]
    fn test_success_status_other_than_204_is_still_failed() {
        // The contract is "accepted, no content" specifically.
        let result = DispatchResult::from_response(200, "ok");
        assert!(!result.is_ok());
        assert!(result.failure_reason().unwrap().contains("200"));
    }

    // ── build_inputs ─────────────────────────────────────────────────

    #[test]
    fn test_inputs_carry_stage_project_and_previous() {
        let ts = DateTime::parse_from_rfc3339("2025-10-18T14:50:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let inputs = build_inputs("acme", StageId::L5, Some(StageId::L4), ts);
        assert_eq!(inputs.stage, "L5");
        assert_eq!(inputs.project_name, "acme");
        assert_eq!(inputs.previous_stage, "L4");
        assert_eq!(inputs.auto_triggered, "true");
        assert_eq!(inputs.triggered_by, "webhook");
        assert_eq!(inputs.timestamp, "2025-10-18T14:50:00+00:00");
    }

    #[test]
    fn test_inputs_without_previous_stage_use_empty_string() {
        let inputs = build_inputs("acme", StageId::L1, None, Utc::now());
        assert_eq!(inputs.previous_stage, "");
    }

    #[test]
    fn test_dispatch_body_serializes_ref_keyword() {
        let body = WorkflowDispatch {
            git_ref: "main",
            inputs: build_inputs("acme", StageId::L3, Some(StageId::L2), Utc::now()),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["ref"], "main");
        assert_eq!(value["inputs"]["stage"], "L3");
        assert_eq!(value["inputs"]["previous_stage"], "L2");
    }

    // ── WorkflowDispatcher ───────────────────────────────────────────

    #[tokio::test]
    async fn test_trigger_without_credentials_fails_without_network() {
        let dispatcher = WorkflowDispatcher::new(None, None);
        let result = dispatcher.trigger("acme", StageId::L3, Some(StageId::L2)).await;
        assert!(
            result
                .failure_reason()
                .unwrap()
                .contains("not configured")
        );
    }

    #[tokio::test]
    async fn test_trigger_with_token_but_no_owner_fails() {
        let dispatcher = WorkflowDispatcher::new(None, Some("ghp_token".to_string()));
        let result = dispatcher.trigger("acme", StageId::L3, None).await;
        assert!(!result.is_ok());
    }
}
