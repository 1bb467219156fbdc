//! Event routing and transition orchestration.
//!
//! The router owns the dispatch table over event kinds and drives the
//! side effects the policy decision calls for: on auto-proceed it
//! triggers CI automation and sends an info notification; on manual
//! approval it notifies only. Each inbound event is handled
//! independently within its own request; the only shared state is the
//! immutable configuration and the dispatcher/notifier handles.
//!
//! Replayed deliveries are safe at the decision level — the policy is
//! pure — but at-most-once dispatch per logical transition is delegated
//! to the CI system's own idempotency; this core keeps no dedup state.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::dispatch::Dispatcher;
use crate::event::{InitPayload, IssuePayload, ProvisionedResources, StageEvent};
use crate::notify::{Notifier, Severity};
use crate::policy::{TransitionDecision, evaluate};
use crate::stage::{StageId, extract_stage_token};

/// Why an event was acknowledged without pipeline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    EventTypeNotHandled,
    NotPipelineIssue,
}

/// Response returned to the webhook caller, reflecting the decision.
/// Serializes with a `status` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouterResponse {
    Initialized {
        #[serde(skip_serializing_if = "Option::is_none")]
        project: Option<String>,
        resources: ProvisionedResources,
        timestamp: DateTime<Utc>,
    },
    Ignored {
        reason: IgnoreReason,
    },
    Processed {
        stage: StageId,
    },
    PipelineCompleted {
        completed_stage: StageId,
    },
    AutoProceeded {
        completed_stage: StageId,
        next_stage: StageId,
        automation_triggered: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        dispatch_error: Option<String>,
    },
    AwaitingApproval {
        completed_stage: StageId,
        next_stage: StageId,
        requires_manual_approval: bool,
    },
    Acknowledged,
}

/// Classifies events and runs the transition engine.
pub struct EventRouter {
    config: Arc<RelayConfig>,
    dispatcher: Arc<dyn Dispatcher>,
    notifier: Arc<dyn Notifier>,
}

impl EventRouter {
    pub fn new(
        config: Arc<RelayConfig>,
        dispatcher: Arc<dyn Dispatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            notifier,
        }
    }

    /// Route a normalized event to its handler.
    ///
    /// Only issue updates can move the pipeline; creates, comments, and
    /// label changes are acknowledged as reserved extension points.
    pub async fn route(&self, event: StageEvent) -> Result<RouterResponse> {
        match event {
            StageEvent::Initialize(init) => self.handle_initialize(init).await,
            StageEvent::IssueUpdate(issue) => self.handle_issue_update(issue).await,
            StageEvent::IssueCreate(issue) => {
                info!(title = %issue.title, "new issue created");
                Ok(RouterResponse::Acknowledged)
            }
            StageEvent::CommentCreate(comment) => {
                info!(body = %excerpt(&comment.body, 100), "new comment");
                Ok(RouterResponse::Acknowledged)
            }
            StageEvent::LabelChange => {
                info!("issue label changed");
                Ok(RouterResponse::Acknowledged)
            }
            StageEvent::Unhandled { kind, action } => {
                info!(%kind, %action, "unhandled event");
                Ok(RouterResponse::Ignored {
                    reason: IgnoreReason::EventTypeNotHandled,
                })
            }
        }
    }

    async fn handle_initialize(&self, init: InitPayload) -> Result<RouterResponse> {
        let project = init.project_name.as_deref().unwrap_or("n/a");
        info!(project, "processing pipeline initialization");

        let message = format!(
            "Pipeline {} initialized.\n\nResources:\n- Drive: {}\n- GitHub: {}\n\nTeam:\n- Product owner: {}\n- AI agents: {}\n\nTrack progress in the issue tracker; the first stage starts with L1.",
            project,
            init.resources.drive_url.as_deref().unwrap_or("n/a"),
            init.resources.github_url.as_deref().unwrap_or("n/a"),
            init.team.product_owner.as_deref().unwrap_or("n/a"),
            init.team
                .agents_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        );
        self.notifier
            .notify("Pipeline initialized", &message, Severity::Success)
            .await;

        Ok(RouterResponse::Initialized {
            project: init.project_name,
            resources: init.resources,
            timestamp: Utc::now(),
        })
    }

    async fn handle_issue_update(&self, issue: IssuePayload) -> Result<RouterResponse> {
        let state = issue.state_name().to_string();
        info!(title = %issue.title, %state, id = ?issue.id, "issue updated");

        let Some(token) = extract_stage_token(&issue.title) else {
            info!("issue is not a pipeline issue");
            return Ok(RouterResponse::Ignored {
                reason: IgnoreReason::NotPipelineIssue,
            });
        };

        // A token outside the sequence is a data inconsistency, not
        // pipeline completion; log it and fail open.
        let stage: StageId = match token.parse() {
            Ok(stage) => stage,
            Err(err) => {
                warn!(%token, %err, "stage token not in pipeline sequence");
                return Ok(RouterResponse::Ignored {
                    reason: IgnoreReason::NotPipelineIssue,
                });
            }
        };

        match evaluate(stage, &state, &self.config.auto_approve) {
            TransitionDecision::Processed { stage } => {
                Ok(RouterResponse::Processed { stage })
            }
            TransitionDecision::PipelineFinished { stage } => {
                info!(%stage, "pipeline complete");
                self.notifier
                    .notify(
                        &format!("Pipeline {} complete", self.config.project_name),
                        "All 9 stages finished successfully.",
                        Severity::Success,
                    )
                    .await;
                Ok(RouterResponse::PipelineCompleted {
                    completed_stage: stage,
                })
            }
            TransitionDecision::AutoProceeded { from, to } => {
                info!(%from, %to, "auto-proceeding to next stage");
                let result = self
                    .dispatcher
                    .trigger(&self.config.project_name, to, Some(from))
                    .await;

                let agent = to.agent();
                self.notifier
                    .notify(
                        &format!("Stage {} started automatically", to),
                        &format!(
                            "{} {} is now working on stage {}.",
                            agent.emoji, agent.name, to
                        ),
                        Severity::Info,
                    )
                    .await;

                Ok(RouterResponse::AutoProceeded {
                    completed_stage: from,
                    next_stage: to,
                    automation_triggered: result.is_ok(),
                    dispatch_error: result.failure_reason().map(str::to_string),
                })
            }
            TransitionDecision::AwaitingApproval { from, to } => {
                info!(%from, %to, "next stage requires manual approval");
                let agent = to.agent();
                self.notifier
                    .notify(
                        &format!("Approval required - {}", to),
                        &format!(
                            "{} {} is waiting for your approval to start {}.",
                            agent.emoji, agent.name, to
                        ),
                        Severity::Warning,
                    )
                    .await;
                Ok(RouterResponse::AwaitingApproval {
                    completed_stage: from,
                    next_stage: to,
                    requires_manual_approval: true,
                })
            }
        }
    }
}

/// First `max` characters of a string, respecting char boundaries.
fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
