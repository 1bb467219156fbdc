//! Inbound event model.
//!
//! Webhook deliveries arrive as a `{type, action, data}` envelope whose
//! `data` member varies per event kind. `StageEvent::classify` turns the
//! envelope into a normalized event for the router; a recognized event
//! kind with an unusable `data` shape is a malformed-input error and is
//! rejected before any side effect. Events are request-scoped values —
//! nothing here is persisted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EventError;

/// Raw webhook envelope as delivered by the issue tracker.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Issue workflow state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssueState {
    #[serde(default)]
    pub name: String,
}

/// The issue fields the transition engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssuePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: Option<IssueState>,
}

impl IssuePayload {
    pub fn state_name(&self) -> &str {
        self.state.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }
}

/// A comment on an issue. Bodies are logged but not parsed for commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TeamInfo {
    #[serde(default)]
    pub product_owner: Option<String>,
    #[serde(default)]
    pub agents_count: Option<u32>,
}

/// Resources provisioned during pipeline initialization; echoed back in
/// the response and summarized in the initialization notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProvisionedResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InitPayload {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub team: TeamInfo,
    #[serde(default)]
    pub resources: ProvisionedResources,
}

/// Normalized inbound event, classified by (event type, action).
///
/// Only `IssueUpdate` can move the pipeline; every other kind is inert
/// with respect to pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Initialize(InitPayload),
    IssueUpdate(IssuePayload),
    IssueCreate(IssuePayload),
    CommentCreate(CommentPayload),
    LabelChange,
    Unhandled { kind: String, action: String },
}

impl StageEvent {
    /// Classify a raw envelope into a normalized event.
    ///
    /// Unrecognized (type, action) pairs are not errors — they become
    /// `Unhandled` and are acknowledged downstream. A recognized pair
    /// with a `data` member of the wrong shape is malformed input.
    pub fn classify(envelope: WebhookEnvelope) -> Result<StageEvent, EventError> {
        let WebhookEnvelope { kind, action, data } = envelope;
        // Tolerate an absent data member; payload fields all default.
        let data = if data.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            data
        };

        match (kind.as_str(), action.as_str()) {
            ("InitializePipeline", _) => {
                Ok(StageEvent::Initialize(parse_payload("initialization", data)?))
            }
            ("Issue", "update") => Ok(StageEvent::IssueUpdate(parse_payload("issue", data)?)),
            ("Issue", "create") => Ok(StageEvent::IssueCreate(parse_payload("issue", data)?)),
            ("Comment", "create") => {
                Ok(StageEvent::CommentCreate(parse_payload("comment", data)?))
            }
            ("IssueLabel", _) => Ok(StageEvent::LabelChange),
            _ => Ok(StageEvent::Unhandled {
                kind: kind.clone(),
                action: action.clone(),
            }),
        }
    }
}

fn parse_payload<T: DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, EventError> {
    serde_json::from_value(data).map_err(|source| EventError::MalformedPayload { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(kind: &str, action: &str, data: Value) -> WebhookEnvelope {
        WebhookEnvelope {
            kind: kind.to_string(),
            action: action.to_string(),
            data,
        }
    }

    #[test]
    fn test_issue_update_classification() {
        let event = StageEvent::classify(envelope(
            "Issue",
            "update",
            serde_json::json!({
                "id": "abc-123",
                "title": "L3: Design spec",
                "state": {"name": "Done"},
            }),
        ))
        .unwrap();

        match event {
            StageEvent::IssueUpdate(issue) => {
                assert_eq!(issue.id.as_deref(), Some("abc-123"));
                assert_eq!(issue.title, "L3: Design spec");
                assert_eq!(issue.state_name(), "Done");
            }
            other => panic!("Expected IssueUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_issue_create_classification() {
        let event = StageEvent::classify(envelope(
            "Issue",
            "create",
            serde_json::json!({"title": "L1: Requirements"}),
        ))
        .unwrap();
        assert!(matches!(event, StageEvent::IssueCreate(_)));
    }

    #[test]
    fn test_initialize_classification_ignores_action() {
        let event = StageEvent::classify(envelope(
            "InitializePipeline",
            "whatever",
            serde_json::json!({
                "project_name": "acme",
                "team": {"product_owner": "Dana", "agents_count": 9},
                "resources": {"github_repo": "llm-app-acme"},
            }),
        ))
        .unwrap();

        match event {
            StageEvent::Initialize(init) => {
                assert_eq!(init.project_name.as_deref(), Some("acme"));
                assert_eq!(init.team.agents_count, Some(9));
                assert_eq!(init.resources.github_repo.as_deref(), Some("llm-app-acme"));
            }
            other => panic!("Expected Initialize, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_create_classification() {
        let event = StageEvent::classify(envelope(
            "Comment",
            "create",
            serde_json::json!({"body": "looks good"}),
        ))
        .unwrap();
        assert_eq!(
            event,
            StageEvent::CommentCreate(CommentPayload {
                body: "looks good".to_string()
            })
        );
    }

    #[test]
    fn test_label_event_classification_carries_no_payload() {
        let event =
            StageEvent::classify(envelope("IssueLabel", "update", serde_json::json!({})))
                .unwrap();
        assert_eq!(event, StageEvent::LabelChange);
    }

    #[test]
    fn test_unknown_pairs_are_unhandled_not_errors() {
        for (kind, action) in [
            ("Issue", "delete"),
            ("Comment", "update"),
            ("Project", "update"),
            ("", ""),
        ] {
            let event =
                StageEvent::classify(envelope(kind, action, serde_json::json!({}))).unwrap();
            match event {
                StageEvent::Unhandled { kind: k, action: a } => {
                    assert_eq!(k, kind);
                    assert_eq!(a, action);
                }
                other => panic!("Expected Unhandled for {}/{}, got {:?}", kind, action, other),
            }
        }
    }

    #[test]
    fn test_missing_data_member_defaults() {
        let event = StageEvent::classify(envelope("Issue", "update", Value::Null)).unwrap();
        match event {
            StageEvent::IssueUpdate(issue) => {
                assert_eq!(issue.title, "");
                assert_eq!(issue.state_name(), "");
            }
            other => panic!("Expected IssueUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_payload_shape_is_malformed() {
        let err = StageEvent::classify(envelope(
            "Issue",
            "update",
            serde_json::json!({"title": 42}),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("issue"));
    }

    #[test]
    fn test_envelope_deserializes_with_defaults() {
        let envelope: WebhookEnvelope = serde_json::from_str("{}").unwrap();
        assert_eq!(envelope.kind, "");
        assert_eq!(envelope.action, "");
        assert!(envelope.data.is_null());
    }

    #[test]
    fn test_resources_roundtrip_skips_absent_fields() {
        let resources = ProvisionedResources {
            github_repo: Some("llm-app-acme".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&resources).unwrap();
        assert_eq!(value, serde_json::json!({"github_repo": "llm-app-acme"}));
    }
}
