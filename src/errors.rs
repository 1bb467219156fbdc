//! Typed error hierarchy for the relay orchestrator.
//!
//! Three error types cover the failure surfaces that cross module
//! boundaries:
//! - `StageParseError` — a stage token that is not in the pipeline sequence
//! - `EventError` — a recognized webhook event with an unusable payload
//! - `ConfigError` — startup configuration validation failures
//!
//! Dispatch failures are not errors at the type level: they are carried as
//! `DispatchResult::Failed` inside a successful response, because a failed
//! CI trigger must not make the webhook caller retry the whole event.

use thiserror::Error;

/// A stage token that does not name a stage in the pipeline sequence.
///
/// This is deliberately a different condition from "the stage is the last
/// one" (`StageId::next()` returning `None`): callers must never report a
/// malformed stage name as pipeline completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage '{0}' is not in the pipeline sequence")]
pub struct StageParseError(pub String);

/// Errors from normalizing an inbound webhook event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from startup configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid stage '{entry}' in AUTO_APPROVE_STAGES")]
    InvalidAutoApproveStage {
        entry: String,
        #[source]
        source: StageParseError,
    },

    #[error("invalid PORT value '{value}'")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
