//! Runtime configuration for relay.
//!
//! The environment is read exactly once, at startup, into an immutable
//! `RelayConfig` that is passed into each component by `Arc`. Business
//! logic never reads the process environment. Validation happens here:
//! a bad auto-approve list or port is a startup error, never a
//! mid-request surprise.

use crate::errors::ConfigError;
use crate::policy::AutoApproveSet;

pub const DEFAULT_PORT: u16 = 8080;

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Project this deployment orchestrates.
    pub project_name: String,
    /// Environment tag; outside "production", internal error detail is
    /// echoed to callers.
    pub environment: String,
    /// Issue-tracker API key (reserved for tracker write-backs).
    pub linear_api_key: Option<String>,
    /// CI credentials for workflow dispatch.
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    /// Public URL this webhook is reachable at; informational.
    pub webhook_url: Option<String>,
    /// Storage folder backing the project's documents; informational.
    pub drive_folder_id: Option<String>,
    /// Stages entered without human sign-off.
    pub auto_approve: AutoApproveSet,
    pub notification_email: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub log_level: String,
    pub port: u16,
}

impl RelayConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. `from_env` is a
    /// thin wrapper; tests supply a map instead of mutating the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // An explicitly empty list disables auto-approval entirely; only
        // an unset variable falls back to the default set.
        let auto_approve = match lookup("AUTO_APPROVE_STAGES") {
            Some(list) => AutoApproveSet::parse(&list)?,
            None => AutoApproveSet::default(),
        };

        let port = match non_empty(lookup("PORT")) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidPort {
                    value: value.clone(),
                    source,
                })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            project_name: non_empty(lookup("PROJECT_NAME"))
                .unwrap_or_else(|| "unknown".to_string()),
            environment: non_empty(lookup("ENVIRONMENT"))
                .unwrap_or_else(|| "production".to_string()),
            linear_api_key: non_empty(lookup("LINEAR_API_KEY")),
            github_token: non_empty(lookup("GITHUB_TOKEN")),
            github_owner: non_empty(lookup("GITHUB_OWNER")),
            webhook_url: non_empty(lookup("WEBHOOK_URL")),
            drive_folder_id: non_empty(lookup("DRIVE_FOLDER_ID")),
            auto_approve,
            notification_email: non_empty(lookup("NOTIFICATION_EMAIL")),
            slack_webhook_url: non_empty(lookup("SLACK_WEBHOOK_URL")),
            log_level: non_empty(lookup("LOG_LEVEL")).unwrap_or_else(|| "info".to_string()),
            port,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Treat unset and empty-string environment values the same way.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
