//! `relay config` — show the resolved configuration.
//!
//! Secrets are shown as set/unset, never echoed.

use relay::config::RelayConfig;

pub fn cmd_config(config: &RelayConfig) {
    println!("project_name:        {}", config.project_name);
    println!("environment:         {}", config.environment);
    println!("port:                {}", config.port);
    println!("auto_approve:        {}", config.auto_approve);
    println!("github_owner:        {}", display_opt(config.github_owner.as_deref()));
    println!("github_token:        {}", redact(config.github_token.as_deref()));
    println!("linear_api_key:      {}", redact(config.linear_api_key.as_deref()));
    println!("webhook_url:         {}", display_opt(config.webhook_url.as_deref()));
    println!("drive_folder_id:     {}", display_opt(config.drive_folder_id.as_deref()));
    println!("notification_email:  {}", display_opt(config.notification_email.as_deref()));
    println!("slack_webhook_url:   {}", redact(config.slack_webhook_url.as_deref()));
    println!("log_level:           {}", config.log_level);
}

fn display_opt(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

fn redact(value: Option<&str>) -> &'static str {
    match value {
        Some(_) => "(set)",
        None => "(unset)",
    }
}
