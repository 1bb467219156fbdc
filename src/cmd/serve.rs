//! `relay serve` — run the webhook server.

use anyhow::Result;

use relay::config::RelayConfig;
use relay::server;

pub async fn cmd_serve(mut config: RelayConfig, port_override: Option<u16>) -> Result<()> {
    if let Some(port) = port_override {
        config.port = port;
    }
    server::start_server(config).await
}
