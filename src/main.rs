use anyhow::Result;
use clap::{Parser, Subcommand};

use relay::config::RelayConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "relay")]
#[command(version, about = "Webhook-driven pipeline stage orchestrator")]
pub struct Cli {
    /// Override the port the webhook server listens on
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server
    Serve,
    /// Manually trigger CI automation for a stage
    Trigger {
        /// Stage to trigger (L1..L9)
        stage: String,

        /// Project name (defaults to the configured PROJECT_NAME)
        #[arg(short = 'P', long)]
        project: Option<String>,

        /// Stage that preceded this one, recorded in the dispatch inputs
        #[arg(long)]
        previous: Option<String>,
    },
    /// Show the resolved configuration
    Config,
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = RelayConfig::from_env()?;
    init_tracing(&config.log_level);

    match &cli.command {
        Commands::Serve => cmd::cmd_serve(config, cli.port).await?,
        Commands::Trigger {
            stage,
            project,
            previous,
        } => {
            cmd::cmd_trigger(&config, stage, project.as_deref(), previous.as_deref()).await?;
        }
        Commands::Config => cmd::cmd_config(&config),
    }

    Ok(())
}
