pub mod cli;
pub mod client;
pub mod core;
pub mod providers;
pub mod scheduler;
pub mod server;

use crate::client::BackendClient;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Run the conversion service.
    Serve,
    /// List the currencies the service knows about.
    Currencies,
    Convert {
        amount: String,
        from: String,
        to: String,
    },
    ManualConvert {
        amount: String,
        rate: String,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = AppConfig::load_or_default(config_path)?;
    debug!("Loaded config: {:?}", redacted(&config));

    match command {
        AppCommand::Serve => {
            info!(
                base = %config.base_currency,
                refresh_secs = config.refresh_interval_secs,
                "Currency service starting..."
            );
            server::run_server(config).await
        }
        AppCommand::Currencies => {
            let client = BackendClient::from_config(&config.client)?;
            cli::currencies::show_currencies(&client).await
        }
        AppCommand::Convert { amount, from, to } => {
            let client = BackendClient::from_config(&config.client)?;
            cli::convert::convert(&client, &amount, &from, &to).await
        }
        AppCommand::ManualConvert { amount, rate } => {
            let client = BackendClient::from_config(&config.client)?;
            cli::convert::manual_convert(&client, &amount, &rate).await
        }
    }
}

fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if !config.provider.api_key.is_empty() {
        config.provider.api_key = "***".to_string();
    }
    config
}
