use anyhow::Result;
use clap::{Parser, Subcommand};
use relaybot_api::{AppState, BrokerRegistry, DEFAULT_WEBHOOK_PATH};
use relaybot_brokers_crypto::{ExchangeBroker, ExchangeConfig};
use relaybot_brokers_metatrader::{TerminalBroker, TerminalConfig};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "relaybot")]
#[command(about = "Webhook signal relay — forwards trading alerts to broker backends")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Webhook path (the obscure path is the only authentication)
        #[arg(long, default_value = DEFAULT_WEBHOOK_PATH)]
        webhook_path: String,

        /// MT5 EA bridge host
        #[arg(long, env = "MT5_BRIDGE_HOST", default_value = "127.0.0.1")]
        mt5_host: String,

        /// MT5 EA bridge port
        #[arg(long, env = "MT5_BRIDGE_PORT", default_value = "5556")]
        mt5_port: u16,

        /// Exchange API key
        #[arg(long, env = "EXCHANGE_API_KEY", hide_env_values = true)]
        exchange_api_key: Option<String>,

        /// Exchange API secret
        #[arg(long, env = "EXCHANGE_API_SECRET", hide_env_values = true)]
        exchange_api_secret: Option<String>,

        /// Exchange REST base URL override (testnet, proxy)
        #[arg(long, env = "EXCHANGE_BASE_URL")]
        exchange_base_url: Option<String>,
    },

    /// List supported broker codes
    Brokers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Serve {
            bind,
            webhook_path,
            mt5_host,
            mt5_port,
            exchange_api_key,
            exchange_api_secret,
            exchange_base_url,
        } => {
            serve(
                bind,
                webhook_path,
                mt5_host,
                mt5_port,
                exchange_api_key,
                exchange_api_secret,
                exchange_base_url,
            )
            .await?;
        }
        Commands::Brokers => {
            println!("Supported broker codes:");
            println!("  M - MetaTrader 5 terminal (EA bridge, equity/10000 lot sizing)");
            println!("  B - Futures exchange (signed REST, 10% of wallet balance)");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn serve(
    bind: String,
    webhook_path: String,
    mt5_host: String,
    mt5_port: u16,
    exchange_api_key: Option<String>,
    exchange_api_secret: Option<String>,
    exchange_base_url: Option<String>,
) -> Result<()> {
    let mut registry = BrokerRegistry::new();

    let terminal = Arc::new(TerminalBroker::new(TerminalConfig {
        host: mt5_host,
        port: mt5_port,
    }));
    // A dead bridge is tolerated at startup: exchange signals still flow,
    // terminal signals fail loudly in the logs.
    match terminal.connect().await {
        Ok(account) => {
            tracing::info!(
                balance = %account.balance,
                equity = %account.equity,
                "MT5 bridge connected"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "MT5 bridge connection failed");
        }
    }
    registry = registry.register("M", terminal);

    match (exchange_api_key, exchange_api_secret) {
        (Some(key), Some(secret)) => {
            let mut config = ExchangeConfig::new(key, secret);
            if let Some(url) = exchange_base_url {
                config = config.with_base_url(url);
            }
            registry = registry.register("B", Arc::new(ExchangeBroker::new(config)));
        }
        _ => {
            tracing::warn!("Exchange credentials not set, broker code B disabled");
        }
    }

    let state = Arc::new(AppState::new(registry));
    relaybot_api::start_server(state, &bind, &webhook_path).await
}
