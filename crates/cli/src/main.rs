use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay chat messages to a local Ollama model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the Telegram bot (long polling). Requires TELEGRAM_BOT_TOKEN.
    Telegram {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the Messenger webhook server (GET/POST /webhook, GET / for health).
    Webhook {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 5000)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Secrets usually live in a .env next to the binary; a missing file is fine.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Telegram { config }) => {
            if let Err(e) = run_telegram(config).await {
                log::error!("telegram bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Webhook { config, port }) => {
            if let Err(e) = run_webhook(config, port).await {
                log::error!("webhook server failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_telegram(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = relay_core::config::load_config(config_path)?;
    log::info!("starting telegram bot");
    relay_core::polling::run_polling(config).await
}

async fn run_webhook(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = relay_core::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting webhook server on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    relay_core::gateway::run_gateway(config).await
}
