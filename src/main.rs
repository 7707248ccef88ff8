mod chat;
mod console;
mod http_client;
mod mistral;
mod model;

use std::sync::Arc;

use clap::Parser;
use chat::{SessionSettings, ToolNameTable};
use mistral::provider::MistralProvider;
use model::arg::Args;
use model::config::{API_KEY_ENV, Config};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging; stderr keeps log lines out of the chat output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let config = Config::load(&config_path)
        .unwrap_or_else(|e| {
            tracing::error!("Failed to load config: {:#}", e);
            std::process::exit(1);
        })
        .with_env_fallbacks();
    if let Some(path) = config.config_path() {
        tracing::debug!("Using config file {}", path.display());
    }

    if config.api_key.is_none() {
        tracing::error!("apiKey not set in config file and {} is empty", API_KEY_ENV);
        std::process::exit(1);
    }

    if let Some(proxy_url) = &config.proxy_url {
        tracing::info!("HTTP proxy configured: {}", proxy_url);
    }

    let provider = MistralProvider::new(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to create conversation client: {:#}", e);
        std::process::exit(1);
    });
    let provider = Arc::new(provider);

    let result = if args.list {
        console::list_conversations(provider.as_ref()).await
    } else {
        console::run(
            provider,
            ToolNameTable::with_overrides(&config.tool_phrases),
            SessionSettings::from_config(&config),
            &config.image_dir,
            args.resume,
            args.message,
        )
        .await
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
