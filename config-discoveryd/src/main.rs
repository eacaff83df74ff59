use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result};
use config_discoveryd::api;
use config_discoveryd::config::Config;
use config_discoveryd::daemon::{self, StartError};
use config_discoveryd::discovery::DnsSd;
use config_discoveryd::dns::HickoryResolver;

/// Exit status when the instance cannot be published at startup
const EXIT_PUBLISH_FAILED: u8 = 1;

/// Exit status when the instance cannot be unpublished at shutdown
const EXIT_UNPUBLISH_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("config_discoveryd=info"))
        )
        .init();

    tracing::info!("Starting config-discoveryd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/config-discovery/discoveryd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    // Connect to the configured name servers, or the system ones
    let name_servers = match config.dnssd.name_servers()? {
        Some(servers) => servers,
        None => HickoryResolver::system_name_servers()?,
    };
    let resolver = HickoryResolver::connect(&name_servers)
        .await
        .context("Failed to connect to name servers")?;
    tracing::info!("Using name servers {:?}", name_servers);

    let discovery = Arc::new(DnsSd::new(Arc::new(resolver), &config.dnssd));

    // Install signal handlers before publishing
    let shutdown = daemon::shutdown_signal().context("Failed to install signal handlers")?;

    // Publish this configuration service instance
    let record = config.instance.to_record()?;
    let record = match discovery.place(&record).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Failed to choose a registration domain: {}", e);
            return Ok(ExitCode::from(EXIT_PUBLISH_FAILED));
        }
    };

    // Bind the API listener, then publish
    let listener = match daemon::start(discovery.as_ref(), &record, &config.api.listen).await {
        Ok(listener) => listener,
        Err(StartError::Publish(e)) => {
            tracing::error!("Failed to publish {}: {}", record.identifier(), e);
            return Ok(ExitCode::from(EXIT_PUBLISH_FAILED));
        }
        Err(e) => return Err(e.into()),
    };

    let app_state = api::routes::AppState {
        discovery: discovery.clone(),
        instance: Arc::new(record.clone()),
    };

    // Serve until a shutdown signal, then withdraw the published instance
    if let Err(e) = daemon::run(app_state, listener, shutdown).await {
        tracing::error!("Failed to unpublish {}: {}", record.identifier(), e);
        return Ok(ExitCode::from(EXIT_UNPUBLISH_FAILED));
    }

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}
