//! Tahaqq daemon — entry point for running the verification service.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tahaqq_nullables::NullTransport;
use tahaqq_provider::HttpIdentityProvider;
use tahaqq_regional::HttpRegistry;
use tahaqq_rpc as rpc;
use tahaqq_service::{init_logging, LogFormat, ServiceConfig, ServiceMetrics, VerificationService};
use tahaqq_store::MemoryStore;
use tahaqq_sync::{NeuralDispatcher, SyncTransport, WsSyncTransport};
use tahaqq_types::SystemClock;
use tracing::{info, warn};

/// Interval between expiry sweeps over non-terminal sessions.
const EXPIRY_SWEEP_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "tahaqq-daemon", about = "Tahaqq verification service daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TAHAQQ_CONFIG")]
    config: Option<PathBuf>,

    /// Port the HTTP API listens on.
    #[arg(long, env = "TAHAQQ_PORT")]
    port: Option<u16>,

    /// Identity provider base URL.
    #[arg(long, env = "TAHAQQ_PROVIDER_URL")]
    provider_url: Option<String>,

    /// Identity provider API key.
    #[arg(long, env = "TAHAQQ_PROVIDER_API_KEY", hide_env_values = true)]
    provider_api_key: Option<String>,

    /// Saudi healthcare registry base URL.
    #[arg(long, env = "TAHAQQ_HEALTHCARE_REGISTRY_URL")]
    healthcare_registry_url: Option<String>,

    /// Sudan national-id registry base URL.
    #[arg(long, env = "TAHAQQ_NATIONAL_REGISTRY_URL")]
    national_registry_url: Option<String>,

    /// Neural sync WebSocket endpoint. Empty disables dispatch.
    #[arg(long, env = "TAHAQQ_SYNC_ENDPOINT")]
    sync_endpoint: Option<String>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "TAHAQQ_ENABLE_METRICS")]
    metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "TAHAQQ_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TAHAQQ_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// File settings as the base, flags and env vars on top.
    fn into_config(self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_toml_file(&path.display().to_string())
                .map_err(|e| anyhow::anyhow!("{e}"))?,
            None => ServiceConfig::default(),
        };

        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(url) = self.provider_url {
            config.provider_url = url;
        }
        if let Some(key) = self.provider_api_key {
            config.provider_api_key = key;
        }
        if let Some(url) = self.healthcare_registry_url {
            config.healthcare_registry_url = url;
        }
        if let Some(url) = self.national_registry_url {
            config.national_registry_url = url;
        }
        if let Some(endpoint) = self.sync_endpoint {
            config.sync_endpoint = endpoint;
        }
        if self.metrics {
            config.enable_metrics = true;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(LogFormat::parse(&config.log_format), &config.log_level);

    let sync_label = if config.sync_endpoint.is_empty() {
        "off"
    } else {
        config.sync_endpoint.as_str()
    };
    info!(
        port = config.listen_port,
        provider = %config.provider_url,
        sync = sync_label,
        metrics = config.enable_metrics,
        "starting tahaqq daemon"
    );

    let params = config.params.clone();
    let registry = Arc::new(
        HttpRegistry::new(&config.healthcare_registry_url, &config.national_registry_url)
            .with_timeout(Duration::from_millis(params.registry_timeout_ms))
            .with_reference_ttl(Duration::from_secs(params.reference_cache_ttl_secs)),
    );
    let provider = Arc::new(
        HttpIdentityProvider::new(&config.provider_url, config.provider_api_key.clone())
            .with_timeout(Duration::from_millis(params.provider_timeout_ms)),
    );

    let transport: Arc<dyn SyncTransport> = if config.sync_endpoint.is_empty() {
        NullTransport::new()
    } else {
        Arc::new(WsSyncTransport::new(config.sync_endpoint.clone()))
    };
    let dispatcher = NeuralDispatcher::spawn(
        transport,
        params.sync_max_attempts,
        params.sync_backoff_ms,
    );

    let service = Arc::new(VerificationService::new(
        params,
        &config.oid_base_arc,
        Arc::new(MemoryStore::new()),
        registry,
        provider,
        dispatcher.handle(),
        Arc::new(SystemClock),
        Arc::new(ServiceMetrics::new()),
    ));

    let sweeper = tokio::spawn({
        let service = Arc::clone(&service);
        async move {
            let mut interval = tokio::time::interval(Duration::from_secs(EXPIRY_SWEEP_SECS));
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                if let Err(e) = service.expire_due_sessions() {
                    warn!(error = %e, "expiry sweep failed");
                }
            }
        }
    });

    rpc::serve(
        Arc::clone(&service),
        config.listen_port,
        config.enable_metrics,
        shutdown_signal(),
    )
    .await?;

    info!("shutdown signal received, draining");
    sweeper.abort();
    let _ = sweeper.await;
    drop(service);
    dispatcher.shutdown().await;

    info!("tahaqq daemon exited cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install ctrl-c handler");
    }
}
