//! AC Infinity Prometheus Exporter
//!
//! Authenticates against the AC Infinity cloud, polls it on a fixed
//! interval and serves the resulting gauges on `/metrics`.

use acinfinity_exporter::{
    client::{AcInfinityClient, DeviceSource},
    collector::Collector,
    config::{ConfigOverrides, ExporterConfig, FileConfig},
    metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig},
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Prometheus exporter for AC Infinity controllers.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long, short = 'c', env = "ACINFINITY_CONFIG")]
    config: Option<PathBuf>,

    /// Account email.
    #[arg(long, env = "ACINFINITY_EMAIL")]
    email: Option<String>,

    /// Account password.
    #[arg(long, env = "ACINFINITY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Port for the metrics server [default: 8000].
    #[arg(long, env = "METRICS_PORT")]
    port: Option<u16>,

    /// Seconds between polls [default: 60].
    #[arg(long, env = "POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// trace, debug, info, warn or error [default: info].
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// API root URL.
    #[arg(long, env = "ACINFINITY_API_URL")]
    api_url: Option<String>,

    /// Per-request timeout in seconds [default: 30].
    #[arg(long, env = "ACINFINITY_TIMEOUT")]
    timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            email: self.email.clone(),
            password: self.password.clone(),
            listen_port: self.port,
            poll_interval_secs: self.poll_interval,
            log_level: self.log_level.clone(),
            api_base_url: self.api_url.clone(),
            request_timeout_secs: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => FileConfig::default(),
    };

    let config = match ExporterConfig::resolve(file, cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level.into()),
        )
        .init();

    info!("AC Infinity Exporter v{}", acinfinity_exporter::VERSION);
    info!(
        port = config.listen_port,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting exporter"
    );

    match run(config).await {
        Ok(()) => {
            info!("Exporter stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ExporterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(AcInfinityClient::new(
        config.api_base_url.as_str(),
        config.credentials.clone(),
        config.request_timeout,
    )?);

    // No data source means nothing worth serving.
    if let Err(e) = client.authenticate().await {
        error!(error = %e, "Initial authentication failed");
        return Err(e.into());
    }

    let metrics = Arc::new(MetricsRegistry::new()?);
    let stop = CancellationToken::new();

    let collector = Collector::new(client, Arc::clone(&metrics))
        .spawn(config.poll_interval, stop.clone());

    tokio::spawn(shutdown_signal(stop.clone()));

    let server = MetricsServer::new(
        MetricsServerConfig::with_port(config.listen_port),
        metrics,
    );
    let served = server.run(stop.clone()).await;

    stop.cancel();
    collector.shutdown(config.shutdown_timeout).await;
    served?;
    Ok(())
}

/// Cancels `stop` on SIGINT or SIGTERM.
async fn shutdown_signal(stop: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = stop.cancelled() => {}
    }
    stop.cancel();
}
