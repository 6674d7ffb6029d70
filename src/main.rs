use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use secondhand_radar::config::{AppConfig, LoggingConfig};
use secondhand_radar::web::{self, AppState};
use secondhand_radar::{InferenceRecognizer, Marketplaces, PriceAnalyzer, ProductRecognizer};

#[derive(Debug, Parser)]
#[command(name = "secondhand-radar", version, about)]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen port, overrides configuration and PORT
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Search all marketplaces once and print the JSON report
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "secondhand-radar.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    info!("Starting secondhand-radar v{}", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port = config.metrics.port, "Metrics exporter listening");
    }

    let http = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let marketplaces = Marketplaces::from_config(&config, http.clone())?;
    let recognizer: Arc<dyn ProductRecognizer> =
        Arc::new(InferenceRecognizer::new(http, config.recognition.clone()));
    let analyzer = Arc::new(PriceAnalyzer::new(
        recognizer,
        marketplaces,
        config.marketplaces.max_results,
    ));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = AppState {
                analyzer,
                config: config.clone(),
            };
            web::serve(config, state).await?;
        }
        Command::Search { query } => {
            let report = analyzer.search(&query.join(" ")).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    info!("Shutting down...");
    Ok(())
}
