//! PlantVillage Inference Server
//!
//! HTTP API serving crop-scoped plant disease predictions. The label catalog
//! and the model are loaded once at startup; if either fails to load the
//! server exits before binding.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use plantvillage_infer::build_handler;
use plantvillage_infer::utils::logging::{init_logging, LogConfig, LogLevel};

use crate::state::{AllowedOrigins, AppState, ServerConfig};

/// PlantVillage Inference Server
#[derive(Parser, Debug)]
#[command(name = "plantvillage-infer-server")]
#[command(version)]
#[command(about = "HTTP API for crop-scoped plant disease classification")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PLANTVILLAGE_PORT", default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "PLANTVILLAGE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Trained model weights (Burn record file)
    #[arg(long, env = "PLANTVILLAGE_MODEL")]
    model: PathBuf,

    /// Model config JSON (defaults to model.json next to the weights)
    #[arg(long, env = "PLANTVILLAGE_MODEL_CONFIG")]
    model_config: Option<PathBuf>,

    /// Label file, one class name per line, in model output order
    #[arg(long, env = "PLANTVILLAGE_LABELS", default_value = "labels.txt")]
    labels: PathBuf,

    /// Square size uploaded images are resized to
    #[arg(long, env = "PLANTVILLAGE_IMAGE_SIZE", default_value_t = plantvillage_infer::DEFAULT_IMAGE_SIZE)]
    image_size: u32,

    /// Comma-separated origins allowed by CORS ("*" for any)
    #[arg(long, env = "PLANTVILLAGE_ALLOWED_ORIGINS", default_value = "*")]
    allowed_origins: String,

    /// Maximum upload size in megabytes
    #[arg(long, env = "PLANTVILLAGE_MAX_UPLOAD_MB", default_value = "10")]
    max_upload_mb: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PLANTVILLAGE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Plain log output without ANSI colors, for log collectors
    #[arg(long, env = "PLANTVILLAGE_NO_COLOR", default_value = "false")]
    no_color: bool,

    /// Enable verbose logging (overrides --log-level)
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        if self.verbose {
            return LogConfig::verbose();
        }
        let base = if self.no_color {
            LogConfig::production()
        } else {
            LogConfig::default()
        };
        base.with_level(LogLevel::parse(&self.log_level))
    }

    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            model_path: self.model,
            model_config: self.model_config,
            labels_path: self.labels,
            image_size: self.image_size,
            allowed_origins: AllowedOrigins::parse(&self.allowed_origins),
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_config = cli.log_config();
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    let config = cli.into_config();

    info!("PlantVillage Inference Server v{}", plantvillage_infer::VERSION);
    info!("Configuration:");
    info!("  Model:       {:?}", config.model_path);
    info!("  Labels:      {:?}", config.labels_path);
    info!("  Image size:  {}", config.image_size);
    info!("  CORS:        {:?}", config.allowed_origins);
    info!("  Upload max:  {} bytes", config.max_upload_bytes);
    info!("  Log level:   {}", log_config.level);

    // Load catalog and model; any failure here stops the server
    let settings = config.model_settings();
    let handler = tokio::task::spawn_blocking(move || build_handler(&settings))
        .await
        .context("Model loading task failed")?
        .context("Failed to initialize the inference pipeline")?;
    info!(
        "Serving {} labels across crops [{}], images resized to {}px",
        handler.catalog().len(),
        handler.catalog().crops().join(", "),
        handler.decoder().image_size()
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Create shared state and router
    let state = Arc::new(AppState::new(config, handler));
    let app = routes::router(state);

    // Start server
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
