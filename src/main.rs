use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use axum::Router;
use clap::{Parser, Subcommand};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use leadline::{routes, store, AppState, ServerConfig};

/// Leadline - voice lead-capture server
#[derive(Parser, Debug)]
#[command(name = "leadline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bulk-import contacts from a CSV file into the lead store
    Import {
        /// Path to the CSV file (header row required, `phone` column mandatory)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadline=info,tower_http=info".into()),
        )
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(Commands::Import { file }) = cli.command {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:leadline.db".to_string());
        let lead_store = store::LeadStore::connect(&database_url)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        let data = std::fs::read_to_string(&file)
            .map_err(|e| anyhow!("Failed to read {}: {}", file.display(), e))?;
        let summary = store::import_csv(&lead_store, &data)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        println!(
            "Imported {} contact(s), skipped {}",
            summary.imported, summary.skipped
        );
        return Ok(());
    }

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();
    let cors_origins = config.cors_allowed_origins.clone();

    // Create application state
    let app_state = AppState::new(config)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    // Configure CORS
    let cors_layer = match cors_origins.as_deref() {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        }
        None => {
            // Same-origin only; the telephony provider talks to us
            // server-to-server and needs no CORS.
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        }
    };

    // Combine REST and media-stream routes
    let app: Router = routes::api::create_api_router()
        .merge(routes::media::create_media_router())
        .with_state(app_state)
        .layer(cors_layer);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!(%socket_addr, "Server listening");

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
