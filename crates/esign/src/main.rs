//! Standalone contract e-signature service binary

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use esign::{EsignServiceRunner, ServiceConfig, StorageBackend};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(name = "esign-service")]
#[clap(about = "Contract e-signature service - versioned contract files, parties and signatures")]
struct Args {
    /// Database connection URL (mysql://, postgres:// or sqlite:)
    #[clap(long, env = "DATABASE_URL")]
    database_url: String,

    /// Listen address for the HTTP server
    #[clap(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    listen_addr: SocketAddr,

    /// Shared secret used to verify HS256 bearer tokens
    #[clap(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Object store for contract files (s3 or memory)
    #[clap(long, default_value = "s3", env = "STORAGE_BACKEND")]
    storage_backend: StorageBackend,

    /// S3 bucket holding contract files
    #[clap(long, env = "S3_BUCKET")]
    s3_bucket: Option<String>,

    /// Endpoint override for S3-compatible providers (Backblaze B2, MinIO)
    #[clap(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    #[clap(long, default_value = "us-east-1", env = "S3_REGION")]
    s3_region: String,

    /// Lifetime of presigned file URLs
    #[clap(long, default_value_t = 10, env = "PRESIGNED_URL_TTL_MINUTES")]
    presigned_url_ttl_minutes: u64,

    #[clap(long, default_value_t = 20, env = "DB_MAX_CONNECTIONS")]
    db_max_connections: u32,

    /// Create missing tables and indexes on startup
    #[clap(long, env = "AUTO_MIGRATE")]
    auto_migrate: bool,

    /// Largest accepted request body, in MiB
    #[clap(long, default_value_t = 20, env = "MAX_UPLOAD_MB")]
    max_upload_mb: usize,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "esign={level},storage={level},tower_http=debug",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting contract e-signature service");
    tracing::info!("Database URL: {}", mask_url(&args.database_url));
    tracing::info!("Listen address: {}", args.listen_addr);
    match args.storage_backend {
        StorageBackend::S3 => {
            tracing::info!(
                "S3 bucket: {}",
                args.s3_bucket.as_deref().unwrap_or("<not set>")
            );
            if let Some(endpoint) = &args.s3_endpoint {
                tracing::info!("S3 endpoint: {}", endpoint);
            }
        }
        StorageBackend::Memory => {
            tracing::warn!("In-memory object store selected - files do not survive a restart");
        }
    }

    // Create service configuration
    let config = ServiceConfig {
        database_url: args.database_url,
        listen_addr: args.listen_addr,
        jwt_secret: args.jwt_secret,
        storage_backend: args.storage_backend,
        s3_bucket: args.s3_bucket,
        s3_endpoint: args.s3_endpoint,
        s3_region: args.s3_region,
        presigned_url_ttl_minutes: args.presigned_url_ttl_minutes,
        db_max_connections: args.db_max_connections,
        auto_migrate: args.auto_migrate,
        max_upload_mb: args.max_upload_mb,
    };

    // Create and run service
    let service = EsignServiceRunner::new(config).await?;

    // Handle shutdown gracefully
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
    };

    tokio::select! {
        result = service.run() => {
            if let Err(e) = result {
                tracing::error!("Service error: {}", e);
                std::process::exit(1);
            }
        }
        _ = shutdown => {
            tracing::info!("Shutting down gracefully");
        }
    }

    tracing::info!("E-signature service stopped");
    Ok(())
}

/// Mask sensitive parts of database URL for logging
fn mask_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(password) = parsed.password() {
            url.replace(password, "****")
        } else {
            url.to_string()
        }
    } else {
        // If parsing fails, mask everything between the last ':' and '@'
        match url.find('@') {
            Some(at_pos) => {
                let (before_at, after_at) = url.split_at(at_pos);
                match before_at.rfind(':') {
                    Some(colon_pos) => format!("{}:****{}", &before_at[..colon_pos], after_at),
                    None => url.to_string(),
                }
            }
            None => url.to_string(),
        }
    }
}
