use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod batch;
mod description;
mod server;

use api::{ApiClient, AuthenticatedClient, CameraApi, MediaApi};
use batch::{BatchCoordinator, ProgressStore, DEFAULT_MAX_CONCURRENCY};

/// Vision API upload gateway
#[derive(Parser)]
#[command(name = "visiongate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Vision API username
    #[arg(long, env = "COG_USER")]
    username: String,

    /// Vision API password
    #[arg(long, env = "COG_PASS", hide_env_values = true)]
    password: String,

    /// Tenant id (defaults to the account's first tenant)
    #[arg(long, env = "COG_TENANT")]
    tenant: Option<String>,

    /// Subject that uploaded media is associated with for training
    #[arg(long, env = "SUBJECT_UID", default_value = "text1_1swflmmt")]
    subject_uid: String,

    /// Base URL of the vision API
    #[arg(long, env = "COG_API_BASE", default_value = "https://api.cogniac.io/1/")]
    api_base: String,

    /// Address to listen on
    #[arg(long, env = "VISIONGATE_LISTEN", default_value = "127.0.0.1:5000")]
    listen: SocketAddr,

    /// Maximum concurrent uploads per batch
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,

    /// Local staging directory for received files
    #[arg(long, default_value = "temp_uploads")]
    staging_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Credential exchange: resolve tenant, fetch the bearer token once.
    let api_client = ApiClient::new(None);
    let tenant_id = match cli.tenant {
        Some(tenant) => tenant,
        None => {
            api_client
                .fetch_default_tenant(&cli.api_base, &cli.username, &cli.password)
                .await?
        }
    };
    let access_token = api_client
        .get_access_token(&cli.api_base, &cli.username, &cli.password, &tenant_id)
        .await?;

    let client = Arc::new(AuthenticatedClient::from_client(
        api_client,
        cli.api_base.clone(),
        access_token,
    ));
    info!("🔐 Connection successful to {}", cli.api_base);

    let subject = client
        .ensure_subject(&cli.subject_uid)
        .await
        .context("Failed to get or create training subject")?;
    info!("🎯 Using subject: {}", subject.subject_uid);

    let media: Arc<dyn MediaApi> = client.clone();
    let cameras: Arc<dyn CameraApi> = client.clone();
    let store = Arc::new(ProgressStore::new());
    let coordinator = Arc::new(BatchCoordinator::new(
        media.clone(),
        store.clone(),
        subject.subject_uid.clone(),
        cli.staging_dir.clone(),
        cli.max_concurrency,
    ));

    let state = server::AppState {
        coordinator,
        store,
        media,
        cameras,
        subject_uid: subject.subject_uid,
        staging_root: cli.staging_dir,
    };

    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    info!("🚀 Listening on {}", cli.listen);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
