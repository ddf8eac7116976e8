use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use formflow::Settings;
use formflow::server::{self, AppState};
use std::sync::Arc;
use tracing::info;

/// Serves the execute route in front of the automation backend.
#[derive(Parser)]
#[command(name = "formflow-proxy", version)]
struct Args {
    /// Override BACKEND_URL
    #[arg(long)]
    backend_url: Option<String>,
    /// Override FORMFLOW_ADDR, e.g. 0.0.0.0:3000
    #[arg(long)]
    addr: Option<String>,
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut settings = Settings::from_env();
    if let Some(url) = args.backend_url {
        settings.backend_url = url.trim_end_matches('/').to_string();
    }
    if args.addr.is_some() {
        settings.bind_addr = args.addr;
    }

    let state = Arc::new(AppState::new(&settings));
    let app = server::router(state);

    let listener = server::bind(&settings)
        .await
        .context("Could not bind a listening address. Kill the old proxy or set FORMFLOW_ADDR.")?;
    info!(
        "Proxy listening on http://{} -> {}",
        listener.local_addr()?,
        settings.execute_endpoint()
    );

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
