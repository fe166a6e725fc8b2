use anyhow::{Context, Result, bail};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use whereabouts::config::FileConfig;
use whereabouts::proxy::{ProxyState, build_router};

/// Relay for Nominatim's /reverse that adds the contact address and CORS headers
///
/// Examples:
///   whereabouts-proxy --email you@example.org
///   whereabouts-proxy --bind 0.0.0.0:8080 --email you@example.org
#[derive(Parser, Debug)]
#[command(name = "whereabouts-proxy")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches whereabouts.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Upstream Nominatim base URL
    #[arg(long)]
    upstream: Option<String>,

    /// Contact address injected as `email` on every upstream request
    #[arg(long)]
    email: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(ref path) if !path.exists() => bail!("Config file not found: {:?}", path),
        Some(ref path) => Some(path.clone()),
        None => FileConfig::find(),
    };
    let file_config = match config_path {
        Some(ref path) => FileConfig::from_path(path).context("Failed to load config file")?,
        None => FileConfig::default(),
    };

    let fallback = if args.verbose || file_config.verbose {
        "debug"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    match config_path {
        Some(ref path) => tracing::debug!(path = %path.display(), "loaded config file"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    let mut proxy_config = file_config.proxy;
    if let Some(bind) = args.bind {
        proxy_config.bind = bind;
    }
    if let Some(upstream) = args.upstream {
        proxy_config.upstream = upstream;
    }
    if let Some(email) = args.email {
        proxy_config.email = email;
    }

    let settings = proxy_config
        .settings()
        .context("Invalid proxy configuration")?;
    let bind_addr: SocketAddr = proxy_config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", proxy_config.bind))?;

    let state = ProxyState::new(&settings).context("Invalid proxy configuration")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, upstream = %settings.upstream, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
