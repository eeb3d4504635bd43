use nginx_panel::config::Config;
use nginx_panel::runtime::{DockerRuntime, RuntimeEndpoint};
use nginx_panel::server::{Panel, PanelServer, PKG_NAME, VERSION};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nginx_panel=debug".parse().expect("valid log directive")),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("panel.toml"));

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path.display(), error = %e, "Failed to load configuration");
        e
    })?;

    info!(path = %config_path.display(), "Configuration loaded");
    print_startup_banner(&config);

    for (label, dir) in [
        ("config_dir", &config.nginx.config_dir),
        ("sites_dir", &config.nginx.sites_dir),
    ] {
        if !dir.is_dir() {
            warn!(setting = label, path = %dir.display(), "Configured directory does not exist");
        }
    }

    let endpoint = RuntimeEndpoint::resolve(config.runtime.host.as_deref())?;
    info!(endpoint = %endpoint, container = %config.nginx.container, "Container runtime selected");
    let runtime = Arc::new(DockerRuntime::new(endpoint, config.runtime.timeout()));

    let panel = Arc::new(Panel::from_config(&config, runtime));
    let bind_addr = config.server.socket_addr()?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = PanelServer::new(bind_addr, panel, shutdown_rx);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "Panel server error");
        }
    });

    // Wait for shutdown signal (Ctrl+C or SIGTERM)
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C), shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down...");
    }

    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(Duration::from_secs(5), server_handle).await;

    info!("Shutdown complete");
    Ok(())
}

fn print_startup_banner(config: &Config) {
    info!(name = PKG_NAME, version = VERSION, "Starting Nginx panel");
    info!(
        bind = %config.server.bind,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        config_dir = %config.nginx.config_dir.display(),
        sites_dir = %config.nginx.sites_dir.display(),
        container = %config.nginx.container,
        "Nginx locations"
    );
    info!(
        host = ?config.runtime.host,
        timeout_secs = config.runtime.timeout_secs,
        "Runtime settings"
    );
}
