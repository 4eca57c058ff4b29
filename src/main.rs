use profile_view::{load_template, router, AppState, Config, HostBridge, PageTemplate};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let template = match &config.template_path {
        Some(path) => load_template(path).await,
        None => PageTemplate::builtin(),
    };
    let bridge = HostBridge::from_config(&config);
    let state = AppState::new(template, bridge);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
