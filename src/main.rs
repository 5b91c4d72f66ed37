use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use workout_tracker::{router, AppState, Config, Gateway};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let gateway = Gateway::open(config.data_path.clone()).await;
    let state = AppState::new(gateway, config.list_mode);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(list_mode = ?config.list_mode, "listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
