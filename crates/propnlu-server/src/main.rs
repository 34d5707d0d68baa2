use anyhow::Context;
use clap::Parser;
use propnlu_server::{AppState, Config, ModelState, build_router};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,propnlu=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::parse();
    info!("propnlu v{}", env!("CARGO_PKG_VERSION"));

    // Load once, before accepting traffic. Loading is blocking work.
    let model_dir = config.model_dir.clone();
    let model = tokio::task::spawn_blocking(move || ModelState::load(&model_dir))
        .await
        .context("model loading task")?;

    let state = AppState::new(model, &config.model_dir, config.timeout());
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
