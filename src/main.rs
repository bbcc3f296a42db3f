use anyhow::Context;
use tracing::info;

use readthat::config::{self, AppCfg};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load("appsettings.json")?;
    config::tracing::init(&cfg.log)?;

    let addr = cfg.server.addr.clone();
    let app = readthat::build_app(cfg).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("starting listening at {}", addr);
    axum::serve(listener, app.router.clone().into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.shutdown().await;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
