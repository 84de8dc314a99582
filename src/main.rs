use anyhow::Context;
use merchant_cascade::modules::jobs::WorkerMode;
use merchant_cascade::shared::utils::logger::init_logger;
use merchant_cascade::shared::AppConfig;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let mode = if std::env::args().skip(1).any(|arg| arg == "--burst") {
        WorkerMode::Draining
    } else {
        WorkerMode::Polling
    };

    let config = AppConfig::from_env().context("invalid configuration")?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown signal received");
            signal.cancel();
        }
    });

    let summary = merchant_cascade::run(config, mode, shutdown)
        .await
        .context("worker failed")?;

    log::info!(
        "Processed {} jobs: {} succeeded, {} failed",
        summary.pulled,
        summary.succeeded,
        summary.failed
    );
    Ok(())
}
