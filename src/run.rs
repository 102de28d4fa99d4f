/// Headless scanner runner
///
/// Loads the configuration, starts the scanner service and the periodic
/// summary, then waits for a shutdown signal and stops everything in order.
use anyhow::{anyhow, Context};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::{get_config_clone, load_config};
use crate::logger::{self, LogTag};
use crate::scanner::start_scanner;
use crate::summary::run_summary_loop;

/// How long the service task gets to stop after shutdown is signalled
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run_scanner() -> anyhow::Result<()> {
    load_config()
        .map_err(|e| anyhow!(e))
        .context("Failed to load configuration")?;
    let config = get_config_clone();

    logger::info(
        LogTag::System,
        &format!(
            "Scanner API {} | live session {}",
            config.api.base_url, config.session.url
        ),
    );
    logger::info(
        LogTag::System,
        &format!("Trending filter: {}", config.lists.trending_filter.summary()),
    );
    logger::info(
        LogTag::System,
        &format!("New pairs filter: {}", config.lists.new_filter.summary()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let runtime =
        start_scanner(&config, shutdown_rx.clone()).context("Failed to start scanner service")?;
    let summary_task = tokio::spawn(run_summary_loop(
        runtime.handle.clone(),
        config.display.clone(),
        shutdown_rx,
    ));

    logger::info(LogTag::System, "Scanner running");

    wait_for_shutdown_signal()
        .await
        .map_err(|e| anyhow!(e))
        .context("Signal handling failed")?;

    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(SHUTDOWN_GRACE, runtime.task).await {
        Ok(Ok(())) => logger::info(LogTag::System, "Scanner service stopped cleanly"),
        Ok(Err(e)) => logger::error(
            LogTag::System,
            &format!("Scanner service task failed: {}", e),
        ),
        Err(_) => logger::warning(
            LogTag::System,
            &format!(
                "Scanner service did not stop within {}s",
                SHUTDOWN_GRACE.as_secs()
            ),
        ),
    }
    let _ = summary_task.await;

    logger::info(LogTag::System, "Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C, SIGTERM, SIGHUP, SIGQUIT on Unix)
async fn wait_for_shutdown_signal() -> Result<(), String> {
    logger::info(
        LogTag::System,
        "Waiting for shutdown signal (press Ctrl+C twice to force kill)",
    );

    #[cfg(unix)]
    let signal_name = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| format!("Failed to bind SIGINT: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to bind SIGTERM: {}", e))?;
        let mut sighup =
            signal(SignalKind::hangup()).map_err(|e| format!("Failed to bind SIGHUP: {}", e))?;
        let mut sigquit =
            signal(SignalKind::quit()).map_err(|e| format!("Failed to bind SIGQUIT: {}", e))?;

        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sighup.recv() => "SIGHUP",
            _ = sigquit.recv() => "SIGQUIT",
        }
    };

    #[cfg(not(unix))]
    let signal_name = {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
        "CTRL_C"
    };

    logger::warning(
        LogTag::System,
        &format!("Shutdown signal received ({}), stopping scanner", signal_name),
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::error(LogTag::System, "Second Ctrl+C detected, forcing exit");
            logger::flush();
            // 130 = SIGINT
            std::process::exit(130);
        }
    });

    Ok(())
}
