use anyhow::Result;
use tokio::signal;

mod inventory_logic;
use inventory_logic::{actor, config, logger, routes, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config();
    logger::setup_logging(&config.log_dir(), config.log_level())?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let app_state = state::AppState::new(config.image_options());

    log::warn!(
        "Identity is taken from the {} and {} headers; run behind an authenticating proxy that sets them.",
        actor::USERNAME_HEADER,
        actor::ROLE_HEADER
    );
    log::warn!("Documents are kept in memory only and are lost when the server stops.");

    let server_handle = tokio::spawn(routes::run(
        config.clone(),
        app_state.clone(),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {}
    }

    let _ = shutdown_tx.send(());

    match server_handle.await {
        Ok(Err(e)) => log::error!("Server stopped with error: {}", e),
        Err(e) => log::error!("Server task panicked: {}", e),
        Ok(Ok(())) => {}
    }

    log::info!("Shutdown complete.");
    Ok(())
}
