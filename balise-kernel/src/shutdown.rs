use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Délai par défaut accordé aux requêtes en vol une fois l'arrêt demandé.
pub const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Annule le token d'arrêt à la réception de SIGINT ou SIGTERM. Les boucles
/// de fond et le serveur HTTP observent tous ce même token.
pub fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("termination signal received, shutting down");
        shutdown.cancel();
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Sert l'API jusqu'à l'annulation du token, puis laisse aux requêtes en vol
/// le délai `grace` pour se terminer. Un drain qui dépasse ce délai est
/// journalisé, jamais remonté comme erreur.
pub async fn serve_until_shutdown(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> std::io::Result<()> {
    let drain = shutdown.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.cancelled().await })
            .await
    };

    tokio::select! {
        result = server => result,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!("grace period expired before all connections drained");
            Ok(())
        }
    }
}
