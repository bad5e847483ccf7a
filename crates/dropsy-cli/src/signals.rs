//! Process signal handling

use std::future::Future;
use std::io;
use tracing::warn;

/// Resolve on Ctrl-C or, on Unix, SIGTERM
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = listen("Ctrl-C", tokio::signal::ctrl_c()) => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    listen("Ctrl-C", tokio::signal::ctrl_c()).await;
}

/// Wait for a signal listener; a listener that fails to install never fires
async fn listen<F>(name: &str, listener: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = listener.await {
        warn!("Cannot listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_listener_never_resolves() {
        let failing = async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "no handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(50), listen("Ctrl-C", failing)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_delivered_signal_resolves() {
        let delivered = async { Ok::<(), io::Error>(()) };
        let waited = tokio::time::timeout(Duration::from_millis(50), listen("Ctrl-C", delivered)).await;
        assert!(waited.is_ok());
    }
}
