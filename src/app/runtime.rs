use super::{RelayOrchestrator, ShutdownReason};
use crate::error::{RelayError, Result};
use tracing::{info, warn};

impl RelayOrchestrator {
    /// Run until a termination signal or shutdown request, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Avatar relay is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| RelayError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| RelayError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await;

        info!("Avatar relay shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self) {
        // SIGTERM (service stop)
        #[cfg(unix)]
        {
            let handle = self.shutdown_handle();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    handle
                        .request(ShutdownReason::Signal("SIGTERM".to_string()))
                        .await;
                }
            });
        }

        // SIGINT (Ctrl+C)
        let handle = self.shutdown_handle();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                handle
                    .request(ShutdownReason::Signal("SIGINT".to_string()))
                    .await;
            }
        });
    }
}
