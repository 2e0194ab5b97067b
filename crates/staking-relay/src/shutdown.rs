use tokio::sync::watch;

/// Cancellation handle observed by every suspension point of the relay:
/// subscription waits, polling sleeps and confirmation waits.
#[derive(Clone, Debug)]
pub struct Shutdown(watch::Receiver<bool>);

/// Sending half of [`Shutdown`].
#[derive(Debug)]
pub struct ShutdownSignal(watch::Sender<bool>);

impl Shutdown {
    /// Creates a handle which resolves on SIGINT or SIGTERM.
    pub fn on_signal() -> Self {
        let (signal, shutdown) = Self::manual();
        tokio::spawn(async move {
            signal_handler().await;
            signal.shutdown();
        });
        shutdown
    }

    /// Creates a handle that is resolved through the returned signal.
    pub fn manual() -> (ShutdownSignal, Self) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownSignal(sender), Self(receiver))
    }

    /// A handle that never resolves.
    pub fn never() -> Self {
        Self::manual().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once shutdown was requested.
    pub async fn triggered(&mut self) {
        if self.0.wait_for(|triggered| *triggered).await.is_err() {
            // Sender is gone without requesting shutdown.
            std::future::pending::<()>().await;
        }
    }
}

impl ShutdownSignal {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

#[cfg(unix)]
async fn signal_handler() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    // equivalent to Ctrl+C
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM signal, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("received SIGINT signal, initiating graceful shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn signal_handler() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    tracing::info!("received CTRL+C signal, initiating graceful shutdown");
}

#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[tokio::test]
    async fn resolves_all_clones() {
        let (signal, mut shutdown) = Shutdown::manual();
        let mut clone = shutdown.clone();
        assert!(!shutdown.is_triggered());

        signal.shutdown();
        shutdown.triggered().await;
        clone.triggered().await;
        assert!(clone.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn never_resolves_without_sender() {
        let mut shutdown = Shutdown::never();
        let result = tokio::time::timeout(Duration::from_secs(3600), shutdown.triggered()).await;
        assert!(result.is_err());
    }
}
