use {
    crate::shutdown::Shutdown,
    observe::metrics::LivenessChecking,
    std::{sync::RwLock, time::Duration},
    tokio::time::Instant,
};

/// Reports the relay as alive while its watch or poll loop keeps making
/// progress and no shutdown was requested.
pub struct Liveness {
    max_age: Duration,
    last_progress: RwLock<Instant>,
    shutdown: Shutdown,
}

impl Liveness {
    pub fn new(max_age: Duration, shutdown: Shutdown) -> Self {
        Self {
            max_age,
            last_progress: RwLock::new(Instant::now()),
            shutdown,
        }
    }

    /// Records a completed scan or a handled subscription log.
    pub fn progressed(&self) {
        *self.last_progress.write().unwrap() = Instant::now();
    }
}

#[async_trait::async_trait]
impl LivenessChecking for Liveness {
    async fn is_alive(&self) -> bool {
        let age = self.last_progress.read().unwrap().elapsed();
        !self.shutdown.is_triggered() && age <= self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn dies_when_progress_stalls() {
        let liveness = Liveness::new(Duration::from_secs(60), Shutdown::never());
        assert!(liveness.is_alive().await);

        tokio::time::sleep(Duration::from_secs(45)).await;
        liveness.progressed();
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(liveness.is_alive().await);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(!liveness.is_alive().await);
    }

    #[tokio::test]
    async fn dies_on_shutdown() {
        let (signal, shutdown) = Shutdown::manual();
        let liveness = Liveness::new(Duration::from_secs(60), shutdown);
        assert!(liveness.is_alive().await);
        signal.shutdown();
        assert!(!liveness.is_alive().await);
    }
}
