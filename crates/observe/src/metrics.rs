use {
    axum::{Router, http::StatusCode, routing::get},
    prometheus::Encoder,
    std::{
        collections::HashMap,
        net::SocketAddr,
        sync::{Arc, OnceLock},
    },
    tokio::task::{self, JoinHandle},
};

static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();

/// Installs the process wide registry, optionally prefixing every metric name
/// and attaching constant labels to every series.
///
/// # Panics
///
/// Panics when the registry is already in use, i.e. when called twice or
/// after any metric storage was instantiated.
pub fn setup_registry(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = prometheus::Registry::new_custom(prefix, labels)
        .expect("invalid metrics registry configuration");
    if REGISTRY
        .set(prometheus_metric_storage::StorageRegistry::new(registry))
        .is_err()
    {
        panic!("metrics registry was already initialized");
    }
}

pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

/// Registry every `MetricStorage` of the process is instantiated in. Falls
/// back to an unprefixed registry when [`setup_registry`] was never called,
/// as is the case in unit tests.
pub fn get_storage_registry() -> &'static prometheus_metric_storage::StorageRegistry {
    REGISTRY.get_or_init(prometheus_metric_storage::StorageRegistry::default)
}

/// Renders all metrics of `registry` in the prometheus text format.
pub fn encode(registry: &prometheus::Registry) -> String {
    let mut buffer = Vec::new();
    if let Err(err) = prometheus::TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        tracing::error!(?err, "could not encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[async_trait::async_trait]
pub trait LivenessChecking: Send + Sync {
    async fn is_alive(&self) -> bool;
}

/// Serves `/metrics` and `/liveness` on `address` in a background task.
pub fn serve_metrics(liveness: Arc<dyn LivenessChecking>, address: SocketAddr) -> JoinHandle<()> {
    let app = Router::new()
        .route("/metrics", get(|| async { encode(get_registry()) }))
        .route(
            "/liveness",
            get(move || {
                let liveness = liveness.clone();
                async move {
                    if liveness.is_alive().await {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }
            }),
        );

    task::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(address).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!(?err, %address, "failed to bind metrics server");
                return;
            }
        };
        tracing::info!(%address, "serving metrics");
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(?err, "metrics server stopped");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(prometheus_metric_storage::MetricStorage)]
    #[metric(subsystem = "observe_test")]
    struct TestMetrics {
        /// Counter used to check the encoding.
        hits: prometheus::IntCounter,
    }

    #[test]
    fn encodes_registered_metrics() {
        let metrics = TestMetrics::instance(get_storage_registry()).unwrap();
        metrics.hits.inc();
        let encoded = encode(get_registry());
        assert!(encoded.contains("observe_test_hits 1"));
    }
}
