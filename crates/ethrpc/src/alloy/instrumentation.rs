//! Transport layer that logs every JSON-RPC request and records its latency
//! under the label of the ledger it was sent to.
use {
    alloy::{
        rpc::json_rpc::{RequestPacket, ResponsePacket},
        transports::TransportError,
    },
    std::{
        pin::Pin,
        task::{Context, Poll},
    },
    tower::{Layer, Service},
};

pub(crate) struct InstrumentationLayer {
    label: String,
}

impl InstrumentationLayer {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl<S> Layer<S> for InstrumentationLayer {
    type Service = InstrumentedTransport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentedTransport {
            inner,
            label: self.label.clone(),
            metrics: Metrics::get(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InstrumentedTransport<S> {
    inner: S,
    label: String,
    metrics: &'static Metrics,
}

impl<S> Service<RequestPacket> for InstrumentedTransport<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>,
    S::Future: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let timers: Vec<_> = req
            .requests()
            .iter()
            .map(|r| {
                tracing::trace!(ledger = %self.label, method = r.method(), "executing request");
                self.metrics.on_request_start(&self.label, r.method())
            })
            .collect();

        let label = self.label.clone();
        let fut = self.inner.call(req);
        Box::pin(async move {
            let res = fut.await;
            if let Err(err) = &res {
                tracing::debug!(ledger = %label, ?err, "request failed");
            }
            drop(timers);
            res
        })
    }
}

#[derive(prometheus_metric_storage::MetricStorage, Clone, Debug)]
#[metric(subsystem = "ledger_rpc")]
struct Metrics {
    /// Number of inflight RPC requests per ledger.
    #[metric(labels("ledger", "method"))]
    requests_inflight: prometheus::IntGaugeVec,

    /// Number of completed RPC requests per ledger.
    #[metric(labels("ledger", "method"))]
    requests_complete: prometheus::IntCounterVec,

    /// Execution time for each RPC request.
    #[metric(labels("ledger", "method"))]
    requests_duration_seconds: prometheus::HistogramVec,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    #[must_use]
    fn on_request_start(&self, ledger: &str, method: &str) -> impl Drop + use<> {
        let requests_inflight = self.requests_inflight.with_label_values(&[ledger, method]);
        let requests_complete = self.requests_complete.with_label_values(&[ledger, method]);
        let requests_duration_seconds = self
            .requests_duration_seconds
            .with_label_values(&[ledger, method]);

        requests_inflight.inc();
        let timer = requests_duration_seconds.start_timer();

        scopeguard::guard(timer, move |timer| {
            requests_inflight.dec();
            requests_complete.inc();
            timer.stop_and_record();
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::U64,
            providers::{Provider, ProviderBuilder},
            rpc::client::ClientBuilder,
            transports::mock::{Asserter, MockTransport},
        },
    };

    #[tokio::test]
    async fn measures_requests_of_non_http_transports() {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(42));
        let rpc = ClientBuilder::default()
            .layer(InstrumentationLayer::new("layered"))
            .transport(MockTransport::new(asserter), true);
        let provider = ProviderBuilder::new().connect_client(rpc);

        assert_eq!(provider.get_block_number().await.unwrap(), 42);
        let metrics = Metrics::get();
        let labels = ["layered", "eth_blockNumber"];
        assert_eq!(metrics.requests_complete.with_label_values(&labels).get(), 1);
        assert_eq!(metrics.requests_inflight.with_label_values(&labels).get(), 0);
    }
}
