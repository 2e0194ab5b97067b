use crate::domain::StakingIndex;

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "staking_relay")]
pub struct Metrics {
    /// Relay triggering events observed on the source ledger.
    #[metric(labels("kind"))]
    events: prometheus::IntCounterVec,

    /// Source logs carrying a known signature that could not be decoded.
    #[metric()]
    decode_failures: prometheus::IntCounter,

    /// Failed reads of the staking index.
    #[metric()]
    read_failures: prometheus::IntCounter,

    /// Relay jobs by outcome.
    #[metric(labels("outcome"))]
    relays: prometheus::IntCounterVec,

    /// Target ledger transactions by target contract and result.
    #[metric(labels("target", "result"))]
    transactions: prometheus::IntCounterVec,

    /// Times the live subscription broke and polling took over.
    #[metric()]
    subscription_fallbacks: prometheus::IntCounter,

    /// Last staking index written to both target contracts.
    #[metric()]
    relayed_index: prometheus::Gauge,

    /// Last source block whose logs were completely observed.
    #[metric()]
    checkpoint_block: prometheus::IntGauge,
}

impl Metrics {
    pub fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    pub fn event(&self, kind: &str) {
        self.events.with_label_values(&[kind]).inc();
    }

    pub fn decode_failure(&self) {
        self.decode_failures.inc();
    }

    pub fn read_failure(&self) {
        self.read_failures.inc();
    }

    pub fn relay(&self, outcome: &str) {
        self.relays.with_label_values(&[outcome]).inc();
    }

    pub fn transaction(&self, target: &str, result: &str) {
        self.transactions.with_label_values(&[target, result]).inc();
    }

    pub fn subscription_fallback(&self) {
        self.subscription_fallbacks.inc();
    }

    pub fn relayed(&self, index: StakingIndex) {
        // Lossy above 2^53.
        if let Ok(index) = u128::try_from(index.0) {
            self.relayed_index.set(index as f64);
        }
    }

    pub fn checkpoint(&self, block: u64) {
        self.checkpoint_block
            .set(i64::try_from(block).unwrap_or(i64::MAX));
    }
}
