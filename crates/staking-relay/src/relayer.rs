//! The detection → fetch → propagate pipeline.

use {
    crate::{
        chain_reader::{IndexReading, ReadError},
        decoder::EventDecoder,
        domain::{LogId, Trigger},
        liveness::Liveness,
        metrics::Metrics,
        polling::PollingScanner,
        relay::{RelayError, RelayJob, RelayOutcome},
        shutdown::Shutdown,
        watcher::{EventWatcher, SubscriptionError},
    },
    alloy::rpc::types::Log,
    std::{
        collections::{HashSet, VecDeque},
        sync::Arc,
    },
    tokio::time::MissedTickBehavior,
};

/// Number of recently processed logs remembered for deduplication.
const SEEN_LOGS_CAPACITY: usize = 10_000;

/// Bounded set of recently processed logs. The oldest entries are evicted
/// first.
#[derive(Debug)]
pub struct SeenLogs {
    capacity: usize,
    order: VecDeque<LogId>,
    ids: HashSet<LogId>,
}

impl SeenLogs {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `false` if the log was already seen.
    pub fn insert(&mut self, id: LogId) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

/// Why [`Relayer::watch`] stopped.
#[derive(Debug)]
pub enum WatchEnd {
    Shutdown,
    /// The subscription broke. Polling has to take over with the scanner
    /// that was backfilling.
    Failed(SubscriptionError),
}

pub struct Relayer {
    decoder: EventDecoder,
    reader: Arc<dyn IndexReading>,
    job: RelayJob,
    seen: SeenLogs,
    checkpoint: u64,
    exit_on_failure: bool,
    liveness: Arc<Liveness>,
}

impl Relayer {
    /// `checkpoint` is the last block whose logs need no processing.
    pub fn new(
        decoder: EventDecoder,
        reader: Arc<dyn IndexReading>,
        job: RelayJob,
        checkpoint: u64,
        exit_on_failure: bool,
        liveness: Arc<Liveness>,
    ) -> Self {
        Metrics::get().checkpoint(checkpoint);
        Self {
            decoder,
            reader,
            job,
            seen: SeenLogs::new(SEEN_LOGS_CAPACITY),
            checkpoint,
            exit_on_failure,
            liveness,
        }
    }

    /// Last block known to be completely observed.
    pub fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    fn observed_up_to(&mut self, block: u64) {
        if block > self.checkpoint {
            self.checkpoint = block;
            Metrics::get().checkpoint(block);
        }
    }

    /// Processes a single source log.
    ///
    /// Only relay failures are returned, and only if the relayer was
    /// configured to stop on them. A relay cancelled by shutdown is never
    /// returned. Everything else is logged and the log is skipped.
    pub async fn handle_log(&mut self, log: &Log) -> Result<(), RelayError> {
        if log.removed {
            tracing::debug!(tx = ?log.transaction_hash, "ignoring removed log");
            return Ok(());
        }
        if let Some(id) = LogId::of(log) {
            if !self.seen.insert(id) {
                tracing::debug!(?id, "ignoring already processed log");
                return Ok(());
            }
        }

        let event = match self.decoder.decode(log) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(err) => {
                Metrics::get().decode_failure();
                tracing::warn!(?err, tx = ?log.transaction_hash, "skipping undecodable log");
                return Ok(());
            }
        };
        Metrics::get().event(event.kind());
        tracing::info!(
            kind = event.kind(),
            block = ?log.block_number,
            tx = ?log.transaction_hash,
            "observed relay trigger"
        );

        let index = match self.reader.fetch_index().await {
            Ok(index) => index,
            Err(err) => {
                Metrics::get().read_failure();
                log_read_error(&err);
                return Ok(());
            }
        };

        match self.job.run(&Trigger::Event(event), index).await {
            Ok(_) => Ok(()),
            Err(err) if self.exit_on_failure && !err.is_cancelled() => Err(err),
            Err(err) => {
                tracing::error!(?err, partial = err.is_partial(), "relay failed");
                Ok(())
            }
        }
    }

    /// Relays events from a live subscription until it breaks or shutdown is
    /// requested.
    ///
    /// Subscription logs never move the checkpoint: a reconnecting socket
    /// drops whatever was emitted in the meantime. Instead `scanner`
    /// backfills on its interval and only completed scans advance it.
    pub async fn watch(
        &mut self,
        watcher: &mut EventWatcher,
        scanner: &mut PollingScanner,
        shutdown: &mut Shutdown,
    ) -> Result<WatchEnd, RelayError> {
        let mut backfill = tokio::time::interval(scanner.interval());
        backfill.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => return Ok(WatchEnd::Shutdown),
                log = watcher.next() => match log {
                    Ok(log) => {
                        self.handle_log(&log).await?;
                        self.liveness.progressed();
                    }
                    Err(err) => return Ok(WatchEnd::Failed(err)),
                },
                _ = backfill.tick() => self.poll_once(scanner).await?,
            }
        }
    }

    /// Runs a single polling cycle.
    pub async fn poll_once(&mut self, scanner: &mut PollingScanner) -> Result<(), RelayError> {
        match scanner.poll().await {
            Ok(Some(batch)) => {
                for log in &batch.logs {
                    self.handle_log(log).await?;
                }
                self.observed_up_to(batch.to);
                self.liveness.progressed();
            }
            Ok(None) => self.liveness.progressed(),
            Err(err) => tracing::warn!(?err, "polling failed, retrying the same range"),
        }
        Ok(())
    }

    /// Polls on the scanner's interval until shutdown is requested.
    pub async fn poll(
        &mut self,
        scanner: &mut PollingScanner,
        shutdown: &mut Shutdown,
    ) -> Result<(), RelayError> {
        tracing::info!(from = scanner.next_block(), "polling for source logs");
        while !shutdown.is_triggered() {
            self.poll_once(scanner).await?;
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = tokio::time::sleep(scanner.interval()) => (),
            }
        }
        Ok(())
    }
}

/// Relays the current index without waiting for an event.
pub async fn relay_current(
    reader: &dyn IndexReading,
    job: &RelayJob,
) -> anyhow::Result<RelayOutcome> {
    let index = reader.fetch_index().await?;
    Ok(job.run(&Trigger::Manual, index).await?)
}

fn log_read_error(err: &ReadError) {
    match err {
        ReadError::Unreachable(_) => {
            tracing::warn!(?err, "source ledger unreachable, skipping event")
        }
        ReadError::Reverted { .. } | ReadError::Decode { .. } => {
            tracing::error!(?err, "could not read staking index, skipping event")
        }
    }
}
