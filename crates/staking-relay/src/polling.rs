use {
    crate::ledger::SourceLedger,
    alloy::{primitives::Address, rpc::types::Log},
    std::{num::NonZeroU64, sync::Arc, time::Duration},
};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("could not resolve chain head")]
    Head(#[source] anyhow::Error),
    #[error("could not fetch logs for blocks {from}..={to}")]
    Logs {
        from: u64,
        to: u64,
        #[source]
        source: anyhow::Error,
    },
}

/// Logs of one completely scanned, inclusive block range.
#[derive(Debug)]
pub struct ScanBatch {
    pub from: u64,
    pub to: u64,
    pub logs: Vec<Log>,
}

/// Periodically queries a contract's logs block range by block range.
///
/// The next range only starts after the previous one was fetched
/// successfully, so failures never leave gaps.
pub struct PollingScanner {
    ledger: Arc<dyn SourceLedger>,
    address: Address,
    next_block: u64,
    /// End of a range whose fetch failed. Retried verbatim by the next poll.
    pending_to: Option<u64>,
    max_range: NonZeroU64,
    interval: Duration,
}

impl PollingScanner {
    pub fn new(
        ledger: Arc<dyn SourceLedger>,
        address: Address,
        from_block: u64,
        max_range: NonZeroU64,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            address,
            next_block: from_block,
            pending_to: None,
            max_range,
            interval,
        }
    }

    /// Delay between two polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// First block not covered yet.
    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Fetches the logs of `[from, to]`. An unset `to` means the current
    /// chain head. Yields nothing if the range is empty.
    pub async fn scan(&self, from: u64, to: Option<u64>) -> Result<ScanBatch, ScanError> {
        let to = match to {
            Some(to) => to,
            None => self.ledger.block_number().await.map_err(ScanError::Head)?,
        };
        if to < from {
            return Ok(ScanBatch {
                from,
                to,
                logs: Vec::new(),
            });
        }
        let logs = self
            .ledger
            .logs(self.address, from, to)
            .await
            .map_err(|source| ScanError::Logs { from, to, source })?;
        Ok(ScanBatch { from, to, logs })
    }

    /// Scans the next range, at most `max_range` blocks up to the current
    /// head.
    ///
    /// Returns `Ok(None)` if there are no new blocks. On error nothing
    /// advances and the same range is attempted again by the next call.
    pub async fn poll(&mut self) -> Result<Option<ScanBatch>, ScanError> {
        let from = self.next_block;
        let to = match self.pending_to {
            Some(to) => to,
            None => {
                let head = self.ledger.block_number().await.map_err(ScanError::Head)?;
                head.min(from.saturating_add(self.max_range.get() - 1))
            }
        };
        if to < from {
            tracing::trace!(from, head = to, "no new blocks");
            return Ok(None);
        }

        let batch = match self.scan(from, Some(to)).await {
            Ok(batch) => batch,
            Err(err) => {
                self.pending_to = Some(to);
                return Err(err);
            }
        };
        self.pending_to = None;
        self.next_block = to + 1;
        tracing::debug!(from, to, logs = batch.logs.len(), "scanned block range");
        Ok(Some(batch))
    }
}
