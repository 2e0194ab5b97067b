use {
    crate::{
        domain::{StakingIndex, TransactionReceipt, Trigger},
        metrics::Metrics,
        profile::{Profile, TargetFunction},
        submitter::{TxError, TxExecuting},
    },
    alloy::primitives::Address,
    std::sync::Arc,
    tracing::instrument,
};

/// One of the two writes of a relay cycle.
#[derive(Clone, Copy, Debug)]
pub struct Leg {
    pub name: &'static str,
    pub target: Address,
    pub function: TargetFunction,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Neither contract was updated.
    #[error("swap pool update failed")]
    PoolLeg(#[source] TxError),
    /// The swap pool holds the new index but the marketplace does not.
    #[error("marketplace update failed after swap pool update {}", .pool.tx_hash)]
    MarketplaceLeg {
        pool: TransactionReceipt,
        #[source]
        source: TxError,
    },
}

impl RelayError {
    /// Whether the target contracts now disagree.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::MarketplaceLeg { .. })
    }

    /// Whether a confirmation wait was interrupted by shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::PoolLeg(TxError::Cancelled { .. })
                | Self::MarketplaceLeg {
                    source: TxError::Cancelled { .. },
                    ..
                }
        )
    }

    fn label(&self) -> &'static str {
        match self {
            Self::PoolLeg(_) => "pool_failed",
            Self::MarketplaceLeg { .. } => "marketplace_failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayOutcome {
    pub pool: TransactionReceipt,
    pub marketplace: TransactionReceipt,
}

/// Writes a staking index to the swap pool and then to the marketplace.
///
/// Jobs are mutually exclusive: a job only starts its first transaction after
/// every transaction of the previous job completed, since both derive their
/// nonce from the same account.
pub struct RelayJob {
    executor: Arc<dyn TxExecuting>,
    pool: Leg,
    marketplace: Leg,
    leg_retries: usize,
    lock: tokio::sync::Mutex<()>,
}

impl RelayJob {
    pub fn new(executor: Arc<dyn TxExecuting>, profile: &Profile, leg_retries: usize) -> Self {
        Self {
            executor,
            pool: Leg {
                name: "swap_pool",
                target: profile.addresses.swap_pool,
                function: profile.pool_function,
            },
            marketplace: Leg {
                name: "marketplace",
                target: profile.addresses.marketplace,
                function: profile.marketplace_function,
            },
            leg_retries,
            lock: Default::default(),
        }
    }

    #[instrument(skip_all, fields(trigger = trigger.kind(), %index))]
    pub async fn run(
        &self,
        trigger: &Trigger,
        index: StakingIndex,
    ) -> Result<RelayOutcome, RelayError> {
        let _guard = self.lock.lock().await;
        let result = self.relay(index).await;
        match &result {
            Ok(outcome) => {
                Metrics::get().relay("success");
                Metrics::get().relayed(index);
                tracing::info!(
                    pool_tx = ?outcome.pool.tx_hash,
                    marketplace_tx = ?outcome.marketplace.tx_hash,
                    "relayed staking index"
                );
            }
            Err(err) => Metrics::get().relay(err.label()),
        }
        result
    }

    async fn relay(&self, index: StakingIndex) -> Result<RelayOutcome, RelayError> {
        let pool = self
            .execute(&self.pool, index)
            .await
            .map_err(RelayError::PoolLeg)?;
        let marketplace = self
            .execute(&self.marketplace, index)
            .await
            .map_err(|source| RelayError::MarketplaceLeg { pool, source })?;
        Ok(RelayOutcome { pool, marketplace })
    }

    /// Executes a single leg, resubmitting with a fresh nonce on retryable
    /// errors.
    async fn execute(&self, leg: &Leg, index: StakingIndex) -> Result<TransactionReceipt, TxError> {
        let mut attempt = 0;
        loop {
            let result = self.executor.execute(leg.target, leg.function, index).await;
            let label = match &result {
                Ok(_) => "success",
                Err(err) => err.label(),
            };
            Metrics::get().transaction(leg.name, label);
            match result {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_retryable() && attempt < self.leg_retries => {
                    attempt += 1;
                    tracing::warn!(?err, leg = leg.name, attempt, "retrying failed leg");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
