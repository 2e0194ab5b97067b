//! Submission of single state-changing calls to the target ledger.
//!
//! Transactions are legacy, EIP-155 replay protected transactions with a fixed
//! gas limit. The nonce is read from the node right before signing, so at most
//! one transaction per signing key may be in flight.

use {
    crate::{
        domain::{StakingIndex, TransactionReceipt, TxStatus},
        ledger::TargetLedger,
        profile::TargetFunction,
        shutdown::Shutdown,
    },
    alloy::{
        consensus::{SignableTransaction, TxEnvelope, TxLegacy},
        eips::Encodable2718,
        network::TxSignerSync,
        primitives::{Address, B256, Bytes, TxKind, U256},
        signers::local::PrivateKeySigner,
    },
    anyhow::Context,
    std::{sync::Arc, time::Duration},
};

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    /// Failed before the node accepted the transaction.
    #[error("could not submit transaction")]
    Submission(#[source] anyhow::Error),
    #[error("transaction {} reverted", .0.tx_hash)]
    Reverted(TransactionReceipt),
    #[error("transaction {tx_hash} was not mined within {timeout:?}")]
    ConfirmationTimeout { tx_hash: B256, timeout: Duration },
    #[error("stopped waiting for transaction {tx_hash} because of shutdown")]
    Cancelled { tx_hash: B256 },
}

impl TxError {
    /// Whether submitting again with a fresh nonce can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Submission(_) | Self::ConfirmationTimeout { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Submission(_) => "submission_error",
            Self::Reverted(_) => "reverted",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Executes `function(index)` on `target` and waits until it is mined.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TxExecuting: Send + Sync {
    async fn execute(
        &self,
        target: Address,
        function: TargetFunction,
        index: StakingIndex,
    ) -> Result<TransactionReceipt, TxError>;
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub gas_limit: u64,
    /// Upper bound for waiting on a receipt after submission.
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

pub struct TxExecutor {
    ledger: Arc<dyn TargetLedger>,
    signer: PrivateKeySigner,
    chain_id: u64,
    config: Config,
    shutdown: Shutdown,
}

impl TxExecutor {
    /// `chain_id` is the target ledger's chain id and is baked into every
    /// signature.
    pub fn new(
        ledger: Arc<dyn TargetLedger>,
        signer: PrivateKeySigner,
        chain_id: u64,
        config: Config,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            ledger,
            signer,
            chain_id,
            config,
            shutdown,
        }
    }

    async fn submit(&self, target: Address, input: Bytes) -> anyhow::Result<B256> {
        let sender = self.signer.address();
        let nonce = self.ledger.pending_nonce(sender).await?;
        let gas_price = self.ledger.gas_price().await?;

        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit: self.config.gas_limit,
            to: TxKind::Call(target),
            value: U256::ZERO,
            input,
        };
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .context("could not sign transaction")?;
        let raw = TxEnvelope::from(tx.into_signed(signature)).encoded_2718();

        let tx_hash = self.ledger.send_raw_transaction(raw.into()).await?;
        tracing::debug!(?tx_hash, ?sender, nonce, gas_price, "submitted transaction");
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: B256) -> Result<TransactionReceipt, TxError> {
        let poll = async {
            loop {
                match self.ledger.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => (),
                    Err(err) => tracing::debug!(?err, ?tx_hash, "could not fetch receipt"),
                }
                tokio::time::sleep(self.config.receipt_poll_interval).await;
            }
        };

        let mut shutdown = self.shutdown.clone();
        let receipt = tokio::select! {
            result = tokio::time::timeout(self.config.confirmation_timeout, poll) => {
                result.map_err(|_| TxError::ConfirmationTimeout {
                    tx_hash,
                    timeout: self.config.confirmation_timeout,
                })?
            }
            _ = shutdown.triggered() => return Err(TxError::Cancelled { tx_hash }),
        };

        match receipt.status {
            TxStatus::Success => Ok(receipt),
            TxStatus::Failure => Err(TxError::Reverted(receipt)),
        }
    }
}

#[async_trait::async_trait]
impl TxExecuting for TxExecutor {
    async fn execute(
        &self,
        target: Address,
        function: TargetFunction,
        index: StakingIndex,
    ) -> Result<TransactionReceipt, TxError> {
        let tx_hash = self
            .submit(target, function.encode(index))
            .await
            .map_err(TxError::Submission)?;
        let receipt = self.confirm(tx_hash).await?;
        tracing::info!(
            ?tx_hash,
            block = ?receipt.block_number,
            function = function.name(),
            %index,
            "transaction mined"
        );
        Ok(receipt)
    }
}
