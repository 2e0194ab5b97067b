//! Boundaries to the two ledgers.
//!
//! Every RPC the relay issues goes through one of these traits so the
//! pipeline can be exercised against mocks.

use {
    crate::domain::TransactionReceipt,
    alloy::{
        primitives::{Address, B256, Bytes},
        providers::Provider,
        rpc::types::{Filter, Log, TransactionRequest},
        transports::TransportError,
    },
    anyhow::{Context, Result},
    ethrpc::AlloyProvider,
};

/// Read access to the source ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceLedger: Send + Sync {
    /// Executes a read-only call against the latest block.
    ///
    /// Returns the raw transport error so callers can tell a reverted call
    /// from an unreachable node.
    async fn call_contract(&self, to: Address, input: Bytes) -> Result<Bytes, TransportError>;

    /// Number of the latest block.
    async fn block_number(&self) -> Result<u64>;

    /// All logs emitted by `address` in the inclusive block range.
    async fn logs(&self, address: Address, from: u64, to: u64) -> Result<Vec<Log>>;
}

/// Read and write access to the target ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TargetLedger: Send + Sync {
    /// Nonce including transactions still sitting in the mempool.
    async fn pending_nonce(&self, account: Address) -> Result<u64>;

    /// Gas price currently suggested by the node, in wei.
    async fn gas_price(&self) -> Result<u128>;

    async fn chain_id(&self) -> Result<u64>;

    /// Broadcasts an already signed, EIP-2718 encoded transaction.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256>;

    /// `None` while the transaction is not mined yet.
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>>;
}

#[async_trait::async_trait]
impl SourceLedger for AlloyProvider {
    async fn call_contract(&self, to: Address, input: Bytes) -> Result<Bytes, TransportError> {
        let tx = TransactionRequest::default().to(to).input(input.into());
        self.call(tx).await
    }

    async fn block_number(&self) -> Result<u64> {
        self.get_block_number()
            .await
            .context("could not fetch latest block number")
    }

    async fn logs(&self, address: Address, from: u64, to: u64) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(address)
            .from_block(from)
            .to_block(to);
        self.get_logs(&filter)
            .await
            .with_context(|| format!("could not fetch logs for blocks {from}..={to}"))
    }
}

#[async_trait::async_trait]
impl TargetLedger for AlloyProvider {
    async fn pending_nonce(&self, account: Address) -> Result<u64> {
        self.get_transaction_count(account)
            .pending()
            .await
            .context("could not fetch pending nonce")
    }

    async fn gas_price(&self) -> Result<u128> {
        self.get_gas_price()
            .await
            .context("could not fetch gas price")
    }

    async fn chain_id(&self) -> Result<u64> {
        self.get_chain_id().await.context("could not fetch chain id")
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let pending = Provider::send_raw_transaction(self, &raw)
            .await
            .context("node rejected transaction")?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        let receipt = self
            .get_transaction_receipt(tx_hash)
            .await
            .context("could not fetch transaction receipt")?;
        Ok(receipt.map(Into::into))
    }
}
