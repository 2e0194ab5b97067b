use {
    crate::{domain::StakingIndex, ledger::SourceLedger, profile::IndexGetter},
    alloy::{
        primitives::{Address, Bytes},
        transports::TransportError,
    },
    ethrpc::alloy::errors::RpcErrorExt,
    std::sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The node executed the call and it failed.
    #[error("{getter}() call was rejected by the node (revert data: {revert_data:?})")]
    Reverted {
        getter: &'static str,
        revert_data: Option<Bytes>,
        #[source]
        source: TransportError,
    },
    #[error("source ledger unreachable")]
    Unreachable(#[source] TransportError),
    #[error("{getter}() returned undecodable data")]
    Decode {
        getter: &'static str,
        #[source]
        source: alloy::sol_types::Error,
    },
}

/// Anything that can produce the authoritative staking index.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IndexReading: Send + Sync {
    /// Reads the index as of the latest block. Never cached.
    async fn fetch_index(&self) -> Result<StakingIndex, ReadError>;
}

/// Reads the staking index from the source contract.
pub struct ChainReader {
    ledger: Arc<dyn SourceLedger>,
    address: Address,
    getter: IndexGetter,
}

impl ChainReader {
    pub fn new(ledger: Arc<dyn SourceLedger>, address: Address, getter: IndexGetter) -> Self {
        Self {
            ledger,
            address,
            getter,
        }
    }
}

#[async_trait::async_trait]
impl IndexReading for ChainReader {
    async fn fetch_index(&self) -> Result<StakingIndex, ReadError> {
        let output = self
            .ledger
            .call_contract(self.address, self.getter.calldata())
            .await
            .map_err(|err| {
                if err.is_node_rejection() {
                    ReadError::Reverted {
                        getter: self.getter.name(),
                        revert_data: err.revert_data(),
                        source: err,
                    }
                } else {
                    ReadError::Unreachable(err)
                }
            })?;
        let index = self
            .getter
            .decode(&output)
            .map_err(|source| ReadError::Decode {
                getter: self.getter.name(),
                source,
            })?;
        tracing::debug!(%index, getter = self.getter.name(), "fetched staking index");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::ledger::MockSourceLedger,
        alloy::primitives::U256,
        ethrpc::alloy::errors::{testing_node_rejection, testing_unreachable_node},
        mockall::predicate::eq,
    };

    fn reader(ledger: MockSourceLedger, getter: IndexGetter) -> ChainReader {
        ChainReader::new(Arc::new(ledger), Address::repeat_byte(0x11), getter)
    }

    #[tokio::test]
    async fn reads_index_through_configured_getter() {
        let mut ledger = MockSourceLedger::new();
        ledger
            .expect_call_contract()
            .with(
                eq(Address::repeat_byte(0x11)),
                eq(IndexGetter::GetStakingIndex.calldata()),
            )
            .times(1)
            .returning(|_, _| {
                Ok(U256::from(1_050_000_000_000_000_000_u64)
                    .to_be_bytes_vec()
                    .into())
            });

        let index = reader(ledger, IndexGetter::GetStakingIndex)
            .fetch_index()
            .await
            .unwrap();
        assert_eq!(index, StakingIndex(U256::from(1_050_000_000_000_000_000_u64)));
    }

    #[tokio::test]
    async fn classifies_failures() {
        let mut ledger = MockSourceLedger::new();
        ledger
            .expect_call_contract()
            .times(1)
            .returning(|_, _| Err(testing_node_rejection()));
        ledger
            .expect_call_contract()
            .times(1)
            .returning(|_, _| Err(testing_unreachable_node()));
        ledger
            .expect_call_contract()
            .times(1)
            .returning(|_, _| Ok(Bytes::from_static(&[1, 2, 3])));
        let reader = reader(ledger, IndexGetter::StakingIndex);

        assert!(matches!(
            reader.fetch_index().await,
            Err(ReadError::Reverted {
                getter: "stakingIndex",
                ..
            })
        ));
        assert!(matches!(
            reader.fetch_index().await,
            Err(ReadError::Unreachable(_))
        ));
        assert!(matches!(
            reader.fetch_index().await,
            Err(ReadError::Decode { .. })
        ));
    }
}
