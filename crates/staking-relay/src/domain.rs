use {
    alloy::{
        primitives::{Address, B256, U256},
        rpc::types::Log,
    },
    std::fmt,
};

/// Scaled exchange rate between the staked asset and its wrapped form, as
/// reported by the source contract. Always re-read from the source ledger and
/// never modified locally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StakingIndex(pub U256);

impl From<U256> for StakingIndex {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for StakingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Event emitted by the source contract that requires the index to be
/// propagated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Deposited(Deposited),
    WithdrawalRequested(WithdrawalRequested),
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deposited(_) => "deposited",
            Self::WithdrawalRequested(_) => "withdrawal_requested",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposited {
    pub to: Address,
    /// Token kind flag. Only present on deployments whose event carries it.
    pub token: Option<bool>,
    pub amount: U256,
    pub wston_amount: U256,
    pub deposit_time: U256,
    pub deposit_block_number: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalRequested {
    pub to: Address,
    pub amount: U256,
}

/// What caused a relay cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Event(DomainEvent),
    /// Explicit one-off sync requested by the operator.
    Manual,
}

impl Trigger {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(event) => event.kind(),
            Self::Manual => "manual",
        }
    }
}

/// Identity of a source log: the transaction that emitted it and its position
/// in the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LogId {
    pub tx_hash: B256,
    pub log_index: u64,
}

impl LogId {
    /// `None` for pending logs, which have not been assigned a position yet.
    pub fn of(log: &Log) -> Option<Self> {
        Some(Self {
            tx_hash: log.transaction_hash?,
            log_index: log.log_index?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failure,
}

/// The parts of a mined transaction's receipt the relay cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub status: TxStatus,
    pub block_number: Option<u64>,
    pub tx_hash: B256,
}

impl From<alloy::rpc::types::TransactionReceipt> for TransactionReceipt {
    fn from(receipt: alloy::rpc::types::TransactionReceipt) -> Self {
        Self {
            status: if receipt.status() {
                TxStatus::Success
            } else {
                TxStatus::Failure
            },
            block_number: receipt.block_number,
            tx_hash: receipt.transaction_hash,
        }
    }
}
