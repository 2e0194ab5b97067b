//! Builders for synthetic source logs.

use {
    crate::contracts::L1WrappedStakedTon,
    alloy::{
        primitives::{Address, B256, LogData, U256},
        rpc::types::Log,
        sol_types::SolEvent,
    },
};

pub const SOURCE: Address = Address::repeat_byte(0x11);
pub const RECIPIENT: Address = Address::repeat_byte(0x22);

/// A mined log at `block` whose transaction hash is derived from the block and
/// log index.
pub fn log(data: LogData, block: u64, log_index: u64) -> Log {
    let mut tx_hash = B256::ZERO;
    tx_hash[..8].copy_from_slice(&block.to_be_bytes());
    tx_hash[24..].copy_from_slice(&log_index.to_be_bytes());
    Log {
        inner: alloy::primitives::Log {
            address: SOURCE,
            data,
        },
        block_number: Some(block),
        transaction_hash: Some(tx_hash),
        log_index: Some(log_index),
        ..Default::default()
    }
}

pub fn withdrawal(amount: u64) -> LogData {
    L1WrappedStakedTon::WithdrawalRequested {
        _to: RECIPIENT,
        amount: U256::from(amount),
    }
    .encode_log_data()
}
