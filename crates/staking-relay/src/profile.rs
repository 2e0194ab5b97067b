//! Deployment profiles.
//!
//! The relay runs against one of several source contract revisions. They only
//! differ in the name of the index getter and in the layout of the `Deposited`
//! event, so both are captured as values selected once at startup instead of
//! separate pipelines.

use {
    crate::{
        contracts::{
            L1WrappedStakedTonThanos,
            L1WrappedStakedTonTitan,
            Marketplace,
            WstonSwapPool,
        },
        domain::StakingIndex,
    },
    alloy::{
        primitives::{Address, Bytes},
        sol_types::SolCall,
    },
    std::fmt,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Deployment {
    /// Source contract exposes `getStakingIndex()` and tags deposits with a
    /// token flag.
    Thanos,
    /// Source contract exposes `stakingIndex()`.
    Titan,
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thanos => f.write_str("thanos"),
            Self::Titan => f.write_str("titan"),
        }
    }
}

/// View function returning the current staking index on the source contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexGetter {
    GetStakingIndex,
    StakingIndex,
}

impl IndexGetter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetStakingIndex => "getStakingIndex",
            Self::StakingIndex => "stakingIndex",
        }
    }

    pub fn calldata(&self) -> Bytes {
        match self {
            Self::GetStakingIndex => L1WrappedStakedTonThanos::getStakingIndexCall {}.abi_encode(),
            Self::StakingIndex => L1WrappedStakedTonTitan::stakingIndexCall {}.abi_encode(),
        }
        .into()
    }

    pub fn decode(&self, data: &[u8]) -> Result<StakingIndex, alloy::sol_types::Error> {
        let index = match self {
            Self::GetStakingIndex => {
                L1WrappedStakedTonThanos::getStakingIndexCall::abi_decode_returns(data)?
            }
            Self::StakingIndex => {
                L1WrappedStakedTonTitan::stakingIndexCall::abi_decode_returns(data)?
            }
        };
        Ok(StakingIndex(index))
    }
}

/// Layout of the `Deposited` event emitted by the source contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepositLayout {
    WithTokenFlag,
    WithoutTokenFlag,
}

/// State-changing call on the target ledger that stores a new index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetFunction {
    /// `updateStakingIndex(uint256)` on the swap pool.
    UpdateStakingIndex,
    /// `setStakingIndex(uint256)` on the marketplace.
    SetStakingIndex,
}

impl TargetFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateStakingIndex => "updateStakingIndex",
            Self::SetStakingIndex => "setStakingIndex",
        }
    }

    pub fn encode(&self, index: StakingIndex) -> Bytes {
        match self {
            Self::UpdateStakingIndex => {
                WstonSwapPool::updateStakingIndexCall { newIndex: index.0 }.abi_encode()
            }
            Self::SetStakingIndex => Marketplace::setStakingIndexCall {
                _stakingIndex: index.0,
            }
            .abi_encode(),
        }
        .into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Addresses {
    /// Contract holding the authoritative index on the source ledger.
    pub source: Address,
    pub swap_pool: Address,
    pub marketplace: Address,
}

/// Everything that differs between deployments, fixed for the lifetime of the
/// process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    pub deployment: Deployment,
    pub addresses: Addresses,
    pub getter: IndexGetter,
    pub deposit_layout: DepositLayout,
    pub pool_function: TargetFunction,
    pub marketplace_function: TargetFunction,
}

impl Profile {
    pub fn new(deployment: Deployment, addresses: Addresses) -> Self {
        let (getter, deposit_layout) = match deployment {
            Deployment::Thanos => (IndexGetter::GetStakingIndex, DepositLayout::WithTokenFlag),
            Deployment::Titan => (IndexGetter::StakingIndex, DepositLayout::WithoutTokenFlag),
        };
        Self {
            deployment,
            addresses,
            getter,
            deposit_layout,
            pool_function: TargetFunction::UpdateStakingIndex,
            marketplace_function: TargetFunction::SetStakingIndex,
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{U256, hex},
    };

    #[test]
    fn profiles_pick_revision_specific_layouts() {
        let addresses = Addresses {
            source: Address::repeat_byte(1),
            swap_pool: Address::repeat_byte(2),
            marketplace: Address::repeat_byte(3),
        };
        let thanos = Profile::new(Deployment::Thanos, addresses);
        assert_eq!(thanos.getter, IndexGetter::GetStakingIndex);
        assert_eq!(thanos.deposit_layout, DepositLayout::WithTokenFlag);

        let titan = Profile::new(Deployment::Titan, addresses);
        assert_eq!(titan.getter, IndexGetter::StakingIndex);
        assert_eq!(titan.deposit_layout, DepositLayout::WithoutTokenFlag);
        assert_eq!(titan.pool_function, TargetFunction::UpdateStakingIndex);
        assert_eq!(titan.marketplace_function, TargetFunction::SetStakingIndex);
    }

    #[test]
    fn target_calls_carry_index_verbatim() {
        let index = StakingIndex(U256::from(1_050_000_000_000_000_000_u64));
        let pool = TargetFunction::UpdateStakingIndex.encode(index);
        let marketplace = TargetFunction::SetStakingIndex.encode(index);

        assert_eq!(&pool[..4], WstonSwapPool::updateStakingIndexCall::SELECTOR);
        assert_eq!(&marketplace[..4], Marketplace::setStakingIndexCall::SELECTOR);
        assert_eq!(pool[4..], marketplace[4..]);
        assert_eq!(U256::from_be_slice(&pool[4..]), index.0);
    }

    #[test]
    fn decodes_getter_return_data() {
        let data = hex!("0000000000000000000000000000000000000000000000000e92596fd6290000");
        let index = IndexGetter::StakingIndex.decode(&data).unwrap();
        assert_eq!(index.0, U256::from(1_050_000_000_000_000_000_u64));
        assert!(IndexGetter::GetStakingIndex.decode(&data[..16]).is_err());
    }
}
