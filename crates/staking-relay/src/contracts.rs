//! ABI fragments of the contracts the relay talks to.

alloy::sol! {
    /// Source contract as deployed next to the Thanos target ledger.
    interface L1WrappedStakedTonThanos {
        event Deposited(
            address to,
            bool token,
            uint256 amount,
            uint256 wstonAmount,
            uint256 depositTime,
            uint256 depositBlockNumber
        );

        function getStakingIndex() external view returns (uint256);
    }

    /// Source contract as deployed next to the Titan target ledger.
    interface L1WrappedStakedTonTitan {
        event Deposited(
            address to,
            uint256 amount,
            uint256 wstonAmount,
            uint256 depositTime,
            uint256 depositBlockNumber
        );

        function stakingIndex() external view returns (uint256);
    }

    /// Events shared by every source contract revision.
    interface L1WrappedStakedTon {
        event WithdrawalRequested(address indexed _to, uint256 amount);
    }

    interface WstonSwapPool {
        function updateStakingIndex(uint256 newIndex) external;
    }

    interface Marketplace {
        function setStakingIndex(uint256 _stakingIndex) external;
    }
}
