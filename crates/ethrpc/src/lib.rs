pub mod alloy;

use ::alloy::providers::DynProvider;

/// Type-erased provider shared by every component talking to a ledger.
pub type AlloyProvider = DynProvider;
