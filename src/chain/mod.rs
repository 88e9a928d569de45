//! Chain boundary and the two settlement flows.
//!
//! `contract` talks to the reward vault; `fees` prices submissions;
//! `settlement` and `claim` are the two operations this core exposes.

pub mod claim;
pub mod contract;
pub mod fees;
pub mod settlement;

pub use claim::{ClaimCoordinator, ClaimError, ClaimTransaction};
pub use contract::{ChainClient, ChainError, TxInclusion, VaultChainClient};
pub use fees::{FeeData, FeeStrategy, FEE_BUFFER_PERCENT};
pub use settlement::{
    SettlementOutcome, SettlementSubmitter, SettlementTransaction, TxStatus,
    CONFIRMATION_TIMEOUT, REQUIRED_CONFIRMATIONS,
};
