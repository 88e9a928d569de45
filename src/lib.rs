//! # Reward Vault Server
//!
//! Settlement and claim service for the on-chain reward vault. Aggregates
//! off-chain game-reward records into a Merkle commitment, publishes the
//! root only when it changes, and lets players prove and redeem their
//! entitlement against the committed root.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    REWARD VAULT SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── units.rs    - 5-decimal claim-unit scaling              │
//! │  ├── leaf.rs     - Canonical (wallet, token, amount) leaves  │
//! │  ├── merkle.rs   - Sorted-pair tree, proofs, verification    │
//! │  └── snapshot.rs - Persisted leaf sets, exact rebuilds       │
//! │                                                              │
//! │  rewards/        - Reward aggregator boundary                │
//! │  ├── record.rs   - Records and the data-quality filter       │
//! │  └── store.rs    - Store trait + HTTP client                 │
//! │                                                              │
//! │  chain/          - Chain boundary and the two flows          │
//! │  ├── contract.rs - Vault bindings, ChainClient seam          │
//! │  ├── fees.rs     - Fee probe, strategy, 20% buffer           │
//! │  ├── settlement.rs - Scheduled root publication              │
//! │  └── claim.rs    - Simulate-then-submit claims               │
//! │                                                              │
//! │  service/        - Exposed HTTP surface (two operations)     │
//! │  ├── auth.rs     - Scheduler secret + claimant JWTs          │
//! │  └── mod.rs      - Router, handlers, error mapping           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Everything under `core/` is bit-reproducible: leaf encoding matches
//! the on-chain verifier byte-for-byte, tree construction is a pure
//! function of the leaf set, and a tree rebuilt from a persisted
//! snapshot yields the identical root. Settlement is idempotent - the
//! freshly computed root is compared against a fresh on-chain read, and
//! an unchanged root sends nothing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod chain;
pub mod core;
pub mod rewards;
pub mod service;

// Re-export commonly used types
pub use chain::claim::{ClaimCoordinator, ClaimError, ClaimTransaction};
pub use chain::contract::{ChainClient, VaultChainClient};
pub use chain::settlement::{
    SettlementOutcome, SettlementSubmitter, SettlementTransaction, CONFIRMATION_TIMEOUT,
    REQUIRED_CONFIRMATIONS,
};
pub use crate::core::leaf::{encode_leaf, Leaf};
pub use crate::core::merkle::{RewardTree, EMPTY_ROOT};
pub use crate::core::snapshot::LeafSnapshot;
pub use rewards::record::RewardRecord;
pub use rewards::store::{HttpRewardStore, RewardStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
