//! Abstract storage traits for the token-curated registry.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The registry core depends only on the traits.
//!
//! Lookups of absent keys return `Ok(None)` and deletes of absent keys are
//! no-ops; only backend and decoding failures are errors.

pub mod balance;
pub mod ballot;
pub mod commitment;
pub mod error;
pub mod listing;
pub mod meta;
pub mod queue;
pub mod vote;

pub use balance::BalanceStore;
pub use ballot::BallotStore;
pub use commitment::CommitmentStore;
pub use error::StoreError;
pub use listing::ListingStore;
pub use meta::MetaStore;
pub use queue::ProposalQueueStore;
pub use vote::{VoteKey, VoteStore};

/// Everything the registry core needs from a backend.
pub trait RegistryStore:
    ListingStore + BallotStore + VoteStore + CommitmentStore + ProposalQueueStore + BalanceStore
{
}

impl<T> RegistryStore for T where
    T: ListingStore + BallotStore + VoteStore + CommitmentStore + ProposalQueueStore + BalanceStore
{
}
