//! Proposal queue storage trait.

use crate::StoreError;

/// A persistent FIFO of ballot identifiers awaiting resolution.
pub trait ProposalQueueStore {
    /// Append an identifier at the tail.
    fn enqueue(&self, identifier: &str) -> Result<(), StoreError>;

    /// The earliest enqueued identifier, if any.
    fn queue_head(&self) -> Result<Option<String>, StoreError>;

    /// Remove the head. Popping an empty queue is a no-op.
    fn queue_pop(&self) -> Result<(), StoreError>;

    fn queue_len(&self) -> Result<u64, StoreError>;
}
