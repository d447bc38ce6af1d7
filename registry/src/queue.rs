//! FIFO proposal queue.
//!
//! Ballots resolve strictly in enqueue order, at most one per block. An entry
//! whose ballot no longer exists (removed by a stale-bond challenge) is
//! discarded when it reaches the head, so it can never block the queue.

use tcr_store::RegistryStore;
use tcr_types::Ballot;

use crate::error::RegistryError;

pub struct ProposalQueue<'s, S> {
    store: &'s S,
}

impl<'s, S: RegistryStore> ProposalQueue<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn enqueue(&self, identifier: &str) -> Result<(), RegistryError> {
        self.store.enqueue(identifier)?;
        Ok(())
    }

    /// The ballot of the earliest-enqueued live entry, if any.
    pub fn head(&self) -> Result<Option<Ballot>, RegistryError> {
        while let Some(identifier) = self.store.queue_head()? {
            if let Some(ballot) = self.store.get_ballot(&identifier)? {
                return Ok(Some(ballot));
            }
            tracing::warn!(identifier = %identifier, "discarding queue entry for removed ballot");
            self.store.queue_pop()?;
        }
        Ok(None)
    }

    pub fn pop(&self) -> Result<(), RegistryError> {
        self.store.queue_pop()?;
        Ok(())
    }

    pub fn len(&self) -> Result<u64, RegistryError> {
        Ok(self.store.queue_len()?)
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len()? == 0)
    }
}
