//! Vote record storage trait.

use crate::StoreError;
use tcr_types::{Address, VoteRecord};

/// Key of one vote record: the ballot namespace plus the voter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoteKey {
    pub identifier: String,
    pub voter: Address,
}

impl VoteKey {
    pub fn new(identifier: impl Into<String>, voter: Address) -> Self {
        Self {
            identifier: identifier.into(),
            voter,
        }
    }
}

/// Revealed votes, stored in a per-ballot namespace.
pub trait VoteStore {
    /// Record a voter's vote on a ballot, replacing any earlier record.
    fn put_vote(
        &self,
        identifier: &str,
        voter: &Address,
        vote: &VoteRecord,
    ) -> Result<(), StoreError>;

    fn get_vote(&self, identifier: &str, voter: &Address) -> Result<Option<VoteRecord>, StoreError>;

    /// Every vote on one ballot, ordered by voter address.
    ///
    /// Only keys inside the ballot's namespace are visited; identifiers that
    /// share a textual prefix never leak into each other's results.
    fn votes(&self, identifier: &str) -> Result<Vec<(Address, VoteRecord)>, StoreError>;

    /// Delete a batch of vote records. Absent keys are a no-op.
    fn delete_votes(&self, keys: &[VoteKey]) -> Result<(), StoreError>;
}
