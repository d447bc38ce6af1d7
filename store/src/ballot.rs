//! Ballot storage trait.

use crate::StoreError;
use tcr_types::Ballot;

/// In-flight ballots, keyed by identifier.
pub trait BallotStore {
    fn get_ballot(&self, identifier: &str) -> Result<Option<Ballot>, StoreError>;

    fn put_ballot(&self, ballot: &Ballot) -> Result<(), StoreError>;

    /// Remove a ballot. Absent keys are a no-op.
    fn delete_ballot(&self, identifier: &str) -> Result<(), StoreError>;

    fn ballot_count(&self) -> Result<u64, StoreError>;
}
