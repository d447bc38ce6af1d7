//! Commitment storage trait.

use crate::StoreError;
use tcr_types::{Address, Commitment};

/// Hidden vote commitments, stored in a per-ballot namespace until revealed.
pub trait CommitmentStore {
    fn put_commitment(
        &self,
        identifier: &str,
        voter: &Address,
        commitment: &Commitment,
    ) -> Result<(), StoreError>;

    fn get_commitment(
        &self,
        identifier: &str,
        voter: &Address,
    ) -> Result<Option<Commitment>, StoreError>;

    /// Remove one commitment. Absent keys are a no-op.
    fn delete_commitment(&self, identifier: &str, voter: &Address) -> Result<(), StoreError>;

    /// Voters that committed on a ballot but have not revealed, in address order.
    fn committers(&self, identifier: &str) -> Result<Vec<Address>, StoreError>;
}
