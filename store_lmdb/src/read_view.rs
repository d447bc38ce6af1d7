//! Read-only snapshots for queries and export.

use heed::RoTxn;

use tcr_store::StoreError;
use tcr_types::{Address, Amount, Ballot, BlockHeight, Listing};

use crate::environment::LmdbEnvironment;
use crate::read;
use crate::LmdbError;

/// A consistent view of the committed state, backed by an LMDB read
/// transaction. Unlike a [`WriteBatch`](crate::WriteBatch) it does not hold
/// the environment's writer lock, so queries never wait on block processing.
pub struct ReadView<'a> {
    txn: RoTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> ReadView<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().read_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    pub fn get_listing(&self, identifier: &str) -> Result<Option<Listing>, StoreError> {
        Ok(read::record(
            &self.env.listings_db,
            &self.txn,
            identifier.as_bytes(),
            "listing",
        )?)
    }

    pub fn iter_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(read::records(&self.env.listings_db, &self.txn, "listing")?)
    }

    pub fn get_ballot(&self, identifier: &str) -> Result<Option<Ballot>, StoreError> {
        Ok(read::record(
            &self.env.ballots_db,
            &self.txn,
            identifier.as_bytes(),
            "ballot",
        )?)
    }

    pub fn ballot_count(&self) -> Result<u64, StoreError> {
        Ok(self
            .env
            .ballots_db
            .len(&self.txn)
            .map_err(LmdbError::from)?)
    }

    pub fn queue_len(&self) -> Result<u64, StoreError> {
        Ok(self.env.queue_db.len(&self.txn).map_err(LmdbError::from)?)
    }

    pub fn balance(&self, address: &Address) -> Result<Amount, StoreError> {
        Ok(read::balance(&self.env.balances_db, &self.txn, address)?)
    }

    pub fn iter_balances(&self) -> Result<Vec<(Address, Amount)>, StoreError> {
        Ok(read::balances(&self.env.balances_db, &self.txn)?)
    }

    pub fn last_height(&self) -> Result<Option<BlockHeight>, StoreError> {
        Ok(read::last_height(&self.env.meta_db, &self.txn)?)
    }

    pub fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(read::schema_version(&self.env.meta_db, &self.txn)?)
    }
}
