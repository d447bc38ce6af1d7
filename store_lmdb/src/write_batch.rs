//! Write batching: every registry store trait implemented on top of a
//! single LMDB write transaction.
//!
//! # Usage
//!
//! ```ignore
//! let batch = env.write_batch()?;
//! router.deliver(&batch, height, msg)?;
//! SettlementEngine::new(&batch, params).settle(height)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//! Reads inside the batch observe its own uncommitted writes.

use std::cell::RefCell;

use heed::RwTxn;
use serde::Serialize;

use tcr_store::{
    BalanceStore, BallotStore, CommitmentStore, ListingStore, MetaStore, ProposalQueueStore,
    StoreError, VoteKey, VoteStore,
};
use tcr_types::{Address, Amount, Ballot, BlockHeight, Commitment, Listing, VoteRecord};

use crate::environment::LmdbEnvironment;
use crate::keys::{namespace_prefix, namespaced_key, queue_key, queue_seq, voter_from_key};
use crate::read::{self, decode, LAST_HEIGHT_KEY, SCHEMA_VERSION_KEY};
use crate::LmdbError;

/// A write batch that groups every store operation of one block into a single
/// LMDB write transaction.
///
/// The store traits take `&self`, so the transaction sits in a `RefCell`;
/// the batch is therefore confined to the thread that opened it.
pub struct WriteBatch<'a> {
    txn: RefCell<RwTxn<'a>>,
    env: &'a LmdbEnvironment,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self {
            txn: RefCell::new(txn),
            env,
        })
    }

    /// Commit every operation in the batch atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.into_inner().commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_raw(
        &self,
        db: &heed::Database<heed::types::Bytes, heed::types::Bytes>,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, LmdbError> {
        let txn = self.txn.borrow();
        Ok(db.get(&txn, key)?.map(|v| v.to_vec()))
    }

    fn put_raw(
        &self,
        db: &heed::Database<heed::types::Bytes, heed::types::Bytes>,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), LmdbError> {
        let mut txn = self.txn.borrow_mut();
        db.put(&mut txn, key, value)?;
        Ok(())
    }

    fn delete_raw(
        &self,
        db: &heed::Database<heed::types::Bytes, heed::types::Bytes>,
        key: &[u8],
    ) -> Result<(), LmdbError> {
        let mut txn = self.txn.borrow_mut();
        db.delete(&mut txn, key)?;
        Ok(())
    }
}

// ── Listings ─────────────────────────────────────────────────────────────

impl ListingStore for WriteBatch<'_> {
    fn get_listing(&self, identifier: &str) -> Result<Option<Listing>, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::record(&self.env.listings_db, &txn, identifier.as_bytes(), "listing")?)
    }

    fn put_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        let bytes = encode(listing)?;
        self.put_raw(&self.env.listings_db, listing.identifier.as_bytes(), &bytes)?;
        Ok(())
    }

    fn delete_listing(&self, identifier: &str) -> Result<(), StoreError> {
        self.delete_raw(&self.env.listings_db, identifier.as_bytes())?;
        Ok(())
    }

    fn iter_listings(&self) -> Result<Vec<Listing>, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::records(&self.env.listings_db, &txn, "listing")?)
    }
}

// ── Ballots ──────────────────────────────────────────────────────────────

impl BallotStore for WriteBatch<'_> {
    fn get_ballot(&self, identifier: &str) -> Result<Option<Ballot>, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::record(&self.env.ballots_db, &txn, identifier.as_bytes(), "ballot")?)
    }

    fn put_ballot(&self, ballot: &Ballot) -> Result<(), StoreError> {
        let bytes = encode(ballot)?;
        self.put_raw(&self.env.ballots_db, ballot.identifier.as_bytes(), &bytes)?;
        Ok(())
    }

    fn delete_ballot(&self, identifier: &str) -> Result<(), StoreError> {
        self.delete_raw(&self.env.ballots_db, identifier.as_bytes())?;
        Ok(())
    }

    fn ballot_count(&self) -> Result<u64, StoreError> {
        let txn = self.txn.borrow();
        Ok(self.env.ballots_db.len(&txn).map_err(LmdbError::from)?)
    }
}

// ── Votes ────────────────────────────────────────────────────────────────

impl VoteStore for WriteBatch<'_> {
    fn put_vote(
        &self,
        identifier: &str,
        voter: &Address,
        vote: &VoteRecord,
    ) -> Result<(), StoreError> {
        let bytes = encode(vote)?;
        self.put_raw(&self.env.votes_db, &namespaced_key(identifier, voter), &bytes)?;
        Ok(())
    }

    fn get_vote(&self, identifier: &str, voter: &Address) -> Result<Option<VoteRecord>, StoreError> {
        let txn = self.txn.borrow();
        let key = namespaced_key(identifier, voter);
        Ok(read::record(&self.env.votes_db, &txn, &key, "vote record")?)
    }

    fn votes(&self, identifier: &str) -> Result<Vec<(Address, VoteRecord)>, StoreError> {
        let prefix = namespace_prefix(identifier);
        let txn = self.txn.borrow();
        let iter = self
            .env
            .votes_db
            .prefix_iter(&txn, &prefix)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let voter = voter_from_key(key, prefix.len())?;
            results.push((voter, decode(val, "vote record")?));
        }
        Ok(results)
    }

    fn delete_votes(&self, keys: &[VoteKey]) -> Result<(), StoreError> {
        for key in keys {
            self.delete_raw(
                &self.env.votes_db,
                &namespaced_key(&key.identifier, &key.voter),
            )?;
        }
        Ok(())
    }
}

// ── Commitments ──────────────────────────────────────────────────────────

impl CommitmentStore for WriteBatch<'_> {
    fn put_commitment(
        &self,
        identifier: &str,
        voter: &Address,
        commitment: &Commitment,
    ) -> Result<(), StoreError> {
        self.put_raw(
            &self.env.commitments_db,
            &namespaced_key(identifier, voter),
            commitment.as_bytes(),
        )?;
        Ok(())
    }

    fn get_commitment(
        &self,
        identifier: &str,
        voter: &Address,
    ) -> Result<Option<Commitment>, StoreError> {
        match self.get_raw(&self.env.commitments_db, &namespaced_key(identifier, voter))? {
            Some(bytes) => {
                let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                    LmdbError::Corruption("invalid commitment length".to_string())
                })?;
                Ok(Some(Commitment::new(arr)))
            }
            None => Ok(None),
        }
    }

    fn delete_commitment(&self, identifier: &str, voter: &Address) -> Result<(), StoreError> {
        self.delete_raw(&self.env.commitments_db, &namespaced_key(identifier, voter))?;
        Ok(())
    }

    fn committers(&self, identifier: &str) -> Result<Vec<Address>, StoreError> {
        let prefix = namespace_prefix(identifier);
        let txn = self.txn.borrow();
        let iter = self
            .env
            .commitments_db
            .prefix_iter(&txn, &prefix)
            .map_err(LmdbError::from)?;
        let mut voters = Vec::new();
        for entry in iter {
            let (key, _val) = entry.map_err(LmdbError::from)?;
            voters.push(voter_from_key(key, prefix.len())?);
        }
        Ok(voters)
    }
}

// ── Proposal queue ───────────────────────────────────────────────────────

impl ProposalQueueStore for WriteBatch<'_> {
    fn enqueue(&self, identifier: &str) -> Result<(), StoreError> {
        let next = {
            let txn = self.txn.borrow();
            match self.env.queue_db.last(&txn).map_err(LmdbError::from)? {
                Some((key, _)) => queue_seq(key)?
                    .checked_add(1)
                    .ok_or_else(|| LmdbError::Corruption("queue sequence exhausted".into()))?,
                None => 0,
            }
        };
        self.put_raw(&self.env.queue_db, &queue_key(next), identifier.as_bytes())?;
        Ok(())
    }

    fn queue_head(&self) -> Result<Option<String>, StoreError> {
        let txn = self.txn.borrow();
        match self.env.queue_db.first(&txn).map_err(LmdbError::from)? {
            Some((_key, val)) => {
                let id = std::str::from_utf8(val)
                    .map_err(|e| LmdbError::Corruption(format!("queue entry: {}", e)))?;
                Ok(Some(id.to_string()))
            }
            None => Ok(None),
        }
    }

    fn queue_pop(&self) -> Result<(), StoreError> {
        let head = {
            let txn = self.txn.borrow();
            self.env
                .queue_db
                .first(&txn)
                .map_err(LmdbError::from)?
                .map(|(key, _)| key.to_vec())
        };
        if let Some(key) = head {
            self.delete_raw(&self.env.queue_db, &key)?;
        }
        Ok(())
    }

    fn queue_len(&self) -> Result<u64, StoreError> {
        let txn = self.txn.borrow();
        Ok(self.env.queue_db.len(&txn).map_err(LmdbError::from)?)
    }
}

// ── Balances ─────────────────────────────────────────────────────────────

impl BalanceStore for WriteBatch<'_> {
    fn balance(&self, address: &Address) -> Result<Amount, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::balance(&self.env.balances_db, &txn, address)?)
    }

    fn credit(&self, address: &Address, amount: Amount) -> Result<(), StoreError> {
        let current = self.balance(address)?;
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::Overflow(address.to_string()))?;
        self.put_raw(
            &self.env.balances_db,
            address.as_str().as_bytes(),
            &updated.raw().to_be_bytes(),
        )?;
        Ok(())
    }

    fn debit(&self, address: &Address, amount: Amount) -> Result<(), StoreError> {
        let current = self.balance(address)?;
        let updated = current
            .checked_sub(amount)
            .ok_or_else(|| StoreError::InsufficientFunds {
                address: address.to_string(),
                available: current,
                needed: amount,
            })?;
        if updated.is_zero() {
            self.delete_raw(&self.env.balances_db, address.as_str().as_bytes())?;
        } else {
            self.put_raw(
                &self.env.balances_db,
                address.as_str().as_bytes(),
                &updated.raw().to_be_bytes(),
            )?;
        }
        Ok(())
    }

    fn iter_balances(&self) -> Result<Vec<(Address, Amount)>, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::balances(&self.env.balances_db, &txn)?)
    }
}

// ── Meta ─────────────────────────────────────────────────────────────────

impl MetaStore for WriteBatch<'_> {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.put_raw(&self.env.meta_db, key.as_bytes(), value)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get_raw(&self.env.meta_db, key.as_bytes())?)
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::schema_version(&self.env.meta_db, &txn)?)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_le_bytes())
    }

    fn last_height(&self) -> Result<Option<BlockHeight>, StoreError> {
        let txn = self.txn.borrow();
        Ok(read::last_height(&self.env.meta_db, &txn)?)
    }

    fn set_last_height(&self, height: BlockHeight) -> Result<(), StoreError> {
        self.put_meta(LAST_HEIGHT_KEY, &height.as_u64().to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).expect("open env");
        (dir, env)
    }

    fn addr(name: &str) -> Address {
        Address::new(format!("tcr_{}", name))
    }

    #[test]
    fn ballot_put_get_delete() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        let ballot = Ballot::pending("X", addr("owner"), Amount::new(50), BlockHeight::new(5));

        batch.put_ballot(&ballot).unwrap();
        assert_eq!(batch.get_ballot("X").unwrap(), Some(ballot));
        assert_eq!(batch.ballot_count().unwrap(), 1);

        batch.delete_ballot("X").unwrap();
        assert_eq!(batch.get_ballot("X").unwrap(), None);
        // Deleting again is a no-op.
        batch.delete_ballot("X").unwrap();
    }

    #[test]
    fn committed_batch_persists() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        batch
            .put_listing(&Listing {
                identifier: "X".into(),
                votes: Amount::new(200),
            })
            .unwrap();
        batch.commit().unwrap();

        let batch = env.write_batch().unwrap();
        assert_eq!(batch.get_listing("X").unwrap().unwrap().votes, Amount::new(200));
    }

    #[test]
    fn dropped_batch_does_not_persist() {
        let (_dir, env) = temp_env();
        {
            let batch = env.write_batch().unwrap();
            batch.credit(&addr("alice"), Amount::new(10)).unwrap();
            batch.enqueue("X").unwrap();
        }
        let batch = env.write_batch().unwrap();
        assert_eq!(batch.balance(&addr("alice")).unwrap(), Amount::ZERO);
        assert_eq!(batch.queue_len().unwrap(), 0);
    }

    #[test]
    fn votes_scoped_and_ordered_by_voter() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        let yes = VoteRecord {
            choice: true,
            power: Amount::new(5),
        };
        batch.put_vote("ab", &addr("carol"), &yes).unwrap();
        batch.put_vote("ab", &addr("alice"), &yes).unwrap();
        batch.put_vote("abc", &addr("bob"), &yes).unwrap();

        let votes = batch.votes("ab").unwrap();
        let voters: Vec<_> = votes.iter().map(|(v, _)| v.clone()).collect();
        assert_eq!(voters, vec![addr("alice"), addr("carol")]);

        batch
            .delete_votes(&[
                VoteKey::new("ab", addr("alice")),
                VoteKey::new("ab", addr("carol")),
                VoteKey::new("ab", addr("nobody")),
            ])
            .unwrap();
        assert!(batch.votes("ab").unwrap().is_empty());
        assert_eq!(batch.votes("abc").unwrap().len(), 1);
    }

    #[test]
    fn queue_is_fifo() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        assert_eq!(batch.queue_head().unwrap(), None);
        batch.queue_pop().unwrap();

        batch.enqueue("first").unwrap();
        batch.enqueue("second").unwrap();
        assert_eq!(batch.queue_head().unwrap().as_deref(), Some("first"));
        batch.queue_pop().unwrap();
        assert_eq!(batch.queue_head().unwrap().as_deref(), Some("second"));
        batch.enqueue("third").unwrap();
        assert_eq!(batch.queue_len().unwrap(), 2);
    }

    #[test]
    fn debit_rejects_overdraft_without_writing() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        let alice = addr("alice");
        batch.credit(&alice, Amount::new(30)).unwrap();

        let err = batch.debit(&alice, Amount::new(31)).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds { .. }));
        assert_eq!(batch.balance(&alice).unwrap(), Amount::new(30));

        batch.debit(&alice, Amount::new(30)).unwrap();
        assert!(batch.iter_balances().unwrap().is_empty());
    }

    #[test]
    fn commitments_roundtrip() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        let voter = addr("voter");
        let c = Commitment::compute("X", &voter, true, Amount::new(3), b"s");
        batch.put_commitment("X", &voter, &c).unwrap();
        assert_eq!(batch.get_commitment("X", &voter).unwrap(), Some(c));
        assert_eq!(batch.committers("X").unwrap(), vec![voter.clone()]);
        batch.delete_commitment("X", &voter).unwrap();
        assert_eq!(batch.get_commitment("X", &voter).unwrap(), None);
    }

    #[test]
    fn corrupt_ballot_surfaces_as_error() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        batch
            .put_raw(&env.ballots_db, b"X", &[0xff, 0x01])
            .unwrap();
        assert!(matches!(
            batch.get_ballot("X"),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn last_height_roundtrip() {
        let (_dir, env) = temp_env();
        let batch = env.write_batch().unwrap();
        assert_eq!(batch.last_height().unwrap(), None);
        batch.set_last_height(BlockHeight::new(42)).unwrap();
        assert_eq!(batch.last_height().unwrap(), Some(BlockHeight::new(42)));
    }
}
