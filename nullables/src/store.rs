//! Nullable store: thread-safe in-memory registry storage for testing.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use tcr_store::{
    BalanceStore, BallotStore, CommitmentStore, ListingStore, MetaStore, ProposalQueueStore,
    StoreError, VoteKey, VoteStore,
};
use tcr_types::{Address, Amount, Ballot, BlockHeight, Commitment, Listing, VoteRecord};

/// An in-memory implementation of every registry store trait.
///
/// Ordered maps keep iteration order identical to the LMDB backend, so
/// settlement produces the same payout sequence on both.
pub struct NullRegistryStore {
    listings: Mutex<BTreeMap<String, Listing>>,
    ballots: Mutex<BTreeMap<String, Ballot>>,
    votes: Mutex<BTreeMap<(String, Address), VoteRecord>>,
    commitments: Mutex<BTreeMap<(String, Address), Commitment>>,
    queue: Mutex<VecDeque<String>>,
    balances: Mutex<BTreeMap<Address, Amount>>,
    meta: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl NullRegistryStore {
    pub fn new() -> Self {
        Self {
            listings: Mutex::new(BTreeMap::new()),
            ballots: Mutex::new(BTreeMap::new()),
            votes: Mutex::new(BTreeMap::new()),
            commitments: Mutex::new(BTreeMap::new()),
            queue: Mutex::new(VecDeque::new()),
            balances: Mutex::new(BTreeMap::new()),
            meta: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed a set of balances.
    pub fn with_balances(balances: &[(Address, Amount)]) -> Self {
        let store = Self::new();
        {
            let mut map = store.balances.lock().unwrap();
            for (address, amount) in balances {
                map.insert(address.clone(), *amount);
            }
        }
        store
    }

    /// Sum of every account balance.
    pub fn total_balance(&self) -> u128 {
        self.balances
            .lock()
            .unwrap()
            .values()
            .map(|a| a.raw() as u128)
            .sum()
    }

    /// Sum of every ballot bond still held in escrow.
    pub fn total_escrow(&self) -> u128 {
        self.ballots
            .lock()
            .unwrap()
            .values()
            .map(|b| b.bond.raw() as u128)
            .sum()
    }
}

impl Default for NullRegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingStore for NullRegistryStore {
    fn get_listing(&self, identifier: &str) -> Result<Option<Listing>, StoreError> {
        Ok(self.listings.lock().unwrap().get(identifier).cloned())
    }

    fn put_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        self.listings
            .lock()
            .unwrap()
            .insert(listing.identifier.clone(), listing.clone());
        Ok(())
    }

    fn delete_listing(&self, identifier: &str) -> Result<(), StoreError> {
        self.listings.lock().unwrap().remove(identifier);
        Ok(())
    }

    fn iter_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(self.listings.lock().unwrap().values().cloned().collect())
    }
}

impl BallotStore for NullRegistryStore {
    fn get_ballot(&self, identifier: &str) -> Result<Option<Ballot>, StoreError> {
        Ok(self.ballots.lock().unwrap().get(identifier).cloned())
    }

    fn put_ballot(&self, ballot: &Ballot) -> Result<(), StoreError> {
        self.ballots
            .lock()
            .unwrap()
            .insert(ballot.identifier.clone(), ballot.clone());
        Ok(())
    }

    fn delete_ballot(&self, identifier: &str) -> Result<(), StoreError> {
        self.ballots.lock().unwrap().remove(identifier);
        Ok(())
    }

    fn ballot_count(&self) -> Result<u64, StoreError> {
        Ok(self.ballots.lock().unwrap().len() as u64)
    }
}

impl VoteStore for NullRegistryStore {
    fn put_vote(
        &self,
        identifier: &str,
        voter: &Address,
        vote: &VoteRecord,
    ) -> Result<(), StoreError> {
        self.votes
            .lock()
            .unwrap()
            .insert((identifier.to_string(), voter.clone()), *vote);
        Ok(())
    }

    fn get_vote(&self, identifier: &str, voter: &Address) -> Result<Option<VoteRecord>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .get(&(identifier.to_string(), voter.clone()))
            .copied())
    }

    fn votes(&self, identifier: &str) -> Result<Vec<(Address, VoteRecord)>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|((id, _), _)| id == identifier)
            .map(|((_, voter), vote)| (voter.clone(), *vote))
            .collect())
    }

    fn delete_votes(&self, keys: &[VoteKey]) -> Result<(), StoreError> {
        let mut votes = self.votes.lock().unwrap();
        for key in keys {
            votes.remove(&(key.identifier.clone(), key.voter.clone()));
        }
        Ok(())
    }
}

impl CommitmentStore for NullRegistryStore {
    fn put_commitment(
        &self,
        identifier: &str,
        voter: &Address,
        commitment: &Commitment,
    ) -> Result<(), StoreError> {
        self.commitments
            .lock()
            .unwrap()
            .insert((identifier.to_string(), voter.clone()), *commitment);
        Ok(())
    }

    fn get_commitment(
        &self,
        identifier: &str,
        voter: &Address,
    ) -> Result<Option<Commitment>, StoreError> {
        Ok(self
            .commitments
            .lock()
            .unwrap()
            .get(&(identifier.to_string(), voter.clone()))
            .copied())
    }

    fn delete_commitment(&self, identifier: &str, voter: &Address) -> Result<(), StoreError> {
        self.commitments
            .lock()
            .unwrap()
            .remove(&(identifier.to_string(), voter.clone()));
        Ok(())
    }

    fn committers(&self, identifier: &str) -> Result<Vec<Address>, StoreError> {
        Ok(self
            .commitments
            .lock()
            .unwrap()
            .keys()
            .filter(|(id, _)| id == identifier)
            .map(|(_, voter)| voter.clone())
            .collect())
    }
}

impl ProposalQueueStore for NullRegistryStore {
    fn enqueue(&self, identifier: &str) -> Result<(), StoreError> {
        self.queue.lock().unwrap().push_back(identifier.to_string());
        Ok(())
    }

    fn queue_head(&self) -> Result<Option<String>, StoreError> {
        Ok(self.queue.lock().unwrap().front().cloned())
    }

    fn queue_pop(&self) -> Result<(), StoreError> {
        self.queue.lock().unwrap().pop_front();
        Ok(())
    }

    fn queue_len(&self) -> Result<u64, StoreError> {
        Ok(self.queue.lock().unwrap().len() as u64)
    }
}

impl BalanceStore for NullRegistryStore {
    fn balance(&self, address: &Address) -> Result<Amount, StoreError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(Amount::ZERO))
    }

    fn credit(&self, address: &Address, amount: Amount) -> Result<(), StoreError> {
        let mut balances = self.balances.lock().unwrap();
        let entry = balances.entry(address.clone()).or_insert(Amount::ZERO);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| StoreError::Overflow(address.to_string()))?;
        Ok(())
    }

    fn debit(&self, address: &Address, amount: Amount) -> Result<(), StoreError> {
        let mut balances = self.balances.lock().unwrap();
        let available = balances.get(address).copied().unwrap_or(Amount::ZERO);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| StoreError::InsufficientFunds {
                    address: address.to_string(),
                    available,
                    needed: amount,
                })?;
        if remaining.is_zero() {
            balances.remove(address);
        } else {
            balances.insert(address.clone(), remaining);
        }
        Ok(())
    }

    fn iter_balances(&self) -> Result<Vec<(Address, Amount)>, StoreError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(address, amount)| (address.clone(), *amount))
            .collect())
    }
}

impl MetaStore for NullRegistryStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta("schema_version")? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Corruption("schema_version".into()))?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta("schema_version", &version.to_le_bytes())
    }

    fn last_height(&self) -> Result<Option<BlockHeight>, StoreError> {
        match self.get_meta("last_height")? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Corruption("last_height".into()))?;
                Ok(Some(BlockHeight::new(u64::from_be_bytes(arr))))
            }
            None => Ok(None),
        }
    }

    fn set_last_height(&self, height: BlockHeight) -> Result<(), StoreError> {
        self.put_meta("last_height", &height.as_u64().to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(name: &str) -> Address {
        Address::new(format!("tcr_{}", name))
    }

    #[test]
    fn test_absent_records_are_none() {
        let store = NullRegistryStore::new();
        assert_eq!(store.get_ballot("X").unwrap(), None);
        assert_eq!(store.get_listing("X").unwrap(), None);
        assert_eq!(store.balance(&addr("a")).unwrap(), Amount::ZERO);
        store.delete_ballot("X").unwrap();
    }

    #[test]
    fn test_votes_scoped_to_ballot() {
        let store = NullRegistryStore::new();
        let v = VoteRecord {
            choice: false,
            power: Amount::new(2),
        };
        store.put_vote("ab", &addr("b"), &v).unwrap();
        store.put_vote("ab", &addr("a"), &v).unwrap();
        store.put_vote("abc", &addr("c"), &v).unwrap();
        let voters: Vec<_> = store
            .votes("ab")
            .unwrap()
            .into_iter()
            .map(|(a, _)| a)
            .collect();
        assert_eq!(voters, vec![addr("a"), addr("b")]);
    }

    #[test]
    fn test_queue_fifo() {
        let store = NullRegistryStore::new();
        store.enqueue("one").unwrap();
        store.enqueue("two").unwrap();
        assert_eq!(store.queue_head().unwrap().as_deref(), Some("one"));
        store.queue_pop().unwrap();
        assert_eq!(store.queue_head().unwrap().as_deref(), Some("two"));
        store.queue_pop().unwrap();
        store.queue_pop().unwrap();
        assert_eq!(store.queue_len().unwrap(), 0);
    }

    #[test]
    fn test_debit_overdraft() {
        let store = NullRegistryStore::with_balances(&[(addr("a"), Amount::new(10))]);
        assert!(matches!(
            store.debit(&addr("a"), Amount::new(11)),
            Err(StoreError::InsufficientFunds { .. })
        ));
        store.debit(&addr("a"), Amount::new(4)).unwrap();
        assert_eq!(store.balance(&addr("a")).unwrap(), Amount::new(6));
        assert_eq!(store.total_balance(), 6);
    }
}
