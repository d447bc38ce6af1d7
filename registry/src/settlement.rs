//! Settlement engine: resolves the ballot at the head of the proposal queue.
//!
//! Runs once per block, after every action of that block has been applied:
//!
//! 1. The head ballot is due once `height >= end_apply_block_stamp`.
//! 2. An unchallenged ballot becomes a listing with zero weight. Nothing is paid.
//! 3. A challenged ballot is accepted iff its approve share strictly exceeds
//!    the quorum. The winning party receives `floor(bond * dispensation)`;
//!    a winning challenger also gets its bond back.
//! 4. Every revealed voter gets their locked power back. Voters on the winning
//!    side additionally split the dividend pro rata to power.
//! 5. Vote records, unrevealed commitments and the ballot are removed.
//!
//! All arithmetic is integer with floor rounding. Per-voter rounding slack is
//! not reconciled.

use tcr_store::{RegistryStore, StoreError, VoteKey};
use tcr_types::{Address, Amount, BlockHeight, RegistryParams};

use crate::error::RegistryError;
use crate::keeper::BallotKeeper;
use crate::queue::ProposalQueue;

/// How a ballot was resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The entry is now listed.
    Accepted {
        /// No challenge was ever posted.
        unchallenged: bool,
    },
    /// The challenge succeeded and the entry is not listed.
    Rejected {
        /// No weight was revealed on either side.
        no_votes: bool,
    },
}

/// Payout to one revealed voter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterPayout {
    pub voter: Address,
    pub choice: bool,
    /// Power locked behind the vote; always returned.
    pub power: Amount,
    /// Whether the vote matched the outcome.
    pub voted_correctly: bool,
    /// Share of the dividend (zero for incorrect voters).
    pub dividend: Amount,
}

impl VoterPayout {
    pub fn credited(&self) -> u128 {
        self.power.raw() as u128 + self.dividend.raw() as u128
    }
}

/// Everything a single resolution did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementReport {
    pub identifier: String,
    pub height: BlockHeight,
    pub outcome: SettlementOutcome,
    pub bond: Amount,
    pub approve: Amount,
    pub deny: Amount,
    /// Owner on acceptance, challenger on rejection; `None` when unchallenged.
    pub party_payout: Option<(Address, Amount)>,
    pub voter_payouts: Vec<VoterPayout>,
    /// Commitments that were never revealed and have been discarded.
    pub expired_commitments: usize,
}

impl SettlementReport {
    /// Total coins credited by this resolution.
    pub fn total_credited(&self) -> u128 {
        let party = self
            .party_payout
            .as_ref()
            .map(|(_, amount)| amount.raw() as u128)
            .unwrap_or(0);
        party
            + self
                .voter_payouts
                .iter()
                .map(VoterPayout::credited)
                .sum::<u128>()
    }

    /// Total dividend paid to voters.
    pub fn voter_dividends(&self) -> u128 {
        self.voter_payouts
            .iter()
            .map(|p| p.dividend.raw() as u128)
            .sum()
    }
}

pub struct SettlementEngine<'s, S> {
    store: &'s S,
    params: RegistryParams,
}

impl<'s, S: RegistryStore> SettlementEngine<'s, S> {
    pub fn new(store: &'s S, params: RegistryParams) -> Self {
        Self { store, params }
    }

    /// Resolve the queue head if its deadline has passed.
    ///
    /// Returns `Ok(None)` when nothing is due. Any error means the block's
    /// writes must be discarded.
    pub fn settle(&self, height: BlockHeight) -> Result<Option<SettlementReport>, RegistryError> {
        let queue = ProposalQueue::new(self.store);
        let ballot = match queue.head()? {
            Some(ballot) if ballot.end_apply_block_stamp.has_elapsed(height) => ballot,
            _ => return Ok(None),
        };
        queue.pop()?;

        let keeper = BallotKeeper::new(self.store);
        let identifier = ballot.identifier.as_str();

        if !ballot.active {
            keeper.add_listing(identifier, Amount::ZERO)?;
            keeper.deactivate_ballot(identifier)?;
            tracing::info!(identifier, height = %height, "unchallenged ballot accepted");
            return Ok(Some(SettlementReport {
                identifier: identifier.to_string(),
                height,
                outcome: SettlementOutcome::Accepted { unchallenged: true },
                bond: ballot.bond,
                approve: ballot.approve,
                deny: ballot.deny,
                party_payout: None,
                voter_payouts: Vec::new(),
                expired_commitments: 0,
            }));
        }

        let challenger = ballot.challenger.clone().ok_or_else(|| {
            RegistryError::Store(StoreError::Corruption(format!(
                "active ballot {} has no challenger",
                identifier
            )))
        })?;
        let party_dividend = to_amount(self.params.dividend(ballot.bond), identifier)?;

        let (outcome, correct_choice, pool, party_payout) =
            if self.params.quorum_reached(ballot.approve, ballot.deny) {
                keeper.add_listing(identifier, ballot.approve)?;
                self.store.credit(&ballot.owner, party_dividend)?;
                (
                    SettlementOutcome::Accepted {
                        unchallenged: false,
                    },
                    true,
                    ballot.approve,
                    (ballot.owner.clone(), party_dividend),
                )
            } else {
                keeper.delete_listing(identifier)?;
                keeper.delete_ballot(identifier)?;
                let award = ballot
                    .bond
                    .checked_add(party_dividend)
                    .ok_or_else(|| RegistryError::Overflow(format!("award of {}", identifier)))?;
                self.store.credit(&challenger, award)?;
                (
                    SettlementOutcome::Rejected {
                        no_votes: ballot.total_votes() == 0,
                    },
                    false,
                    ballot.deny,
                    (challenger, award),
                )
            };

        let votes = self.store.votes(identifier)?;
        let mut voter_payouts = Vec::with_capacity(votes.len());
        let mut visited = Vec::with_capacity(votes.len());
        for (voter, vote) in votes {
            let voted_correctly = vote.choice == correct_choice;
            let share = if voted_correctly {
                self.params
                    .voter_dividend(ballot.bond, vote.power, pool)
                    .ok_or_else(|| {
                        RegistryError::Overflow(format!("dividend of {} on {}", voter, identifier))
                    })?
            } else {
                0
            };
            let payout = VoterPayout {
                voter: voter.clone(),
                choice: vote.choice,
                power: vote.power,
                voted_correctly,
                dividend: to_amount(share, identifier)?,
            };
            let credited = to_amount(payout.credited(), identifier)?;
            self.store.credit(&voter, credited)?;
            visited.push(VoteKey::new(identifier, voter));
            voter_payouts.push(payout);
        }
        self.store.delete_votes(&visited)?;

        let unrevealed = self.store.committers(identifier)?;
        for voter in &unrevealed {
            self.store.delete_commitment(identifier, voter)?;
        }

        keeper.deactivate_ballot(identifier)?;

        let report = SettlementReport {
            identifier: identifier.to_string(),
            height,
            outcome,
            bond: ballot.bond,
            approve: ballot.approve,
            deny: ballot.deny,
            party_payout: Some(party_payout),
            voter_payouts,
            expired_commitments: unrevealed.len(),
        };
        tracing::info!(
            identifier,
            height = %height,
            outcome = ?report.outcome,
            approve = %ballot.approve,
            deny = %ballot.deny,
            voters = report.voter_payouts.len(),
            credited = %report.total_credited(),
            "ballot settled"
        );
        Ok(Some(report))
    }
}

fn to_amount(value: u128, identifier: &str) -> Result<Amount, RegistryError> {
    Amount::from_wide(value)
        .ok_or_else(|| RegistryError::Overflow(format!("payout on {}", identifier)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcr_nullables::NullRegistryStore;
    use tcr_store::{BalanceStore, BallotStore, CommitmentStore, ListingStore, VoteStore};
    use tcr_types::Commitment;

    fn addr(name: &str) -> Address {
        Address::new(format!("tcr_{}", name))
    }

    fn h(n: u64) -> BlockHeight {
        BlockHeight::new(n)
    }

    fn params() -> RegistryParams {
        RegistryParams {
            min_deposit: Amount::new(10),
            apply_stage: 4,
            commit_stage: 2,
            reveal_stage: 2,
            dispensation_bps: 5000,
            quorum_bps: 5000,
        }
    }

    /// Propose "X" with bond 100 at height 0 and challenge it at height 1.
    /// Commit window ends at 3, reveal window at 5.
    fn challenged(store: &NullRegistryStore) {
        let keeper = BallotKeeper::new(store);
        keeper
            .propose(h(0), "X", &addr("owner"), Amount::new(100), 4)
            .unwrap();
        keeper
            .challenge(
                h(1),
                "X",
                &addr("challenger"),
                2,
                2,
                Amount::new(10),
                Amount::new(100),
            )
            .unwrap();
    }

    #[test]
    fn nothing_due_before_deadline() {
        let store = NullRegistryStore::new();
        challenged(&store);
        let engine = SettlementEngine::new(&store, params());
        assert_eq!(engine.settle(h(4)).unwrap(), None);
        assert!(store.get_ballot("X").unwrap().is_some());
    }

    #[test]
    fn empty_queue_is_noop() {
        let store = NullRegistryStore::new();
        let engine = SettlementEngine::new(&store, params());
        assert_eq!(engine.settle(h(100)).unwrap(), None);
    }

    #[test]
    fn unchallenged_ballot_becomes_listing() {
        let store = NullRegistryStore::new();
        BallotKeeper::new(&store)
            .propose(h(0), "X", &addr("owner"), Amount::new(100), 4)
            .unwrap();
        let engine = SettlementEngine::new(&store, params());

        let report = engine.settle(h(4)).unwrap().unwrap();
        assert_eq!(
            report.outcome,
            SettlementOutcome::Accepted { unchallenged: true }
        );
        assert_eq!(report.total_credited(), 0);
        assert_eq!(store.get_listing("X").unwrap().unwrap().votes, Amount::ZERO);
        assert_eq!(store.get_ballot("X").unwrap(), None);
        assert_eq!(store.total_balance(), 0);
    }

    #[test]
    fn approve_wins_pays_owner_and_correct_voters() {
        let store = NullRegistryStore::new();
        challenged(&store);
        let keeper = BallotKeeper::new(&store);
        keeper.vote("X", &addr("a"), true, Amount::new(30)).unwrap();
        keeper.vote("X", &addr("b"), true, Amount::new(10)).unwrap();
        keeper.vote("X", &addr("c"), false, Amount::new(20)).unwrap();

        let report = SettlementEngine::new(&store, params())
            .settle(h(5))
            .unwrap()
            .unwrap();

        assert_eq!(
            report.outcome,
            SettlementOutcome::Accepted {
                unchallenged: false
            }
        );
        // dividend = 100 * 50% = 50
        assert_eq!(store.balance(&addr("owner")).unwrap(), Amount::new(50));
        // 30 + 30*50/40 = 67, 10 + 10*50/40 = 22, 20 back
        assert_eq!(store.balance(&addr("a")).unwrap(), Amount::new(67));
        assert_eq!(store.balance(&addr("b")).unwrap(), Amount::new(22));
        assert_eq!(store.balance(&addr("c")).unwrap(), Amount::new(20));
        assert_eq!(store.balance(&addr("challenger")).unwrap(), Amount::ZERO);

        assert_eq!(store.get_listing("X").unwrap().unwrap().votes, Amount::new(40));
        assert_eq!(store.get_ballot("X").unwrap(), None);
        assert!(store.votes("X").unwrap().is_empty());
        assert_eq!(report.voter_dividends(), 49);
    }

    #[test]
    fn small_pool_dividend_is_floored_once() {
        let store = NullRegistryStore::new();
        let keeper = BallotKeeper::new(&store);
        keeper
            .propose(h(0), "X", &addr("owner"), Amount::new(3), 4)
            .unwrap();
        keeper
            .challenge(
                h(1),
                "X",
                &addr("challenger"),
                2,
                2,
                Amount::new(1),
                Amount::new(3),
            )
            .unwrap();
        keeper.vote("X", &addr("a"), true, Amount::new(2)).unwrap();
        keeper.vote("X", &addr("b"), true, Amount::new(1)).unwrap();

        let report = SettlementEngine::new(&store, params())
            .settle(h(5))
            .unwrap()
            .unwrap();

        // owner: floor(3 * 50%) = 1
        assert_eq!(store.balance(&addr("owner")).unwrap(), Amount::new(1));
        // a: 2 + floor(2/3 * 3 * 50%) = 3, b: 1 + floor(1/3 * 3 * 50%) = 1
        assert_eq!(store.balance(&addr("a")).unwrap(), Amount::new(3));
        assert_eq!(store.balance(&addr("b")).unwrap(), Amount::new(1));
        assert_eq!(report.voter_dividends(), 1);
    }

    #[test]
    fn deny_wins_removes_listing_and_pays_challenger() {
        let store = NullRegistryStore::new();
        challenged(&store);
        let keeper = BallotKeeper::new(&store);
        keeper.vote("X", &addr("a"), true, Amount::new(10)).unwrap();
        keeper.vote("X", &addr("b"), false, Amount::new(30)).unwrap();

        let report = SettlementEngine::new(&store, params())
            .settle(h(5))
            .unwrap()
            .unwrap();

        assert_eq!(
            report.outcome,
            SettlementOutcome::Rejected { no_votes: false }
        );
        assert_eq!(
            store.balance(&addr("challenger")).unwrap(),
            Amount::new(150)
        );
        assert_eq!(store.balance(&addr("a")).unwrap(), Amount::new(10));
        assert_eq!(store.balance(&addr("b")).unwrap(), Amount::new(80));
        assert_eq!(store.balance(&addr("owner")).unwrap(), Amount::ZERO);
        assert_eq!(store.get_listing("X").unwrap(), None);
        assert_eq!(store.get_ballot("X").unwrap(), None);
    }

    #[test]
    fn quorum_equality_resolves_to_deny() {
        let store = NullRegistryStore::new();
        challenged(&store);
        let keeper = BallotKeeper::new(&store);
        keeper.vote("X", &addr("a"), true, Amount::new(25)).unwrap();
        keeper.vote("X", &addr("b"), false, Amount::new(25)).unwrap();

        let report = SettlementEngine::new(&store, params())
            .settle(h(5))
            .unwrap()
            .unwrap();
        assert!(matches!(report.outcome, SettlementOutcome::Rejected { .. }));
    }

    #[test]
    fn zero_votes_resolves_to_deny() {
        let store = NullRegistryStore::new();
        challenged(&store);
        let report = SettlementEngine::new(&store, params())
            .settle(h(5))
            .unwrap()
            .unwrap();

        assert_eq!(report.outcome, SettlementOutcome::Rejected { no_votes: true });
        assert!(report.voter_payouts.is_empty());
        assert_eq!(
            store.balance(&addr("challenger")).unwrap(),
            Amount::new(150)
        );
    }

    #[test]
    fn unrevealed_commitments_are_discarded() {
        let store = NullRegistryStore::new();
        challenged(&store);
        let lazy = addr("lazy");
        let c = Commitment::compute("X", &lazy, true, Amount::new(5), b"salt");
        store.put_commitment("X", &lazy, &c).unwrap();

        let report = SettlementEngine::new(&store, params())
            .settle(h(5))
            .unwrap()
            .unwrap();
        assert_eq!(report.expired_commitments, 1);
        assert!(store.committers("X").unwrap().is_empty());
    }

    #[test]
    fn one_resolution_per_tick() {
        let store = NullRegistryStore::new();
        let keeper = BallotKeeper::new(&store);
        keeper
            .propose(h(0), "A", &addr("owner"), Amount::new(10), 1)
            .unwrap();
        keeper
            .propose(h(0), "B", &addr("owner"), Amount::new(10), 1)
            .unwrap();
        let engine = SettlementEngine::new(&store, params());

        assert_eq!(engine.settle(h(2)).unwrap().unwrap().identifier, "A");
        assert!(store.get_ballot("B").unwrap().is_some());
        assert_eq!(engine.settle(h(3)).unwrap().unwrap().identifier, "B");
        assert_eq!(engine.settle(h(4)).unwrap(), None);
    }

    #[test]
    fn head_blocks_later_due_ballots() {
        let store = NullRegistryStore::new();
        let keeper = BallotKeeper::new(&store);
        keeper
            .propose(h(0), "slow", &addr("owner"), Amount::new(10), 10)
            .unwrap();
        keeper
            .propose(h(0), "fast", &addr("owner"), Amount::new(10), 1)
            .unwrap();
        let engine = SettlementEngine::new(&store, params());
        assert_eq!(engine.settle(h(5)).unwrap(), None);
        assert!(store.get_listing("fast").unwrap().is_none());
    }
}
