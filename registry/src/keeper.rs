//! Ballot lifecycle manager.
//!
//! [`BallotKeeper`] owns every transition of a ballot record: creation as a
//! pending candidacy, activation by a challenge, vote recording, and the
//! retirement mutations settlement calls into. It never caches state; every
//! call re-reads the store and writes back before returning.
//!
//! The keeper trusts its caller for window and balance checks. Those live in
//! [`crate::handler`], in front of it.

use tcr_store::RegistryStore;
use tcr_types::{identifier_is_valid, Address, Amount, Ballot, BlockHeight, Listing, VoteRecord};

use crate::error::RegistryError;
use crate::queue::ProposalQueue;

/// Result of a challenge that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The ballot is now active and voting has started.
    Activated {
        end_commit: BlockHeight,
        end_reveal: BlockHeight,
    },
    /// The candidate's bond was below the minimum: the ballot was deleted and
    /// the challenger's bond returned in full.
    StaleBondRefunded { refund: Amount },
}

/// Reject identifiers that are empty or too long to key a record.
pub fn check_identifier(identifier: &str) -> Result<(), RegistryError> {
    if identifier_is_valid(identifier) {
        Ok(())
    } else {
        Err(RegistryError::InvalidIdentifier(identifier.len()))
    }
}

/// End of the commit and reveal windows for a challenge at `height`.
pub fn voting_windows(
    identifier: &str,
    height: BlockHeight,
    commit_len: u64,
    reveal_len: u64,
) -> Result<(BlockHeight, BlockHeight), RegistryError> {
    let overflow = || RegistryError::WindowOverflow(identifier.to_string());
    let end_commit = height.checked_add(commit_len).ok_or_else(overflow)?;
    let end_reveal = end_commit.checked_add(reveal_len).ok_or_else(overflow)?;
    Ok((end_commit, end_reveal))
}

/// Add `power` to one side of `ballot`'s tally.
pub fn add_to_tally(ballot: &mut Ballot, choice: bool, power: Amount) -> Result<(), RegistryError> {
    let side = if choice {
        &mut ballot.approve
    } else {
        &mut ballot.deny
    };
    match side.checked_add(power) {
        Some(total) => {
            *side = total;
            Ok(())
        }
        None => Err(RegistryError::TallyOverflow(ballot.identifier.clone())),
    }
}

pub struct BallotKeeper<'s, S> {
    store: &'s S,
}

impl<'s, S: RegistryStore> BallotKeeper<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Check that a proposal would be accepted, returning the end of its
    /// apply window. Writes nothing.
    pub fn validate_proposal(
        &self,
        height: BlockHeight,
        identifier: &str,
        bond: Amount,
        apply_len: u64,
    ) -> Result<BlockHeight, RegistryError> {
        check_identifier(identifier)?;
        if bond.is_zero() {
            return Err(RegistryError::ZeroBond);
        }
        if self.store.get_ballot(identifier)?.is_some()
            || self.store.get_listing(identifier)?.is_some()
        {
            return Err(RegistryError::DuplicateProposal(identifier.to_string()));
        }
        height
            .checked_add(apply_len)
            .ok_or_else(|| RegistryError::WindowOverflow(identifier.to_string()))
    }

    /// Create a pending ballot and enqueue it for settlement.
    ///
    /// The caller escrows `bond` from `owner` before or at this call.
    pub fn propose(
        &self,
        height: BlockHeight,
        identifier: &str,
        owner: &Address,
        bond: Amount,
        apply_len: u64,
    ) -> Result<Ballot, RegistryError> {
        let end_apply = self.validate_proposal(height, identifier, bond, apply_len)?;
        let ballot = Ballot::pending(identifier, owner.clone(), bond, end_apply);
        self.store.put_ballot(&ballot)?;
        ProposalQueue::new(self.store).enqueue(identifier)?;

        tracing::debug!(
            identifier,
            owner = %owner,
            bond = %bond,
            end_apply = %end_apply,
            "ballot proposed"
        );
        Ok(ballot)
    }

    /// Challenge a pending ballot.
    ///
    /// A candidate whose bond fell below `min_bond` is cleaned up instead:
    /// the ballot is deleted and `challenge_bond` is credited back to the
    /// challenger. That path is a success, not an error.
    #[allow(clippy::too_many_arguments)]
    pub fn challenge(
        &self,
        height: BlockHeight,
        identifier: &str,
        challenger: &Address,
        commit_len: u64,
        reveal_len: u64,
        min_bond: Amount,
        challenge_bond: Amount,
    ) -> Result<ChallengeOutcome, RegistryError> {
        let mut ballot = self
            .store
            .get_ballot(identifier)?
            .ok_or_else(|| RegistryError::BallotNotFound(identifier.to_string()))?;

        if ballot.bond < min_bond {
            self.store.delete_ballot(identifier)?;
            self.store.credit(challenger, challenge_bond)?;
            tracing::warn!(
                identifier,
                bond = %ballot.bond,
                min_bond = %min_bond,
                challenger = %challenger,
                "stale candidate bond, ballot removed and challenge refunded"
            );
            return Ok(ChallengeOutcome::StaleBondRefunded {
                refund: challenge_bond,
            });
        }

        if ballot.bond != challenge_bond {
            return Err(RegistryError::BondMismatch {
                expected: ballot.bond,
                offered: challenge_bond,
            });
        }
        if ballot.active {
            return Err(RegistryError::AlreadyChallenged(identifier.to_string()));
        }

        let (end_commit, end_reveal) = voting_windows(identifier, height, commit_len, reveal_len)?;

        ballot.active = true;
        ballot.challenger = Some(challenger.clone());
        ballot.end_commit_block_stamp = end_commit;
        ballot.end_apply_block_stamp = end_reveal;
        self.store.put_ballot(&ballot)?;

        tracing::debug!(
            identifier,
            challenger = %challenger,
            end_commit = %end_commit,
            end_reveal = %end_reveal,
            "ballot activated"
        );
        Ok(ChallengeOutcome::Activated {
            end_commit,
            end_reveal,
        })
    }

    /// Add `power` to one side of the tally and record the vote.
    ///
    /// An earlier record for the same voter is overwritten; its weight stays
    /// in the tally.
    pub fn vote(
        &self,
        identifier: &str,
        voter: &Address,
        choice: bool,
        power: Amount,
    ) -> Result<Ballot, RegistryError> {
        let mut ballot = self
            .store
            .get_ballot(identifier)?
            .ok_or_else(|| RegistryError::BallotNotFound(identifier.to_string()))?;

        add_to_tally(&mut ballot, choice, power)?;

        self.store.put_ballot(&ballot)?;
        self.store
            .put_vote(identifier, voter, &VoteRecord { choice, power })?;

        tracing::debug!(identifier, voter = %voter, choice, power = %power, "vote recorded");
        Ok(ballot)
    }

    /// Retire a resolved ballot. No-op if it is already gone.
    pub fn deactivate_ballot(&self, identifier: &str) -> Result<(), RegistryError> {
        if self.store.get_ballot(identifier)?.is_some() {
            self.store.delete_ballot(identifier)?;
            tracing::debug!(identifier, "ballot retired");
        }
        Ok(())
    }

    pub fn delete_ballot(&self, identifier: &str) -> Result<(), RegistryError> {
        self.store.delete_ballot(identifier)?;
        Ok(())
    }

    pub fn add_listing(&self, identifier: &str, votes: Amount) -> Result<(), RegistryError> {
        self.store.put_listing(&Listing {
            identifier: identifier.to_string(),
            votes,
        })?;
        Ok(())
    }

    pub fn delete_listing(&self, identifier: &str) -> Result<(), RegistryError> {
        self.store.delete_listing(identifier)?;
        Ok(())
    }

    pub fn get_ballot(&self, identifier: &str) -> Result<Option<Ballot>, RegistryError> {
        Ok(self.store.get_ballot(identifier)?)
    }

    pub fn get_listing(&self, identifier: &str) -> Result<Option<Listing>, RegistryError> {
        Ok(self.store.get_listing(identifier)?)
    }
}
