//! Action router.
//!
//! Every client action passes through [`Router::deliver`]. Each handler runs
//! all of its checks before its first write, so a rejected action leaves the
//! store untouched. Bonds and vote power are escrowed by debiting the actor's
//! balance; settlement pays them back out.

use serde::{Deserialize, Serialize};

use tcr_store::RegistryStore;
use tcr_types::{Address, Amount, Ballot, BlockHeight, Commitment, RegistryParams};

use crate::error::RegistryError;
use crate::keeper::{add_to_tally, check_identifier, voting_windows, BallotKeeper, ChallengeOutcome};

/// A client action addressed to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryMsg {
    /// Propose `identifier` for listing, escrowing `bond` from `owner`. The
    /// apply window is always the registry's configured `apply_stage`.
    DeclareCandidacy {
        identifier: String,
        owner: Address,
        bond: Amount,
    },
    /// Challenge a pending candidacy with a matching bond.
    Challenge {
        identifier: String,
        challenger: Address,
        bond: Amount,
    },
    /// Publish a hidden vote.
    Commit {
        identifier: String,
        voter: Address,
        commitment: Commitment,
    },
    /// Open a commitment and lock `power` behind the vote.
    Reveal {
        identifier: String,
        voter: Address,
        choice: bool,
        power: Amount,
        salt: String,
    },
}

impl RegistryMsg {
    pub fn identifier(&self) -> &str {
        match self {
            RegistryMsg::DeclareCandidacy { identifier, .. }
            | RegistryMsg::Challenge { identifier, .. }
            | RegistryMsg::Commit { identifier, .. }
            | RegistryMsg::Reveal { identifier, .. } => identifier,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RegistryMsg::DeclareCandidacy { .. } => "declare_candidacy",
            RegistryMsg::Challenge { .. } => "challenge",
            RegistryMsg::Commit { .. } => "commit",
            RegistryMsg::Reveal { .. } => "reveal",
        }
    }
}

/// What a successfully delivered action did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MsgOutcome {
    Proposed(Ballot),
    Challenged(ChallengeOutcome),
    Committed,
    Revealed { approve: Amount, deny: Amount },
}

pub struct Router<'s, S> {
    store: &'s S,
    params: RegistryParams,
}

impl<'s, S: RegistryStore> Router<'s, S> {
    pub fn new(store: &'s S, params: RegistryParams) -> Self {
        Self { store, params }
    }

    pub fn deliver(
        &self,
        height: BlockHeight,
        msg: RegistryMsg,
    ) -> Result<MsgOutcome, RegistryError> {
        check_identifier(msg.identifier())?;
        match msg {
            RegistryMsg::DeclareCandidacy {
                identifier,
                owner,
                bond,
            } => self.declare_candidacy(height, &identifier, &owner, bond),
            RegistryMsg::Challenge {
                identifier,
                challenger,
                bond,
            } => self.challenge(height, &identifier, &challenger, bond),
            RegistryMsg::Commit {
                identifier,
                voter,
                commitment,
            } => self.commit(height, &identifier, &voter, commitment),
            RegistryMsg::Reveal {
                identifier,
                voter,
                choice,
                power,
                salt,
            } => self.reveal(height, &identifier, &voter, choice, power, salt.as_bytes()),
        }
    }

    fn declare_candidacy(
        &self,
        height: BlockHeight,
        identifier: &str,
        owner: &Address,
        bond: Amount,
    ) -> Result<MsgOutcome, RegistryError> {
        if bond < self.params.min_deposit {
            return Err(RegistryError::BondTooLow {
                bond,
                min_deposit: self.params.min_deposit,
            });
        }
        let apply_len = self.params.apply_stage;
        let keeper = BallotKeeper::new(self.store);
        keeper.validate_proposal(height, identifier, bond, apply_len)?;

        self.store.debit(owner, bond)?;
        let ballot = keeper.propose(height, identifier, owner, bond, apply_len)?;
        Ok(MsgOutcome::Proposed(ballot))
    }

    fn challenge(
        &self,
        height: BlockHeight,
        identifier: &str,
        challenger: &Address,
        bond: Amount,
    ) -> Result<MsgOutcome, RegistryError> {
        let ballot = self.ballot(identifier)?;
        let stale = ballot.bond < self.params.min_deposit;
        if !stale {
            if ballot.bond != bond {
                return Err(RegistryError::BondMismatch {
                    expected: ballot.bond,
                    offered: bond,
                });
            }
            if ballot.active {
                return Err(RegistryError::AlreadyChallenged(identifier.to_string()));
            }
            if ballot.end_apply_block_stamp.has_elapsed(height) {
                return Err(RegistryError::ApplyWindowClosed(identifier.to_string()));
            }
            voting_windows(
                identifier,
                height,
                self.params.commit_stage,
                self.params.reveal_stage,
            )?;
        }

        self.store.debit(challenger, bond)?;
        let outcome = BallotKeeper::new(self.store).challenge(
            height,
            identifier,
            challenger,
            self.params.commit_stage,
            self.params.reveal_stage,
            self.params.min_deposit,
            bond,
        )?;
        Ok(MsgOutcome::Challenged(outcome))
    }

    fn commit(
        &self,
        height: BlockHeight,
        identifier: &str,
        voter: &Address,
        commitment: Commitment,
    ) -> Result<MsgOutcome, RegistryError> {
        let ballot = self.active_ballot(identifier)?;
        if !ballot.in_commit_window(height) {
            return Err(RegistryError::CommitWindowClosed(identifier.to_string()));
        }
        if self.store.get_commitment(identifier, voter)?.is_some() {
            return Err(RegistryError::DuplicateCommit {
                identifier: identifier.to_string(),
                voter: voter.clone(),
            });
        }

        self.store.put_commitment(identifier, voter, &commitment)?;
        tracing::debug!(identifier, voter = %voter, "vote committed");
        Ok(MsgOutcome::Committed)
    }

    fn reveal(
        &self,
        height: BlockHeight,
        identifier: &str,
        voter: &Address,
        choice: bool,
        power: Amount,
        salt: &[u8],
    ) -> Result<MsgOutcome, RegistryError> {
        let mut ballot = self.active_ballot(identifier)?;
        if !ballot.in_reveal_window(height) {
            return Err(RegistryError::RevealWindowClosed(identifier.to_string()));
        }
        if self.store.get_vote(identifier, voter)?.is_some() {
            return Err(RegistryError::DuplicateReveal {
                identifier: identifier.to_string(),
                voter: voter.clone(),
            });
        }
        if power.is_zero() {
            return Err(RegistryError::ZeroPower);
        }
        let stored = self
            .store
            .get_commitment(identifier, voter)?
            .ok_or_else(|| RegistryError::NoCommitment {
                identifier: identifier.to_string(),
                voter: voter.clone(),
            })?;
        if stored != Commitment::compute(identifier, voter, choice, power, salt) {
            return Err(RegistryError::CommitmentMismatch {
                identifier: identifier.to_string(),
                voter: voter.clone(),
            });
        }
        // Dry run on the local copy; the keeper applies it to the stored ballot.
        add_to_tally(&mut ballot, choice, power)?;

        self.store.debit(voter, power)?;
        self.store.delete_commitment(identifier, voter)?;
        let ballot = BallotKeeper::new(self.store).vote(identifier, voter, choice, power)?;
        Ok(MsgOutcome::Revealed {
            approve: ballot.approve,
            deny: ballot.deny,
        })
    }

    fn ballot(&self, identifier: &str) -> Result<Ballot, RegistryError> {
        self.store
            .get_ballot(identifier)?
            .ok_or_else(|| RegistryError::BallotNotFound(identifier.to_string()))
    }

    fn active_ballot(&self, identifier: &str) -> Result<Ballot, RegistryError> {
        let ballot = self.ballot(identifier)?;
        if !ballot.active {
            return Err(RegistryError::BallotNotActive(identifier.to_string()));
        }
        Ok(ballot)
    }
}
