//! Registry records: listings, ballots and vote records.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::height::BlockHeight;

/// Longest identifier, in bytes, a listing or ballot may carry.
///
/// Identifiers key records directly and prefix per-ballot vote keys, so
/// together with [`Address::MAX_LEN`] this keeps every key within what the
/// storage backend accepts.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Whether `identifier` is non-empty and within [`MAX_IDENTIFIER_LEN`].
pub fn identifier_is_valid(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.len() <= MAX_IDENTIFIER_LEN
}

/// An entry currently accepted into the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub identifier: String,
    /// Approve weight that won the listing its place (0 if never challenged).
    pub votes: Amount,
}

/// One proposal/challenge round, keyed by the identifier of the entry it
/// would list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub identifier: String,
    /// Proposer; posted `bond` at creation.
    pub owner: Address,
    /// Set once a matching challenge bond has been posted.
    pub challenger: Option<Address>,
    pub bond: Amount,
    /// `false` while pending, `true` once challenged.
    pub active: bool,
    /// End of the apply window while pending; end of the reveal window once active.
    pub end_apply_block_stamp: BlockHeight,
    /// End of the commit window. Only meaningful once active.
    pub end_commit_block_stamp: BlockHeight,
    pub approve: Amount,
    pub deny: Amount,
}

impl Ballot {
    /// A freshly proposed, unchallenged ballot.
    pub fn pending(
        identifier: impl Into<String>,
        owner: Address,
        bond: Amount,
        end_apply: BlockHeight,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            owner,
            challenger: None,
            bond,
            active: false,
            end_apply_block_stamp: end_apply,
            end_commit_block_stamp: BlockHeight::GENESIS,
            approve: Amount::ZERO,
            deny: Amount::ZERO,
        }
    }

    /// Total weight cast on either side.
    pub fn total_votes(&self) -> u128 {
        self.approve.raw() as u128 + self.deny.raw() as u128
    }

    /// Whether `height` falls inside the commit window.
    pub fn in_commit_window(&self, height: BlockHeight) -> bool {
        self.active && height < self.end_commit_block_stamp
    }

    /// Whether `height` falls inside the reveal window.
    pub fn in_reveal_window(&self, height: BlockHeight) -> bool {
        self.active
            && height >= self.end_commit_block_stamp
            && height < self.end_apply_block_stamp
    }
}

/// One voter's revealed vote on a ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// `true` approves the entry, `false` denies it.
    pub choice: bool,
    /// Stake locked behind the vote.
    pub power: Amount,
}
