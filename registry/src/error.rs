use tcr_store::StoreError;
use tcr_types::{Address, Amount, MAX_IDENTIFIER_LEN};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("identifier {0} already has a live ballot or listing")]
    DuplicateProposal(String),

    #[error("ballot {0} not found")]
    BallotNotFound(String),

    #[error("challenge bond {offered} does not match candidate bond {expected}")]
    BondMismatch { expected: Amount, offered: Amount },

    #[error("ballot {0} has already been challenged")]
    AlreadyChallenged(String),

    #[error("bond must be non-zero")]
    ZeroBond,

    #[error("identifier of {0} bytes must be non-empty and at most {max}", max = MAX_IDENTIFIER_LEN)]
    InvalidIdentifier(usize),

    #[error("bond {bond} is below the minimum deposit {min_deposit}")]
    BondTooLow { bond: Amount, min_deposit: Amount },

    #[error("apply window of {0} has closed")]
    ApplyWindowClosed(String),

    #[error("ballot {0} is not active")]
    BallotNotActive(String),

    #[error("commit window of {0} has closed")]
    CommitWindowClosed(String),

    #[error("{voter} has already committed on {identifier}")]
    DuplicateCommit { identifier: String, voter: Address },

    #[error("reveal window of {0} is not open")]
    RevealWindowClosed(String),

    #[error("{voter} has no commitment on {identifier}")]
    NoCommitment { identifier: String, voter: Address },

    #[error("reveal by {voter} does not match the commitment on {identifier}")]
    CommitmentMismatch { identifier: String, voter: Address },

    #[error("{voter} has already revealed on {identifier}")]
    DuplicateReveal { identifier: String, voter: Address },

    #[error("vote power must be non-zero")]
    ZeroPower,

    #[error("windows of {0} would end past the last block height")]
    WindowOverflow(String),

    #[error("tally of {0} cannot absorb more weight")]
    TallyOverflow(String),

    #[error("insufficient funds: {address} has {available}, needs {needed}")]
    InsufficientFunds {
        address: String,
        available: Amount,
        needed: Amount,
    },

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientFunds {
                address,
                available,
                needed,
            } => RegistryError::InsufficientFunds {
                address,
                available,
                needed,
            },
            other => RegistryError::Store(other),
        }
    }
}

impl RegistryError {
    /// Whether this is an expected rejection of a client action, as opposed to
    /// a backend failure that must halt block processing.
    ///
    /// `Overflow` is reserved for settlement arithmetic; overflows a client
    /// can provoke surface as `WindowOverflow` or `TallyOverflow`.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, RegistryError::Store(_) | RegistryError::Overflow(_))
    }
}
