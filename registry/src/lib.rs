//! Token-curated registry core.
//!
//! Candidates stake a bond to propose an entry. Anyone may challenge a
//! pending candidacy by posting a matching bond, which opens a commit-reveal
//! vote. Once a ballot's deadline passes, settlement lists or rejects the
//! entry and redistributes the bonds.
//!
//! Everything here borrows a store implementing
//! [`tcr_store::RegistryStore`] and the block height passed in by the host.

pub mod error;
pub mod handler;
pub mod keeper;
pub mod queue;
pub mod settlement;

pub use error::RegistryError;
pub use handler::{MsgOutcome, RegistryMsg, Router};
pub use keeper::{add_to_tally, check_identifier, voting_windows, BallotKeeper, ChallengeOutcome};
pub use queue::ProposalQueue;
pub use settlement::{SettlementEngine, SettlementOutcome, SettlementReport, VoterPayout};
