//! Fundamental types for the token-curated registry.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, coin amounts, block heights, registry records and protocol parameters.

pub mod address;
pub mod amount;
pub mod commitment;
pub mod error;
pub mod genesis;
pub mod height;
pub mod params;
pub mod record;

pub use address::Address;
pub use amount::Amount;
pub use commitment::Commitment;
pub use error::TcrError;
pub use genesis::GenesisAccount;
pub use height::BlockHeight;
pub use params::RegistryParams;
pub use record::{identifier_is_valid, Ballot, Listing, VoteRecord, MAX_IDENTIFIER_LEN};
