//! Registry node: hosts the token-curated registry over LMDB.
//!
//! The node is the block-driving collaborator of the registry core:
//! - Opens and verifies the LMDB environment
//! - Loads genesis balances and listings
//! - Applies each block's actions and the end-of-block settlement atomically
//! - Exports settled state back to genesis form

pub mod app;
pub mod block;
pub mod config;
pub mod error;
pub mod genesis;
pub mod logging;

pub use app::{BlockResult, RegistryApp};
pub use block::{load_blocks, Block};
pub use config::NodeConfig;
pub use error::NodeError;
pub use genesis::GenesisState;
pub use logging::{init_logging, LogFormat};
