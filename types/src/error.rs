//! Errors raised while constructing or validating shared types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TcrError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid registry parameters: {0}")]
    InvalidParams(String),

    #[error("invalid commitment: {0}")]
    InvalidCommitment(String),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),
}
