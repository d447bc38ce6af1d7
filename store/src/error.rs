use tcr_types::Amount;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    #[error("insufficient funds: {address} has {available}, needs {needed}")]
    InsufficientFunds {
        address: String,
        available: Amount,
        needed: Amount,
    },

    #[error("balance overflow for {0}")]
    Overflow(String),
}
