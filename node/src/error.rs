use tcr_types::BlockHeight;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("registry error: {0}")]
    Registry(#[from] tcr_registry::RegistryError),

    #[error("store error: {0}")]
    Store(#[from] tcr_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] tcr_store_lmdb::LmdbError),

    #[error("invalid parameters: {0}")]
    Params(#[from] tcr_types::TcrError),

    #[error("config error: {0}")]
    Config(String),

    #[error("genesis error: {0}")]
    Genesis(String),

    #[error("chain already initialized at height {0}")]
    AlreadyInitialized(BlockHeight),

    #[error("chain not initialized")]
    NotInitialized,

    #[error("block {got} does not follow last committed height {last}")]
    HeightOutOfOrder { last: BlockHeight, got: BlockHeight },

    #[error("database integrity check failed: {0}")]
    Integrity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
