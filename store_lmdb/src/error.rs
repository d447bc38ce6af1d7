use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record: {0}")]
    Corruption(String),

    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("no migration step from schema version {0}")]
    MissingMigration(u32),

    #[error("meta store: {0}")]
    Meta(#[from] tcr_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<LmdbError> for tcr_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(key) => tcr_store::StoreError::NotFound(key),
            LmdbError::Serialization(msg) => tcr_store::StoreError::Serialization(msg),
            LmdbError::Corruption(msg) => tcr_store::StoreError::Corruption(msg),
            LmdbError::Meta(inner) => inner,
            other => tcr_store::StoreError::Backend(other.to_string()),
        }
    }
}
