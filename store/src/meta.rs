//! Metadata storage trait.

use crate::StoreError;
use tcr_types::BlockHeight;

/// Bookkeeping that doesn't belong to any registry record family.
pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Database schema version; 0 for a fresh database.
    fn schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;

    /// Height of the last block whose settlement was committed, if any.
    fn last_height(&self) -> Result<Option<BlockHeight>, StoreError>;

    fn set_last_height(&self, height: BlockHeight) -> Result<(), StoreError>;
}
