//! Listing storage trait.

use crate::StoreError;
use tcr_types::Listing;

/// Accepted registry entries, keyed by identifier.
pub trait ListingStore {
    fn get_listing(&self, identifier: &str) -> Result<Option<Listing>, StoreError>;

    fn put_listing(&self, listing: &Listing) -> Result<(), StoreError>;

    /// Remove a listing. Absent keys are a no-op.
    fn delete_listing(&self, identifier: &str) -> Result<(), StoreError>;

    /// All listings in identifier order (used for state export).
    fn iter_listings(&self) -> Result<Vec<Listing>, StoreError>;
}
