//! Genesis state: the balances and listings a chain starts from, and the
//! shape `export_state` writes back out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use tcr_types::{identifier_is_valid, GenesisAccount, Listing, MAX_IDENTIFIER_LEN};

use crate::NodeError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub listings: Vec<Listing>,
}

impl GenesisState {
    pub fn from_json_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, NodeError> {
        let state: Self =
            serde_json::from_str(s).map_err(|e| NodeError::Genesis(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }

    pub fn to_json_string(&self) -> Result<String, NodeError> {
        serde_json::to_string_pretty(self).map_err(|e| NodeError::Genesis(e.to_string()))
    }

    /// Reject duplicate accounts, duplicate listings and identifiers that are
    /// empty or longer than [`MAX_IDENTIFIER_LEN`].
    pub fn validate(&self) -> Result<(), NodeError> {
        let mut seen = BTreeSet::new();
        for account in &self.accounts {
            if !seen.insert(account.address.as_str()) {
                return Err(NodeError::Genesis(format!(
                    "duplicate account {}",
                    account.address
                )));
            }
        }
        let mut ids = BTreeSet::new();
        for listing in &self.listings {
            if !identifier_is_valid(&listing.identifier) {
                return Err(NodeError::Genesis(format!(
                    "listing identifier of {} bytes must be non-empty and at most {}",
                    listing.identifier.len(),
                    MAX_IDENTIFIER_LEN
                )));
            }
            if !ids.insert(listing.identifier.as_str()) {
                return Err(NodeError::Genesis(format!(
                    "duplicate listing {}",
                    listing.identifier
                )));
            }
        }
        Ok(())
    }
}
