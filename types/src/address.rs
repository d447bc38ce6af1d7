//! Account address type with `tcr_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TcrError;

/// A registry account address, always prefixed with `tcr_`.
///
/// Address derivation belongs to the host's account layer; the registry only
/// needs a stable, ordered key for balances and vote records.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all registry addresses.
    pub const PREFIX: &'static str = "tcr_";

    /// Longest accepted address, in bytes, prefix included.
    pub const MAX_LEN: usize = 128;

    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string is not a well-formed address. Use [`Address::parse`]
    /// for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(Self::well_formed(&s), "malformed address: {}", s);
        Self(s)
    }

    /// Parse an address from untrusted input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TcrError> {
        let s = raw.into();
        if Self::well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(TcrError::InvalidAddress(s))
        }
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn well_formed(s: &str) -> bool {
        s.starts_with(Self::PREFIX) && s.len() > Self::PREFIX.len() && s.len() <= Self::MAX_LEN
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = TcrError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}
