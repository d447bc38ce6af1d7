//! Commit-reveal digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::amount::Amount;
use crate::error::TcrError;

type Blake2b256 = Blake2b<U32>;

/// A 32-byte commitment to a hidden vote.
///
/// `blake2b_256(len(identifier) ‖ identifier ‖ len(voter) ‖ voter ‖ choice ‖ power_be ‖ salt)`.
/// Binding the identifier and voter stops a commitment being replayed on
/// another ballot or by another account.
///
/// Serialized as a 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Commitment([u8; 32]);

impl Commitment {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the commitment a voter must publish before revealing.
    pub fn compute(
        identifier: &str,
        voter: &Address,
        choice: bool,
        power: Amount,
        salt: &[u8],
    ) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update((identifier.len() as u32).to_be_bytes());
        hasher.update(identifier.as_bytes());
        hasher.update((voter.as_str().len() as u32).to_be_bytes());
        hasher.update(voter.as_str().as_bytes());
        hasher.update([choice as u8]);
        hasher.update(power.raw().to_be_bytes());
        hasher.update(salt);
        let mut output = [0u8; 32];
        output.copy_from_slice(&hasher.finalize());
        Self(output)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TcrError> {
        let bytes = hex::decode(s)
            .map_err(|e| TcrError::InvalidCommitment(format!("{}: {}", s, e)))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            TcrError::InvalidCommitment(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl TryFrom<String> for Commitment {
    type Error = TcrError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Commitment> for String {
    fn from(c: Commitment) -> Self {
        c.to_string()
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_binds_every_field() {
        let voter = Address::new("tcr_voter");
        let base = Commitment::compute("X", &voter, true, Amount::new(10), b"salt");
        assert_eq!(base, Commitment::compute("X", &voter, true, Amount::new(10), b"salt"));
        assert_ne!(base, Commitment::compute("Y", &voter, true, Amount::new(10), b"salt"));
        assert_ne!(
            base,
            Commitment::compute("X", &Address::new("tcr_other"), true, Amount::new(10), b"salt")
        );
        assert_ne!(base, Commitment::compute("X", &voter, false, Amount::new(10), b"salt"));
        assert_ne!(base, Commitment::compute("X", &voter, true, Amount::new(11), b"salt"));
        assert_ne!(base, Commitment::compute("X", &voter, true, Amount::new(10), b"pepper"));
    }

    #[test]
    fn display_is_full_hex() {
        let c = Commitment::new([0xab; 32]);
        assert_eq!(c.to_string().len(), 64);
        assert!(c.to_string().starts_with("abab"));
    }

    #[test]
    fn hex_roundtrip_and_rejects_garbage() {
        let c = Commitment::new([0x0f; 32]);
        assert_eq!(Commitment::from_hex(&c.to_string()).unwrap(), c);
        assert!(Commitment::from_hex("abc").is_err());
        assert!(Commitment::from_hex("zz").is_err());
        assert!(Commitment::from_hex("abab").is_err());
    }

    #[test]
    fn json_is_hex_string() {
        let c = Commitment::new([1; 32]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
