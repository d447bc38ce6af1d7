//! Binary key layouts.
//!
//! Per-ballot namespaces (votes, commitments) use
//! `u32_be(len(identifier)) ++ identifier ++ voter`. The length prefix keeps
//! `"ab"` and `"abc"` in disjoint ranges, so a prefix scan for one ballot
//! never yields another ballot's voters. Within a namespace LMDB's byte order
//! sorts entries by voter address.

use tcr_types::Address;

use crate::LmdbError;

/// LMDB's default maximum key size.
pub const MAX_KEY_SIZE: usize = 511;

/// The key prefix shared by every entry of one ballot's namespace.
pub fn namespace_prefix(identifier: &str) -> Vec<u8> {
    let id = identifier.as_bytes();
    let mut key = Vec::with_capacity(4 + id.len());
    key.extend_from_slice(&(id.len() as u32).to_be_bytes());
    key.extend_from_slice(id);
    key
}

/// Full key of a voter's entry in a ballot namespace.
pub fn namespaced_key(identifier: &str, voter: &Address) -> Vec<u8> {
    let mut key = namespace_prefix(identifier);
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

/// Recover the voter from a namespaced key, given the namespace prefix length.
pub fn voter_from_key(key: &[u8], prefix_len: usize) -> Result<Address, LmdbError> {
    let suffix = key
        .get(prefix_len..)
        .ok_or_else(|| LmdbError::Corruption("namespaced key shorter than prefix".into()))?;
    let raw = std::str::from_utf8(suffix).map_err(|e| LmdbError::Corruption(e.to_string()))?;
    Address::parse(raw).map_err(|e| LmdbError::Corruption(e.to_string()))
}

/// Queue keys are big-endian sequence numbers so LMDB order is FIFO order.
pub fn queue_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

pub fn queue_seq(key: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| LmdbError::Corruption("invalid queue key length".into()))?;
    Ok(u64::from_be_bytes(arr))
}
