//! Block height: the registry's only notion of time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block height. Windows (apply, commit, reveal) are measured in blocks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHeight(u64);

impl BlockHeight {
    pub const GENESIS: Self = Self(0);

    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The height `len` blocks after this one, or `None` on overflow.
    pub fn checked_add(&self, len: u64) -> Option<Self> {
        self.0.checked_add(len).map(Self)
    }

    /// The next block height.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether a window ending at `self` has elapsed at height `now`.
    pub fn has_elapsed(&self, now: BlockHeight) -> bool {
        now.0 >= self.0
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
