//! Nullable block clock.

use std::cell::Cell;
use tcr_types::BlockHeight;

/// A deterministic block height source for testing.
///
/// The chain only advances when you tell it to.
pub struct NullClock {
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_height: u64) -> Self {
        Self {
            current: Cell::new(initial_height),
        }
    }

    pub fn now(&self) -> BlockHeight {
        BlockHeight::new(self.current.get())
    }

    /// Advance by a number of blocks.
    pub fn advance(&self, blocks: u64) {
        self.current.set(self.current.get() + blocks);
    }

    /// Advance one block and return the new height.
    pub fn tick(&self) -> BlockHeight {
        self.advance(1);
        self.now()
    }

    pub fn set(&self, height: u64) {
        self.current.set(height);
    }
}
