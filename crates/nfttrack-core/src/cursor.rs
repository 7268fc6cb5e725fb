//! Tracking cursor — the highest block whose logs have been fully processed.

use serde::{Deserialize, Serialize};

/// The tracker's position in the chain.
///
/// Owned and mutated only by the tracker's control loop. Not persisted: a
/// restart re-derives the position from the configured start block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingCursor {
    /// Last block number whose logs were processed (or explicitly skipped).
    pub block_number: u64,
}

impl TrackingCursor {
    pub fn new(block_number: u64) -> Self {
        Self { block_number }
    }

    /// Advance the cursor to `block_number`.
    ///
    /// The cursor never moves backwards; an older block is ignored.
    pub fn advance(&mut self, block_number: u64) {
        if block_number > self.block_number {
            self.block_number = block_number;
        }
    }

    /// Returns the next block to process (cursor + 1).
    pub fn next_block(&self) -> u64 {
        self.block_number.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advance() {
        let mut cursor = TrackingCursor::new(100);
        cursor.advance(105);
        assert_eq!(cursor.block_number, 105);
    }

    #[test]
    fn cursor_never_rewinds() {
        let mut cursor = TrackingCursor::new(105);
        cursor.advance(101);
        assert_eq!(cursor.block_number, 105);
    }

    #[test]
    fn cursor_next_block() {
        let cursor = TrackingCursor::new(500);
        assert_eq!(cursor.next_block(), 501);
        assert_eq!(TrackingCursor::new(u64::MAX).next_block(), u64::MAX);
    }
}
