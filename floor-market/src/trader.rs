//! Trader identification.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a trader connection.
///
/// Assigned by the server at accept time, strictly increasing for the
/// lifetime of the process, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraderId(pub u64);

impl TraderId {
    /// Create a trader ID from a counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trader-{}", self.0)
    }
}

/// Allocator for trader IDs.
///
/// Allocation happens on the accept path, before the connection reaches the
/// state owner, so it must be safe to call from any task without further
/// coordination.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first ID is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next trader ID.
    pub fn next_id(&self) -> TraderId {
        TraderId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trader_id_display() {
        let id = TraderId::new(42);
        assert_eq!(format!("{}", id), "trader-42");
    }

    #[test]
    fn test_allocator_strictly_increasing() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.next_id(), TraderId::new(1));
        assert_eq!(alloc.next_id(), TraderId::new(2));
        assert_eq!(alloc.next_id(), TraderId::new(3));
    }
}
