use std::sync::atomic::{AtomicU64, Ordering};

use vkstate_api::handle::Handle;

/// Hands out handle values that cannot collide with anything in a captured
/// state. Used for placeholders and scratch objects.
pub struct HandleAllocator {
    next_id: AtomicU64,
}

impl HandleAllocator {
    /// Start allocating above `max_captured`.
    pub fn above(max_captured: u64) -> Self {
        Self {
            next_id: AtomicU64::new(max_captured.saturating_add(1).max(1)),
        }
    }

    pub fn alloc_raw(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn alloc<H: Handle>(&self) -> H {
        H::from_raw(self.alloc_raw())
    }

    /// The value the next allocation will return.
    pub fn peek(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::above(0)
    }
}
