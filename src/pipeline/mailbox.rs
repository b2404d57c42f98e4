//! Single-slot latest-wins mailbox between pipeline stages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Lossy single-slot handoff: a publish replaces any unread value, a take
/// clears the slot. Each operation is one atomic `Arc` swap, so the reader
/// can never observe a partially written value and neither side blocks.
pub struct LatestSlot<T> {
    slot: ArcSwapOption<T>,
    published: AtomicU64,
    replaced: AtomicU64,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            published: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
        }
    }

    /// Publish a value, returning true when an unread value was replaced.
    /// The replaced value is dropped here, on the publisher side.
    pub fn publish(&self, value: T) -> bool {
        let old = self.slot.swap(Some(Arc::new(value)));
        self.published.fetch_add(1, Ordering::Relaxed);
        let replaced = old.is_some();
        if replaced {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// Take and clear. None when nothing was published since the last take.
    pub fn take(&self) -> Option<Arc<T>> {
        self.slot.swap(None)
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            published: self.published.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    pub replaced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_on_empty_slot_is_none() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert!(slot.take().is_none());
    }

    #[test]
    fn latest_publish_wins() {
        let slot = LatestSlot::new();
        assert!(!slot.publish(1u32));
        assert!(slot.publish(2));
        assert_eq!(*slot.take().unwrap(), 2);
        assert!(slot.take().is_none());
    }

    #[test]
    fn n_publishes_yield_only_the_last_value() {
        let slot = LatestSlot::new();
        for i in 0..10u32 {
            slot.publish(i);
        }
        assert_eq!(*slot.take().unwrap(), 9);
        assert!(slot.take().is_none());
        assert_eq!(
            slot.stats(),
            SlotStats {
                published: 10,
                replaced: 9
            }
        );
    }
}
