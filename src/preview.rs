//! Live preview slots, one per population member.
//!
//! The evolver is the only writer. Readers (an HTTP handler, a window, a
//! test) call [`PreviewSlot::snapshot`] at any time and get the most recently
//! published render. Publication never waits on readers: if a slot is busy
//! the update is dropped and the next generation tries again.

use std::sync::{Arc, RwLock, TryLockError};

use crate::compute::PixelBuffer;

/// Single-writer, many-reader holder for the latest render of one slot.
#[derive(Debug, Default)]
pub struct PreviewSlot {
    image: RwLock<Option<Arc<PixelBuffer>>>,
}

impl PreviewSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents without blocking.
    ///
    /// Returns `false` when a reader holds the lock and the update was skipped.
    pub fn publish(&self, image: Arc<PixelBuffer>) -> bool {
        match self.image.try_write() {
            Ok(mut guard) => {
                *guard = Some(image);
                true
            }
            // A panicked reader cannot leave a half-written Arc behind.
            Err(TryLockError::Poisoned(poisoned)) => {
                *poisoned.into_inner() = Some(image);
                true
            }
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// Latest published render, if any.
    pub fn snapshot(&self) -> Option<Arc<PixelBuffer>> {
        match self.image.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Fixed set of preview slots shared between the evolver and readers.
#[derive(Debug, Default)]
pub struct PreviewBoard {
    slots: Vec<PreviewSlot>,
}

impl PreviewBoard {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| PreviewSlot::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&PreviewSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> impl Iterator<Item = &PreviewSlot> {
        self.slots.iter()
    }

    /// Snapshot of every slot, in population order.
    pub fn snapshot_all(&self) -> Vec<Option<Arc<PixelBuffer>>> {
        self.slots.iter().map(PreviewSlot::snapshot).collect()
    }
}
