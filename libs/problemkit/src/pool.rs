//! Small object pool for reusable buffers on hot allocation paths.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Idle items kept per pool; extra items are dropped on return.
const MAX_IDLE: usize = 32;

/// Pool of reusable values.
///
/// Items are reset when checked out, so callers always start from a clean
/// value, and are handed back when the [`Pooled`] guard drops.
pub struct Pool<T> {
    items: Mutex<Vec<T>>,
    make: fn() -> T,
    reset: fn(&mut T),
}

impl<T> Pool<T> {
    #[must_use]
    pub const fn new(make: fn() -> T, reset: fn(&mut T)) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            make,
            reset,
        }
    }

    #[must_use]
    pub fn checkout(&self) -> Pooled<'_, T> {
        let mut item = self.items.lock().pop().unwrap_or_else(self.make);
        (self.reset)(&mut item);
        Pooled { pool: self, item }
    }

    /// Number of items currently waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.items.lock().len()
    }

    fn give_back(&self, item: T) {
        let mut items = self.items.lock();
        if items.len() < MAX_IDLE {
            items.push(item);
        }
    }
}

/// Checked-out pool item, returned to its pool on drop.
pub struct Pooled<'a, T> {
    pool: &'a Pool<T>,
    item: T,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let item = std::mem::replace(&mut self.item, (self.pool.make)());
        self.pool.give_back(item);
    }
}
