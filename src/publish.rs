// Single-writer snapshot publishing. The writer swaps in a whole new
// immutable value; readers grab whatever is current without blocking.
// Every piece of state that crosses the control/audio/camera boundary goes
// through one of these.
//
// A replaced value is parked until the next publish, so a reader still
// holding it for the current audio buffer never ends up freeing it.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption, Guard};

pub struct Published<T> {
    inner: Arc<ArcSwap<T>>,
    retired: Arc<ArcSwapOption<T>>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), retired: Arc::clone(&self.retired) }
    }
}

impl<T> Published<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(value)),
            retired: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Drops the value retired by the previous publish, on this thread.
    pub fn publish(&self, value: T) {
        let old = self.inner.swap(Arc::new(value));
        self.retired.store(Some(old));
    }

    // Lock-free; safe from the audio callback.
    #[inline]
    pub fn load(&self) -> Guard<Arc<T>> {
        self.inner.load()
    }

    pub fn load_full(&self) -> Arc<T> {
        self.inner.load_full()
    }
}

impl<T: Clone> Published<T> {
    /// Copy the current value, edit it, publish the copy.
    /// Only valid with a single writer.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        let mut next = (**self.inner.load()).clone();
        edit(&mut next);
        self.publish(next);
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
