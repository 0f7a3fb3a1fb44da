//! Cooperative cancellation flag

use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;

/// Requests cancellation when [`cancel`](Canceller::cancel)ed or dropped
#[derive(Debug)]
pub struct Canceller(Arc<AtomicBool>);

/// Cooperative cancellation flag, polled by the streaming loop
#[derive(Clone, Debug)]
pub struct Cancellation(Arc<AtomicBool>);

/// Create a connected [`Canceller`] and [`Cancellation`]
pub fn channel() -> (Canceller, Cancellation) {
    let arc1 = Arc::new(AtomicBool::new(false));
    let arc2 = arc1.clone();
    (Canceller(arc1), Cancellation(arc2))
}

impl Canceller {
    /// Request cancellation (same as dropping)
    pub fn cancel(self) {}
}

impl Drop for Canceller {
    fn drop(&mut self) {
        self.0.store(true, Relaxed);
    }
}

impl Cancellation {
    /// Flag which is never raised
    pub fn never() -> Self {
        Cancellation(Arc::new(AtomicBool::new(false)))
    }
    /// True once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Relaxed)
    }
}
