//! Synchronization primitives

pub mod cancel;

pub use cancel::{channel, Cancellation, Canceller};
