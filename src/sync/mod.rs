//! Synchronization primitives: binary events and a counting semaphore.
//!
//! These are the building blocks the scheduler rests on: waitable tasks
//! signal completion through a [`ManualResetEvent`], and each worker sleeps
//! on a binary [`Semaphore`] until the scheduler has work for it.

mod event;
mod semaphore;

pub use event::{AutoResetEvent, ManualResetEvent};
pub use semaphore::Semaphore;
