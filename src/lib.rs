//! Bounded-buffer producer/consumer job queue
//!
//! Producers insert [`job::Job`]s at the back of a fixed capacity queue, consumers remove them from
//! the front and simulate their execution. Capacity, emptiness and exclusive access to the queue
//! are enforced by the three counting semaphores of a [`semaphore::SemaphoreSet`]. Every worker
//! is a thread borrowing one [`context::SharedContext`], see [`orchestrator::run`].

pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod producer;
pub mod queue;
pub mod semaphore;

#[cfg(test)]
mod test;

pub use error::{Error, Result};
