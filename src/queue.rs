//! Fixed capacity FIFO of jobs
//!
//! The queue does no locking of its own: it is only reached through
//! [`crate::context::SharedContext::with_queue`], which holds the `mutex` semaphore. Storage is a
//! ring buffer so that removing the oldest job does not shift the others.

use crate::{
    error::{Error, Result},
    job::Job,
};

pub struct BoundedJobQueue {
    slots: Box<[Option<Job>]>,
    head: usize,
    len: usize,
}

impl BoundedJobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn push_back(&mut self, job: Job) -> Result<()> {
        if self.is_full() {
            return Err(Error::QueueFull(self.capacity()));
        }
        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = Some(job);
        self.len += 1;
        Ok(())
    }

    pub fn pop_front(&mut self) -> Result<Job> {
        if self.is_empty() {
            return Err(Error::QueueEmpty);
        }
        let job = self.slots[self.head].take().ok_or(Error::QueueEmpty)?;
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        Ok(job)
    }

    /// Queued jobs, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Job> + '_ {
        (0..self.len)
            .filter_map(move |i| self.slots[(self.head + i) % self.slots.len()].as_ref())
    }
}
