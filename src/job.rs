//! Jobs exchanged between producers and consumers

use rand::Rng;
use std::{fmt, ops::RangeInclusive};

pub const MIN_JOB_DURATION: u32 = 1;
pub const MAX_JOB_DURATION: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Job {
    id: u32,
    duration: u32,
}

impl Job {
    pub fn new(id: u32, duration: u32) -> Self {
        Self { id, duration }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Execution time, in time units
    pub fn duration(&self) -> u32 {
        self.duration
    }
}

impl fmt::Display for Job {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "job {} (duration {})", self.id, self.duration)
    }
}

/// Builds the jobs of one producer
///
/// When a producer has more jobs to generate than the queue can hold, identifiers wrap around the
/// queue capacity so that recycling is visible in the logs.
pub struct JobGenerator<R> {
    capacity: u32,
    jobs_per_producer: u32,
    durations: RangeInclusive<u32>,
    rng: R,
}

impl<R: Rng> JobGenerator<R> {
    pub fn new(
        capacity: u32,
        jobs_per_producer: u32,
        durations: RangeInclusive<u32>,
        rng: R,
    ) -> Self {
        Self {
            capacity,
            jobs_per_producer,
            durations,
            rng,
        }
    }

    pub fn job_id(&self, sequence_index: u32) -> u32 {
        if self.jobs_per_producer > self.capacity {
            sequence_index % self.capacity + 1
        } else {
            sequence_index + 1
        }
    }

    pub fn next_job(&mut self, producer_id: usize, sequence_index: u32) -> Job {
        let job = Job::new(
            self.job_id(sequence_index),
            self.rng.gen_range(self.durations.clone()),
        );
        log::trace!("producer {producer_id}: generated {job} at index {sequence_index}");
        job
    }
}
