//! Worker that generates jobs and inserts them at the back of the shared queue
//!
//! For each job: generate it, spend the production time, reserve a free slot on the `space`
//! semaphore, append the job inside the critical section and signal the `item` semaphore. A
//! reservation that times out ends the worker before all its jobs are produced.

use crate::{
    config::Config,
    context::SharedContext,
    error::Result,
    job::JobGenerator,
    semaphore::SemaphoreKind,
};
use rand::{rngs::StdRng, SeedableRng};
use std::thread;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerReport {
    pub id: usize,
    pub produced: u32,
    /// Set when the worker gave up waiting for a free slot
    pub timed_out: bool,
}

pub(crate) fn generator(config: &Config, id: usize) -> JobGenerator<StdRng> {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
        None => StdRng::from_entropy(),
    };
    JobGenerator::new(
        config.queue_length,
        config.nb_jobs,
        config.timing.min_job_duration..=config.timing.max_job_duration,
        rng,
    )
}

pub(crate) fn start(ctx: &SharedContext, id: usize) -> Result<ProducerReport> {
    let config = ctx.config();
    let semaphores = ctx.semaphores();
    let mut generator = generator(config, id);
    let mut produced = 0;

    for index in 0..config.nb_jobs {
        let job = generator.next_job(id, index);

        thread::sleep(config.timing.produce_delay());

        log::trace!("producer {id}: waiting for space");
        let slot = match semaphores.acquire_timeout(
            SemaphoreKind::Space,
            config.timing.wait_timeout(),
        ) {
            Ok(slot) => slot,
            Err(e) if e.is_timeout() => {
                log::warn!(
                    "producer {id}: timed out, before it could produce all jobs ({produced}/{})",
                    config.nb_jobs
                );
                return Ok(ProducerReport {
                    id,
                    produced,
                    timed_out: true,
                });
            }
            Err(e) => return Err(e),
        };

        ctx.with_queue(|queue| queue.push_back(job))?;

        slot.forget();
        semaphores.signal(SemaphoreKind::Item)?;
        produced += 1;

        log::info!(
            "producer {id}: job id {} duration {}",
            job.id(),
            job.duration()
        );
    }

    log::info!("producer {id}: no more jobs to generate");

    Ok(ProducerReport {
        id,
        produced,
        timed_out: false,
    })
}
