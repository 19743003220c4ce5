//! Runs producers and consumers around one shared queue
//!
//! ```text
//!              --------------------------
//! producers ---| space | queue | item |--> consumers
//!              --------------------------
//! ```
//!
//! Notes:
//! - all producers are spawned before the consumers, each worker is a named scoped thread
//!   borrowing the same [`SharedContext`],
//! - a spawn failure stops further spawning, a join failure does not stop the other joins, the
//!   first of these failures is returned once the semaphores are destroyed,
//! - errors returned by the workers themselves are logged and counted in the [`RunReport`].

use crate::{
    config::Config,
    consumer::{self, ConsumerReport},
    context::SharedContext,
    error::{Error, Result},
    producer::{self, ProducerReport},
    semaphore::SemaphoreKind,
};
use std::thread;

#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport>,
    pub worker_errors: usize,
    /// Semaphore counts once every worker terminated
    pub final_space: usize,
    pub final_item: usize,
    /// Jobs produced but never consumed
    pub remaining_jobs: usize,
}

impl RunReport {
    pub fn produced(&self) -> u32 {
        self.producers.iter().map(|p| p.produced).sum()
    }

    pub fn consumed(&self) -> u32 {
        self.consumers.iter().map(|c| c.consumed).sum()
    }

    pub fn timed_out_producers(&self) -> usize {
        self.producers.iter().filter(|p| p.timed_out).count()
    }
}

pub fn run(config: Config) -> Result<RunReport> {
    let context = SharedContext::new(config)?;
    let config = context.config();

    log::info!(
        "queue of {} jobs, {} producer(s) of {} job(s) each, {} consumer(s)",
        config.queue_length,
        config.nb_producers,
        config.nb_jobs,
        config.nb_consumers
    );
    log::info!(
        "time unit is {} ms, production takes {} unit(s), waits time out after {} unit(s)",
        config.timing.unit_ms,
        config.timing.produce_time,
        config.timing.timeout
    );
    log::debug!("shutdown mode is {}", config.shutdown);

    let mut report = RunReport::default();

    let failure = thread::scope(|scope| {
        let mut failure = None;
        let mut producers = Vec::with_capacity(config.nb_producers as usize);
        let mut consumers = Vec::with_capacity(config.nb_consumers as usize);
        let ctx = &context;

        for id in 1..=config.nb_producers as usize {
            let live = ctx.register_producer();
            let spawned = thread::Builder::new()
                .name(format!("producer_{id}"))
                .spawn_scoped(scope, move || {
                    let _live = live;
                    producer::start(ctx, id)
                });
            match spawned {
                Ok(handle) => producers.push((id, handle)),
                Err(e) => {
                    log::error!("failed to spawn producer {id}: {e}");
                    failure = Some(Error::ThreadManagement(format!(
                        "spawn of producer {id}: {e}"
                    )));
                    break;
                }
            }
        }

        if failure.is_none() {
            for id in 1..=config.nb_consumers as usize {
                let spawned = thread::Builder::new()
                    .name(format!("consumer_{id}"))
                    .spawn_scoped(scope, move || consumer::start(ctx, id));
                match spawned {
                    Ok(handle) => consumers.push((id, handle)),
                    Err(e) => {
                        log::error!("failed to spawn consumer {id}: {e}");
                        failure = Some(Error::ThreadManagement(format!(
                            "spawn of consumer {id}: {e}"
                        )));
                        break;
                    }
                }
            }
        }

        for (id, handle) in producers {
            match handle.join() {
                Ok(Ok(r)) => report.producers.push(r),
                Ok(Err(e)) => {
                    log::error!("producer {id}: error: {e}");
                    report.worker_errors += 1;
                }
                Err(_) => {
                    log::error!("producer {id}: thread panicked");
                    if failure.is_none() {
                        failure = Some(Error::ThreadManagement(format!("join of producer {id}")));
                    }
                }
            }
        }

        for (id, handle) in consumers {
            match handle.join() {
                Ok(Ok(r)) => report.consumers.push(r),
                Ok(Err(e)) => {
                    log::error!("consumer {id}: error: {e}");
                    report.worker_errors += 1;
                }
                Err(_) => {
                    log::error!("consumer {id}: thread panicked");
                    if failure.is_none() {
                        failure = Some(Error::ThreadManagement(format!("join of consumer {id}")));
                    }
                }
            }
        }

        failure
    });

    let semaphores = context.semaphores();
    let final_space = semaphores.value(SemaphoreKind::Space);
    let final_item = semaphores.value(SemaphoreKind::Item);
    let remaining_jobs = context.queue_len();

    if let Err(e) = semaphores.destroy() {
        log::error!("semaphores failed to close: {e}");
    }

    report.final_space = final_space?;
    report.final_item = final_item?;
    report.remaining_jobs = remaining_jobs?;

    log::info!(
        "{} job(s) produced, {} consumed, {} left in queue",
        report.produced(),
        report.consumed(),
        report.remaining_jobs
    );

    match failure {
        Some(e) => Err(e),
        None => Ok(report),
    }
}
