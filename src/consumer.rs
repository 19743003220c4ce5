//! Worker that removes jobs from the front of the shared queue and executes them
//!
//! Consumers receive no explicit end of work: a wait on the `item` semaphore that times out is
//! taken as "no more jobs will arrive". With [`ShutdownMode::ProducersDone`] such a timeout is
//! ignored as long as a producer is still running.

use crate::{
    config::ShutdownMode,
    context::SharedContext,
    error::Result,
    queue::BoundedJobQueue,
    semaphore::{Permit, SemaphoreKind},
};
use std::{thread, time::Duration};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerReport {
    pub id: usize,
    pub consumed: u32,
}

enum Wait<'a> {
    Item(Permit<'a>),
    Retry,
    Done,
}

pub(crate) fn start(ctx: &SharedContext, id: usize) -> Result<ConsumerReport> {
    let config = ctx.config();
    let semaphores = ctx.semaphores();
    let mut consumed = 0;

    loop {
        log::trace!("consumer {id}: waiting for item");
        let wait = match semaphores.acquire_timeout(
            SemaphoreKind::Item,
            config.timing.wait_timeout(),
        ) {
            Ok(item) => Wait::Item(item),
            Err(e) if e.is_timeout() => after_timeout(ctx, id)?,
            Err(e) => return Err(e),
        };

        let item = match wait {
            Wait::Item(item) => item,
            Wait::Retry => continue,
            Wait::Done => break,
        };

        let job = ctx.with_queue(BoundedJobQueue::pop_front)?;

        item.forget();
        semaphores.signal(SemaphoreKind::Space)?;

        log::info!(
            "consumer {id}: job id {} executing sleep duration {}",
            job.id(),
            job.duration()
        );
        thread::sleep(config.timing.units(job.duration()));
        log::info!("consumer {id}: job id {} completed", job.id());

        consumed += 1;
    }

    log::info!("consumer {id}: no more jobs left (timeout)");

    Ok(ConsumerReport { id, consumed })
}

/// Decides what a consumer does once its wait on `item` timed out.
///
/// The last producer signals `item` before it stops being counted as running, so once no producer
/// is left a non-blocking wait sees any job queued after the timeout.
fn after_timeout(ctx: &SharedContext, id: usize) -> Result<Wait<'_>> {
    if ctx.config().shutdown != ShutdownMode::ProducersDone {
        return Ok(Wait::Done);
    }

    let live_producers = ctx.live_producers();
    if 0 < live_producers {
        log::debug!("consumer {id}: no job yet, {live_producers} producer(s) still running");
        return Ok(Wait::Retry);
    }

    match ctx
        .semaphores()
        .acquire_timeout(SemaphoreKind::Item, Duration::ZERO)
    {
        Ok(item) => {
            log::debug!("consumer {id}: job queued by the last producer");
            Ok(Wait::Item(item))
        }
        Err(e) if e.is_timeout() => Ok(Wait::Done),
        Err(e) => Err(e),
    }
}
