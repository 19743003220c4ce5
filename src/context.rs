//! State shared by every worker of a run

use crate::{
    config::Config,
    error::{Error, Result},
    queue::BoundedJobQueue,
    semaphore::{SemaphoreKind, SemaphoreSet},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, TryLockError,
};

/// An instance of this data structure is borrowed by every producer and consumer thread of a run
///
/// The queue storage sits behind a [`Mutex`] only to hand out a `&mut` to the worker owning the
/// `mutex` semaphore: it is claimed with `try_lock` and never waited on, a busy lock means two
/// workers are inside the critical section.
pub struct SharedContext {
    config: Config,
    semaphores: SemaphoreSet,
    queue: Mutex<BoundedJobQueue>,
    live_producers: AtomicUsize,
}

impl SharedContext {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let capacity = config.queue_length as usize;
        let semaphores = SemaphoreSet::create(capacity)?;
        let queue = Mutex::new(BoundedJobQueue::new(capacity));

        Ok(Self {
            config,
            semaphores,
            queue,
            live_producers: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn semaphores(&self) -> &SemaphoreSet {
        &self.semaphores
    }

    /// Runs `f` on the queue inside the critical section guarded by the `mutex` semaphore.
    pub fn with_queue<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BoundedJobQueue) -> Result<T>,
    {
        let _mutex = self.semaphores.acquire(SemaphoreKind::Mutex)?;

        let mut queue = match self.queue.try_lock() {
            Ok(queue) => queue,
            Err(TryLockError::Poisoned(e)) => {
                log::warn!("a worker panicked inside the critical section");
                let queue = e.into_inner();
                self.queue.clear_poison();
                queue
            }
            Err(TryLockError::WouldBlock) => return Err(Error::MutualExclusion),
        };

        f(&mut *queue)
    }

    pub fn queue_len(&self) -> Result<usize> {
        self.with_queue(|queue| Ok(queue.len()))
    }

    /// Counts a producer as running until the returned guard is dropped.
    pub(crate) fn register_producer(&self) -> LiveProducer<'_> {
        self.live_producers.fetch_add(1, Ordering::SeqCst);
        LiveProducer(&self.live_producers)
    }

    pub fn live_producers(&self) -> usize {
        self.live_producers.load(Ordering::SeqCst)
    }
}

pub(crate) struct LiveProducer<'a>(&'a AtomicUsize);

impl Drop for LiveProducer<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::SharedContext;
    use crate::{
        config::Config,
        error::Error,
        job::Job,
        queue::BoundedJobQueue,
        semaphore::SemaphoreKind,
    };
    use proptest::prelude::*;
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    fn context(queue_length: u32) -> SharedContext {
        SharedContext::new(Config::new(queue_length, 1, 1, 1)).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(matches!(
            SharedContext::new(Config::new(0, 1, 1, 1)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_critical_section_is_exclusive() {
        let ctx = context(4);
        let inside = AtomicBool::new(false);
        let entries = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        ctx.with_queue(|_| {
                            assert!(
                                !inside.swap(true, Ordering::SeqCst),
                                "two workers inside the critical section"
                            );
                            entries.fetch_add(1, Ordering::SeqCst);
                            thread::yield_now();
                            inside.store(false, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                    }
                });
            }
        });

        assert_eq!(entries.load(Ordering::SeqCst), 8 * 50);
        assert_eq!(ctx.semaphores().value(SemaphoreKind::Mutex).unwrap(), 1);
    }

    #[test]
    fn test_mutex_given_back_on_error() {
        let ctx = context(1);
        let res = ctx.with_queue(BoundedJobQueue::pop_front);
        assert!(matches!(res, Err(Error::QueueEmpty)));
        assert_eq!(ctx.semaphores().value(SemaphoreKind::Mutex).unwrap(), 1);
        assert_eq!(ctx.queue_len().unwrap(), 0);
    }

    #[test]
    fn test_queue_recovered_after_panic() {
        let ctx = context(2);
        ctx.with_queue(|queue| queue.push_back(Job::new(1, 1)))
            .unwrap();

        thread::scope(|s| {
            let res = s
                .spawn(|| {
                    ctx.with_queue(|_| -> Result<(), Error> {
                        panic!("worker died inside the critical section")
                    })
                })
                .join();
            assert!(res.is_err());
        });

        assert_eq!(ctx.semaphores().value(SemaphoreKind::Mutex).unwrap(), 1);
        assert_eq!(ctx.queue_len().unwrap(), 1);
    }

    #[test]
    fn test_busy_queue_reports_mutual_exclusion() {
        let ctx = context(2);
        let held = ctx.queue.lock().unwrap();

        let res = ctx.with_queue(|queue| queue.push_back(Job::new(1, 1)));
        assert!(matches!(res, Err(Error::MutualExclusion)));
        assert_eq!(ctx.semaphores().value(SemaphoreKind::Mutex).unwrap(), 1);

        drop(held);
        assert_eq!(ctx.queue_len().unwrap(), 0);
    }

    #[test]
    fn test_live_producers() {
        let ctx = context(1);
        assert_eq!(ctx.live_producers(), 0);
        let a = ctx.register_producer();
        let b = ctx.register_producer();
        assert_eq!(ctx.live_producers(), 2);
        drop(a);
        assert_eq!(ctx.live_producers(), 1);
        drop(b);
        assert_eq!(ctx.live_producers(), 0);
    }

    proptest! {
        // Producers and consumers interleaved at random, following the semaphore discipline
        // with non-blocking waits.
        #[test]
        fn prop_semaphore_discipline(capacity in 1u32..6, steps in prop::collection::vec(any::<bool>(), 0..100)) {
            let ctx = context(capacity);
            let sems = ctx.semaphores();
            let now = Duration::ZERO;
            let mut next_id = 0;
            let mut expected_id = 0;

            for push in steps {
                if push {
                    if let Ok(slot) = sems.acquire_timeout(SemaphoreKind::Space, now) {
                        next_id += 1;
                        ctx.with_queue(|queue| queue.push_back(Job::new(next_id, 1))).unwrap();
                        slot.forget();
                        sems.signal(SemaphoreKind::Item).unwrap();
                    }
                } else if let Ok(item) = sems.acquire_timeout(SemaphoreKind::Item, now) {
                    let job = ctx.with_queue(BoundedJobQueue::pop_front).unwrap();
                    item.forget();
                    sems.signal(SemaphoreKind::Space).unwrap();
                    expected_id += 1;
                    prop_assert_eq!(job.id(), expected_id);
                }

                let len = ctx.queue_len().unwrap();
                let space = sems.value(SemaphoreKind::Space).unwrap();
                let item = sems.value(SemaphoreKind::Item).unwrap();
                prop_assert!(len <= capacity as usize);
                prop_assert_eq!(item, len);
                prop_assert_eq!(space + item, capacity as usize);
            }
        }
    }
}
