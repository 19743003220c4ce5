//! Counting semaphores coordinating producers and consumers
//!
//! A [`SemaphoreSet`] holds the three semaphores of the bounded buffer:
//!
//! - `space` counts free slots in the queue, it starts at the queue capacity,
//! - `item` counts filled slots, it starts at zero,
//! - `mutex` is a binary semaphore guarding every access to the queue.
//!
//! Outside of any critical section, `space + item` equals the queue capacity.
//!
//! A [`Permit`] holds one unit of a semaphore and gives it back when dropped, so a worker leaving
//! early (error or panic) never leaks a slot. Once a job has crossed the queue the permit is
//! [`Permit::forget`]-ed and the counterpart semaphore is signalled instead.

use crate::error::{Error, Result};
use std::{
    fmt,
    sync::{Condvar, Mutex, MutexGuard},
    time,
};

/// Highest value a semaphore may hold, same limit as System V semaphores
pub const SEMVMX: usize = 32767;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SemaphoreKind {
    Space,
    Item,
    Mutex,
}

impl SemaphoreKind {
    pub const ALL: [SemaphoreKind; 3] = [Self::Space, Self::Item, Self::Mutex];
}

impl fmt::Display for SemaphoreKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space => write!(fmt, "space"),
            Self::Item => write!(fmt, "item"),
            Self::Mutex => write!(fmt, "mutex"),
        }
    }
}

struct State {
    count: usize,
    closed: bool,
}

pub struct Semaphore {
    state: Mutex<State>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(State {
                count,
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Resource("semaphore state poisoned".into()))
    }

    pub fn acquire(&self) -> Result<()> {
        let state = self.lock()?;
        let mut state = self
            .cv
            .wait_while(state, |state| state.count == 0 && !state.closed)
            .map_err(|_| Error::Resource("semaphore state poisoned".into()))?;
        if state.closed {
            return Err(Error::Resource("semaphore destroyed".into()));
        }
        state.count -= 1;
        Ok(())
    }

    /// Returns `Ok(false)` when no unit could be taken before `timeout` elapsed.
    pub fn acquire_timeout(&self, timeout: time::Duration) -> Result<bool> {
        let state = self.lock()?;
        let (mut state, _) = self
            .cv
            .wait_timeout_while(state, timeout, |state| state.count == 0 && !state.closed)
            .map_err(|_| Error::Resource("semaphore state poisoned".into()))?;
        if state.closed {
            return Err(Error::Resource("semaphore destroyed".into()));
        }
        if state.count == 0 {
            return Ok(false);
        }
        state.count -= 1;
        Ok(true)
    }

    pub fn release(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(Error::Resource("semaphore destroyed".into()));
        }
        if state.count >= SEMVMX {
            return Err(Error::Resource(format!(
                "semaphore value would exceed {SEMVMX}"
            )));
        }
        state.count += 1;
        self.cv.notify_one();
        Ok(())
    }

    pub fn value(&self) -> Result<usize> {
        Ok(self.lock()?.count)
    }

    /// Marks the semaphore as destroyed and wakes up every waiter.
    fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(Error::Resource("semaphore already destroyed".into()));
        }
        state.closed = true;
        self.cv.notify_all();
        Ok(())
    }
}

pub struct SemaphoreSet {
    capacity: usize,
    space: Semaphore,
    item: Semaphore,
    mutex: Semaphore,
}

impl SemaphoreSet {
    pub fn create(capacity: usize) -> Result<Self> {
        if capacity > SEMVMX {
            return Err(Error::Resource(format!(
                "cannot initialize space semaphore to {capacity}, maximum is {SEMVMX}"
            )));
        }

        log::debug!("creating semaphore set (space = {capacity}, item = 0, mutex = 1)");

        Ok(Self {
            capacity,
            space: Semaphore::new(capacity),
            item: Semaphore::new(0),
            mutex: Semaphore::new(1),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, kind: SemaphoreKind) -> &Semaphore {
        match kind {
            SemaphoreKind::Space => &self.space,
            SemaphoreKind::Item => &self.item,
            SemaphoreKind::Mutex => &self.mutex,
        }
    }

    pub fn wait(&self, kind: SemaphoreKind) -> Result<()> {
        self.get(kind).acquire()
    }

    pub fn timed_wait(&self, kind: SemaphoreKind, timeout: time::Duration) -> Result<()> {
        if self.get(kind).acquire_timeout(timeout)? {
            Ok(())
        } else {
            Err(Error::Timeout {
                kind,
                waited: timeout,
            })
        }
    }

    pub fn signal(&self, kind: SemaphoreKind) -> Result<()> {
        self.get(kind).release()
    }

    pub fn value(&self, kind: SemaphoreKind) -> Result<usize> {
        self.get(kind).value()
    }

    pub fn acquire(&self, kind: SemaphoreKind) -> Result<Permit<'_>> {
        self.wait(kind)?;
        Ok(Permit::new(self, kind))
    }

    pub fn acquire_timeout(
        &self,
        kind: SemaphoreKind,
        timeout: time::Duration,
    ) -> Result<Permit<'_>> {
        self.timed_wait(kind, timeout)?;
        Ok(Permit::new(self, kind))
    }

    /// Releases the three semaphores.
    ///
    /// Every thread still blocked on one of them wakes up with a [`Error::Resource`]. The set is
    /// released even when it is found in an inconsistent state, the first problem met is then
    /// returned.
    pub fn destroy(&self) -> Result<()> {
        let mut first_error = None;

        match (self.mutex.value(), self.space.value(), self.item.value()) {
            (Ok(mutex), Ok(space), Ok(item)) => {
                if mutex != 1 {
                    first_error = Some(Error::Resource(format!(
                        "mutex semaphore is {mutex} at destruction, critical section still held"
                    )));
                } else if space + item != self.capacity() {
                    first_error = Some(Error::Resource(format!(
                        "space ({space}) + item ({item}) != capacity ({}) at destruction",
                        self.capacity()
                    )));
                }
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => first_error = Some(e),
        }

        for kind in SemaphoreKind::ALL {
            if let Err(e) = self.get(kind).close() {
                log::debug!("{kind} semaphore: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            None => {
                log::debug!("semaphore set destroyed");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }
}

/// One unit taken from a semaphore of a [`SemaphoreSet`]
///
/// The unit is signalled back when the permit is dropped.
#[must_use = "dropping a permit immediately signals the semaphore again"]
pub struct Permit<'a> {
    set: &'a SemaphoreSet,
    kind: SemaphoreKind,
    armed: bool,
}

impl<'a> Permit<'a> {
    fn new(set: &'a SemaphoreSet, kind: SemaphoreKind) -> Self {
        Self {
            set,
            kind,
            armed: true,
        }
    }

    pub fn kind(&self) -> SemaphoreKind {
        self.kind
    }

    /// Keeps the unit taken: the caller hands it over to the counterpart semaphore.
    pub fn forget(mut self) {
        self.armed = false;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.set.signal(self.kind) {
            log::error!("failed to give back {} semaphore: {e}", self.kind);
        }
    }
}
