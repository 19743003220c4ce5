use crate::semaphore::SemaphoreKind;
use std::{io, time};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("semaphore resource error: {0}")]
    Resource(String),
    #[error("timed out after {} ms waiting on {kind} semaphore", .waited.as_millis())]
    Timeout {
        kind: SemaphoreKind,
        waited: time::Duration,
    },
    #[error("thread management error: {0}")]
    ThreadManagement(String),
    #[error("push on a full queue (capacity {0})")]
    QueueFull(usize),
    #[error("pop on an empty queue")]
    QueueEmpty,
    #[error("queue accessed concurrently by two workers")]
    MutualExclusion,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("configuration file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl Error {
    /// Timeouts are the normal way for a worker to stop.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
