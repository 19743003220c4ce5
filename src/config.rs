//! Run parameters
//!
//! The four counts come from the command line. Timing and shutdown parameters have defaults
//! matching the historical behaviour (one time unit is one second) and may be read from a TOML
//! file:
//!
//! ```toml
//! seed = 42
//! shutdown = "producers-done"
//!
//! [timing]
//! unit_ms = 100
//! produce_time = 5
//! timeout = 20
//! min_job_duration = 1
//! max_job_duration = 10
//! ```

use crate::{
    error::{Error, Result},
    job::{MAX_JOB_DURATION, MIN_JOB_DURATION},
};
use serde::Deserialize;
use std::{fmt, fs, path::Path, str::FromStr, time::Duration};

const DEFAULT_UNIT_MS: u64 = 1000;
const DEFAULT_PRODUCE_TIME: u32 = 5;
const DEFAULT_TIMEOUT: u32 = 20;

/// How consumers decide that no more jobs will arrive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownMode {
    /// A consumer stops on its first wait for an item that times out.
    ///
    /// A consumer may therefore stop while a slow producer is about to insert a job; that job
    /// then stays in the queue unless another consumer is still running.
    #[default]
    Timeout,
    /// A consumer only stops on a timeout once every producer has terminated.
    ProducersDone,
}

impl fmt::Display for ShutdownMode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(fmt, "timeout"),
            Self::ProducersDone => write!(fmt, "producers-done"),
        }
    }
}

impl FromStr for ShutdownMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "timeout" => Ok(Self::Timeout),
            "producers-done" => Ok(Self::ProducersDone),
            _ => Err(Error::Validation(format!(
                "unknown shutdown mode \"{s}\" (expected \"timeout\" or \"producers-done\")"
            ))),
        }
    }
}

/// Durations of the simulation, all but `unit_ms` are expressed in time units
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    pub unit_ms: u64,
    /// Time needed by a producer to build one job
    pub produce_time: u32,
    /// Bound of every wait on the `space` and `item` semaphores
    pub timeout: u32,
    pub min_job_duration: u32,
    pub max_job_duration: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            unit_ms: DEFAULT_UNIT_MS,
            produce_time: DEFAULT_PRODUCE_TIME,
            timeout: DEFAULT_TIMEOUT,
            min_job_duration: MIN_JOB_DURATION,
            max_job_duration: MAX_JOB_DURATION,
        }
    }
}

impl Timing {
    pub fn unit(&self) -> Duration {
        Duration::from_millis(self.unit_ms)
    }

    /// Duration of `nb` time units, saturating at [`Duration::MAX`].
    ///
    /// Every duration a run uses is checked by [`Timing::checked_units`] during validation.
    pub fn units(&self, nb: u32) -> Duration {
        self.unit().checked_mul(nb).unwrap_or(Duration::MAX)
    }

    pub fn checked_units(&self, nb: u32) -> Result<Duration> {
        self.unit().checked_mul(nb).ok_or_else(|| {
            Error::Validation(format!(
                "{nb} time unit(s) of {} ms do not fit in a duration",
                self.unit_ms
            ))
        })
    }

    pub fn produce_delay(&self) -> Duration {
        self.units(self.produce_time)
    }

    pub fn wait_timeout(&self) -> Duration {
        self.units(self.timeout)
    }

    fn validate(&self) -> Result<()> {
        if self.unit_ms == 0 {
            return Err(Error::Validation(
                "time unit must be greater than zero".into(),
            ));
        }
        if self.timeout == 0 {
            return Err(Error::Validation(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.min_job_duration == 0 {
            return Err(Error::Validation(
                "minimum job duration must be greater than zero".into(),
            ));
        }
        if self.min_job_duration > self.max_job_duration {
            return Err(Error::Validation(format!(
                "minimum job duration ({}) is above maximum job duration ({})",
                self.min_job_duration, self.max_job_duration
            )));
        }
        for nb in [self.produce_time, self.timeout, self.max_job_duration] {
            self.checked_units(nb)?;
        }
        Ok(())
    }
}

/// Optional configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub timing: Timing,
    pub shutdown: ShutdownMode,
    pub seed: Option<u64>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub queue_length: u32,
    pub nb_jobs: u32,
    pub nb_producers: u32,
    pub nb_consumers: u32,
    pub timing: Timing,
    pub shutdown: ShutdownMode,
    /// Seed of the job generators, drawn from the OS when missing
    pub seed: Option<u64>,
}

impl Config {
    pub fn new(queue_length: u32, nb_jobs: u32, nb_producers: u32, nb_consumers: u32) -> Self {
        Self {
            queue_length,
            nb_jobs,
            nb_producers,
            nb_consumers,
            timing: Timing::default(),
            shutdown: ShutdownMode::default(),
            seed: None,
        }
    }

    pub fn with_file(mut self, file: FileConfig) -> Self {
        self.timing = file.timing;
        self.shutdown = file.shutdown;
        self.seed = file.seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_length < 1 {
            return Err(limit_error("Queue length (first argument)"));
        }
        if self.nb_jobs < 1 {
            return Err(limit_error("Number of jobs (second argument)"));
        }
        self.timing.validate()
    }
}

fn limit_error(label: &str) -> Error {
    Error::Validation(format!("{label} must be greater than zero"))
}

/// Parses a non-negative decimal count, rejecting signs and any other character.
pub fn parse_count(label: &str, input: &str) -> Result<u32> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "invalid character input for: {label}"
        )));
    }
    input
        .parse()
        .map_err(|e| Error::Validation(format!("{label}: {e}")))
}
