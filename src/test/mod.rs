//! End to end runs on a millisecond time unit

use crate::config::{Config, ShutdownMode};

pub fn fast_config(
    queue_length: u32,
    nb_jobs: u32,
    nb_producers: u32,
    nb_consumers: u32,
) -> Config {
    let mut config = Config::new(queue_length, nb_jobs, nb_producers, nb_consumers);
    config.timing.unit_ms = 1;
    config.timing.produce_time = 1;
    config.timing.timeout = 200;
    config.shutdown = ShutdownMode::Timeout;
    config.seed = Some(1234);
    config
}

#[cfg(test)]
mod tests {
    use super::fast_config;
    use crate::{config::ShutdownMode, error::Error, orchestrator::run};
    use std::time::{Duration, Instant};

    #[test]
    fn test_two_producers_three_consumers() {
        let start = Instant::now();
        let report = run(fast_config(4, 5, 2, 3)).unwrap();

        // consumers stop one timeout after the last job, well within this bound
        assert!(start.elapsed() < Duration::from_secs(10));

        assert_eq!(report.producers.len(), 2);
        assert_eq!(report.consumers.len(), 3);
        assert_eq!(report.timed_out_producers(), 0);
        assert_eq!(report.worker_errors, 0);
        assert_eq!(report.produced(), 10);
        assert_eq!(report.consumed(), 10);
        assert_eq!(report.remaining_jobs, 0);
        assert_eq!(report.final_space, 4);
        assert_eq!(report.final_item, 0);
    }

    #[test]
    fn test_single_slot_single_job() {
        let report = run(fast_config(1, 1, 1, 1)).unwrap();
        assert_eq!(report.produced(), 1);
        assert_eq!(report.consumed(), 1);
        assert_eq!(report.remaining_jobs, 0);
        assert_eq!(report.final_space + report.final_item, 1);
    }

    #[test]
    fn test_no_consumer_fills_queue() {
        let report = run(fast_config(2, 2, 1, 0)).unwrap();
        assert_eq!(report.producers.len(), 1);
        assert!(report.consumers.is_empty());
        assert_eq!(report.timed_out_producers(), 0);
        assert_eq!(report.produced(), 2);
        assert_eq!(report.remaining_jobs, 2);
        assert_eq!(report.final_space, 0);
        assert_eq!(report.final_item, 2);
    }

    #[test]
    fn test_producer_times_out_without_consumer() {
        let mut config = fast_config(1, 3, 1, 0);
        config.timing.timeout = 20;
        let report = run(config).unwrap();
        assert_eq!(report.timed_out_producers(), 1);
        assert_eq!(report.produced(), 1);
        assert_eq!(report.remaining_jobs, 1);
        assert_eq!(report.final_space + report.final_item, 1);
    }

    #[test]
    fn test_no_producer() {
        let mut config = fast_config(3, 1, 0, 2);
        config.timing.timeout = 20;
        let report = run(config).unwrap();
        assert!(report.producers.is_empty());
        assert_eq!(report.consumers.len(), 2);
        assert_eq!(report.consumed(), 0);
        assert_eq!(report.final_space, 3);
    }

    #[test]
    fn test_no_worker_at_all() {
        let report = run(fast_config(5, 5, 0, 0)).unwrap();
        assert_eq!(report.produced(), 0);
        assert_eq!(report.final_space, 5);
    }

    #[test]
    fn test_invalid_config_does_no_work() {
        assert!(matches!(
            run(fast_config(0, 1, 1, 1)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            run(fast_config(1, 0, 1, 1)),
            Err(Error::Validation(_))
        ));
    }

    // A consumer that waits less than the production time gives up before the job arrives.
    #[test]
    fn test_timeout_shutdown_misses_slow_producer() {
        let mut config = fast_config(1, 1, 1, 1);
        config.timing.produce_time = 150;
        config.timing.timeout = 10;
        let report = run(config).unwrap();
        assert_eq!(report.produced(), 1);
        assert_eq!(report.consumed(), 0);
        assert_eq!(report.remaining_jobs, 1);
    }

    #[test]
    fn test_producers_done_shutdown_waits_for_slow_producer() {
        let mut config = fast_config(1, 2, 1, 1);
        config.timing.produce_time = 50;
        config.timing.timeout = 10;
        config.shutdown = ShutdownMode::ProducersDone;
        let report = run(config).unwrap();
        assert_eq!(report.produced(), 2);
        assert_eq!(report.consumed(), 2);
        assert_eq!(report.remaining_jobs, 0);
    }

    #[test]
    fn test_many_workers_conserve_jobs() {
        let report = run(fast_config(3, 8, 4, 4)).unwrap();
        assert_eq!(report.timed_out_producers(), 0);
        assert_eq!(report.produced(), 32);
        assert_eq!(report.consumed() as usize + report.remaining_jobs, 32);
        assert_eq!(report.final_space + report.final_item, 3);
    }
}
