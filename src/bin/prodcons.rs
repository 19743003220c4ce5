use clap::{Arg, ArgMatches, Command};
use prodcons::{
    config::{self, Config, FileConfig, ShutdownMode},
    orchestrator, Error,
};
use std::{env, path::PathBuf, process::ExitCode};

fn command() -> Command {
    Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Producers and consumers sharing a bounded job queue")
        .allow_negative_numbers(true)
        .arg(
            Arg::new("queue_length")
                .value_name("queue_length")
                .required(true)
                .value_parser(|s: &str| config::parse_count("Queue length (first argument)", s))
                .help("Capacity of the shared job queue (at least 1)"),
        )
        .arg(
            Arg::new("nb_jobs")
                .value_name("nb_jobs")
                .required(true)
                .value_parser(|s: &str| {
                    config::parse_count("Number of jobs (second argument)", s)
                })
                .help("Number of jobs generated by each producer (at least 1)"),
        )
        .arg(
            Arg::new("nb_producers")
                .value_name("nb_producers")
                .required(true)
                .value_parser(|s: &str| {
                    config::parse_count("Number of producers (third argument)", s)
                })
                .help("Number of producer threads"),
        )
        .arg(
            Arg::new("nb_consumers")
                .value_name("nb_consumers")
                .required(true)
                .value_parser(|s: &str| {
                    config::parse_count("Number of consumers (fourth argument)", s)
                })
                .help("Number of consumer threads"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("path")
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML file holding timing and shutdown parameters"),
        )
        .arg(
            Arg::new("time_unit_ms")
                .long("time_unit_ms")
                .value_name("nb_milliseconds")
                .value_parser(clap::value_parser!(u64))
                .help("Duration of one time unit [default: 1000]"),
        )
        .arg(
            Arg::new("produce_time")
                .long("produce_time")
                .value_name("nb_units")
                .value_parser(clap::value_parser!(u32))
                .help("Time needed to produce one job [default: 5]"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("nb_units")
                .value_parser(clap::value_parser!(u32))
                .help("Time after which a waiting worker gives up [default: 20]"),
        )
        .arg(
            Arg::new("shutdown")
                .long("shutdown")
                .value_name("mode")
                .value_parser(|s: &str| s.parse::<ShutdownMode>())
                .help("When consumers stop: \"timeout\" or \"producers-done\" [default: timeout]"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("nb")
                .value_parser(clap::value_parser!(u64))
                .help("Seed of the job durations generator"),
        )
}

fn command_args(args: &ArgMatches) -> Result<Config, Error> {
    let queue_length = *args.get_one::<u32>("queue_length").expect("required");
    let nb_jobs = *args.get_one::<u32>("nb_jobs").expect("required");
    let nb_producers = *args.get_one::<u32>("nb_producers").expect("required");
    let nb_consumers = *args.get_one::<u32>("nb_consumers").expect("required");

    let mut config = Config::new(queue_length, nb_jobs, nb_producers, nb_consumers);

    if let Some(path) = args.get_one::<PathBuf>("config") {
        log::debug!("reading configuration from {}", path.display());
        config = config.with_file(FileConfig::from_file(path)?);
    }

    if let Some(unit_ms) = args.get_one::<u64>("time_unit_ms") {
        config.timing.unit_ms = *unit_ms;
    }
    if let Some(produce_time) = args.get_one::<u32>("produce_time") {
        config.timing.produce_time = *produce_time;
    }
    if let Some(timeout) = args.get_one::<u32>("timeout") {
        config.timing.timeout = *timeout;
    }
    if let Some(shutdown) = args.get_one::<ShutdownMode>("shutdown") {
        config.shutdown = *shutdown;
    }
    if let Some(seed) = args.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }

    config.validate()?;

    Ok(config)
}

fn main() -> ExitCode {
    let args = command().get_matches();

    init_logger();

    let config = match command_args(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match orchestrator::run(config) {
        Ok(report) => {
            if 0 < report.worker_errors {
                log::warn!("{} worker(s) failed", report.worker_errors);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger() {
    if env::var("RUST_LOG").is_ok() {
        simple_logger::init_with_env()
    } else {
        simple_logger::init_with_level(log::Level::Info)
    }
    .expect("logger initialization")
}
