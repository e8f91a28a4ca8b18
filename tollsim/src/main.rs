//! Toll plaza simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::inline_always
)]

use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use clap::Parser;
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};

use tollsim::{LaneConfig, SimulationConfig};

struct DurationArg(Duration);

impl std::str::FromStr for DurationArg {
    type Err = eyre::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        humantime::parse_duration(s)
            .wrap_err("invalid duration")
            .map(DurationArg)
    }
}

struct TimestampArg(SystemTime);

impl std::str::FromStr for TimestampArg {
    type Err = eyre::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        humantime::parse_rfc3339_weak(s)
            .wrap_err("invalid timestamp")
            .map(TimestampArg)
    }
}

/// Runs toll plaza queue simulation.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a CSV file with transactions: `created,payment_type,axles`.
    #[clap(long)]
    transactions_path: PathBuf,

    /// Path to a file containing lane configuration in JSON array format,
    /// e.g., `[{"id": 1, "lane_type": "GEN"}]`.
    #[clap(long)]
    lanes: PathBuf,

    /// Simulation start time in RFC 3339 format.
    #[clap(long)]
    start: TimestampArg,

    /// How long to run the simulation for, e.g., `1h 30m`.
    #[clap(long)]
    duration: DurationArg,

    /// Time step of a single tick.
    #[clap(long, default_value = "1s")]
    step: DurationArg,

    /// Seed for processing times; drawn from entropy if missing.
    #[clap(long)]
    seed: Option<u64>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

impl TryFrom<Opt> for SimulationConfig {
    type Error = eyre::Error;
    fn try_from(opt: Opt) -> eyre::Result<Self> {
        let lanes = LaneConfig::read_all(&opt.lanes)?;
        if lanes.is_empty() {
            log::warn!("No lanes configured: every transaction will be rejected");
        }
        Ok(Self {
            transactions_path: opt.transactions_path,
            lanes,
            start: opt.start.0,
            duration: opt.duration.0,
            step: opt.step.0,
            seed: opt.seed,
        })
    }
}

fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(fern::log_file(path)?)
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    let conf = SimulationConfig::try_from(opt)?;
    let pb = ProgressBar::new(conf.duration.as_secs())
        .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {percent}%"));
    let facility = conf.run(&pb)?;
    log::info!("{}", facility);
    for lane in facility.lanes() {
        log::info!("{}", lane);
    }
    if let Some((time, peak)) = facility
        .history()
        .iter()
        .max_by_key(|(_, snapshot)| snapshot.queue_length)
    {
        log::info!(
            "Peak queue length {} at {}",
            peak.queue_length,
            humantime::format_rfc3339_seconds(*time)
        );
    }
    println!(
        "completed: {}, queued: {}, wait: {}",
        facility.completed(),
        facility.total_queue_length(),
        humantime::format_duration(facility.total_wait_time())
    );
    Ok(())
}
