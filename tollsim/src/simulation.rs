use crate::arrivals::{deserialize_duration, deserialize_timestamp};
use crate::{Arrivals, Facility, Lane, LaneId, LaneType, NormalSampler};

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use eyre::{eyre, WrapErr};
use indicatif::ProgressBar;
use rand_chacha::ChaChaRng;
use serde::Deserialize;

/// A lane to set up in the facility.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct LaneConfig {
    /// Lane ID.
    pub id: LaneId,
    /// Lane type.
    pub lane_type: LaneType,
}

impl LaneConfig {
    /// Reads a JSON array of lanes, e.g., `[{"id": 1, "lane_type": "GEN"}]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_all(path: &Path) -> eyre::Result<Vec<LaneConfig>> {
        let file = File::open(path)
            .wrap_err_with(|| format!("unable to open lane config: {}", path.display()))?;
        serde_json::from_reader(file)
            .wrap_err_with(|| format!("unable to parse lane config: {}", path.display()))
    }
}

fn default_step() -> Duration {
    Duration::from_secs(1)
}

/// Configuration for a single simulation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Path to the CSV file containing transaction records.
    pub transactions_path: PathBuf,

    /// Lanes, in the order of registration.
    pub lanes: Vec<LaneConfig>,

    /// The time at which the simulation starts.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start: SystemTime,

    /// How long to run the simulation for.
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration: Duration,

    /// Time step of a single tick.
    #[serde(default = "default_step", deserialize_with = "deserialize_duration")]
    pub step: Duration,

    /// Seed for processing times. If `None`, the generator is seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Builds the facility with all configured lanes and no transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the lane configuration contains duplicate IDs.
    pub fn facility(&self) -> eyre::Result<Facility<NormalSampler<ChaChaRng>>> {
        let sampler = self
            .seed
            .map_or_else(NormalSampler::from_entropy, NormalSampler::seeded);
        let mut facility = Facility::new(self.start, sampler);
        for lane in &self.lanes {
            facility
                .add_lane(Lane::new(lane.id, lane.lane_type))
                .wrap_err("invalid lane config")?;
        }
        Ok(facility)
    }

    /// Runs the simulation based on the given configuration: in every tick, the transactions
    /// created before the current time are admitted, and then the clock moves by one step.
    /// Returns the facility at the end of the simulation.
    ///
    /// # Errors
    ///
    /// May return an error if it fails to read the transactions, the configuration turns out to
    /// be invalid, or any transaction cannot be admitted.
    pub fn run(&self, pb: &ProgressBar) -> eyre::Result<Facility<NormalSampler<ChaChaRng>>> {
        let mut arrivals = Arrivals::from_path(&self.transactions_path)?;
        let mut facility = self.facility()?;
        let end = self
            .start
            .checked_add(self.duration)
            .ok_or_else(|| eyre!("simulation end time out of range"))?;
        pb.set_length(self.duration.as_secs());
        while facility.current_time() < end {
            arrivals
                .admit_due(&mut facility)
                .wrap_err("failed to admit transactions")?;
            facility.advance_time(self.step)?;
            let elapsed = facility
                .current_time()
                .duration_since(self.start)
                .unwrap_or_default()
                .as_secs();
            if pb.position() < elapsed {
                pb.set_position(elapsed);
                pb.set_message(&format!(
                    "[{time}] [Q={queue}] [W={wait}s] [D={done}] [P={pending}]",
                    time = humantime::format_rfc3339_seconds(facility.current_time()),
                    queue = facility.total_queue_length(),
                    wait = facility.total_wait_time().as_secs(),
                    done = facility.completed(),
                    pending = arrivals.pending().len(),
                ));
            }
        }
        pb.finish();
        if !arrivals.is_empty() {
            log::info!(
                "{} transactions did not arrive before the end of the simulation",
                arrivals.pending().len()
            );
        }
        Ok(facility)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::QueueSnapshot;

    use std::io::Write;

    fn config(transactions_path: PathBuf, duration: u64) -> SimulationConfig {
        SimulationConfig {
            transactions_path,
            lanes: vec![
                LaneConfig {
                    id: LaneId::from(1),
                    lane_type: LaneType::Gen,
                },
                LaneConfig {
                    id: LaneId::from(2),
                    lane_type: LaneType::Etc,
                },
            ],
            start: humantime::parse_rfc3339("2019-05-04T00:00:00Z").unwrap(),
            duration: Duration::from_secs(duration),
            step: Duration::from_secs(1),
            seed: Some(17),
        }
    }

    fn write_transactions(dir: &Path) -> PathBuf {
        let path = dir.join("transactions.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "created,payment_type,axles").unwrap();
        for secs in 0..20 {
            writeln!(file, "2019-05-04T00:00:{:02}Z,ETC,2", secs).unwrap();
            writeln!(file, "2019-05-04T00:00:{:02}.5Z,CASH,2", secs).unwrap();
        }
        path
    }

    #[test]
    fn test_deserialize_config() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{
                "transactions_path": "transactions.csv",
                "lanes": [{"id": 1, "lane_type": "GEN"}, {"id": 2, "lane_type": "CC"}],
                "start": "2019-05-04T00:00:00Z",
                "duration": "3m",
                "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(config.transactions_path, PathBuf::from("transactions.csv"));
        assert_eq!(config.duration, Duration::from_secs(180));
        assert_eq!(config.step, Duration::from_secs(1));
        assert_eq!(config.seed, Some(7));
        assert_eq!(
            config.lanes[1],
            LaneConfig {
                id: LaneId::from(2),
                lane_type: LaneType::Cc
            }
        );
    }

    #[test]
    fn test_read_lanes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.json");
        std::fs::write(&path, r#"[{"id": 4, "lane_type": "PMB"}]"#).unwrap();
        assert_eq!(
            LaneConfig::read_all(&path).unwrap(),
            vec![LaneConfig {
                id: LaneId::from(4),
                lane_type: LaneType::Pmb
            }]
        );
        std::fs::write(&path, r#"[{"id": 4, "lane_type": "TOLL"}]"#).unwrap();
        assert!(LaneConfig::read_all(&path).is_err());
    }

    #[test]
    fn test_duplicate_lanes() {
        let mut config = config(PathBuf::from("unused.csv"), 1);
        config.lanes.push(LaneConfig {
            id: LaneId::from(1),
            lane_type: LaneType::Cc,
        });
        assert!(config.facility().is_err());
    }

    #[test]
    fn test_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(write_transactions(dir.path()), 600);
        let facility = config.run(&ProgressBar::hidden()).unwrap();
        assert_eq!(facility.current_time(), config.start + config.duration);
        assert_eq!(facility.history().len(), 600);
        assert_eq!(facility.completed(), 40);
        assert_eq!(
            facility.snapshot(),
            QueueSnapshot {
                queue_length: 0,
                wait_time: Duration::default()
            }
        );
        assert!(facility
            .history()
            .values()
            .any(|snapshot| snapshot.queue_length > 1));
    }

    #[test]
    fn test_run_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(write_transactions(dir.path()), 60);
        let lhs = config.run(&ProgressBar::hidden()).unwrap();
        let rhs = config.run(&ProgressBar::hidden()).unwrap();
        assert_eq!(lhs.history(), rhs.history());
    }

    #[test]
    fn test_missing_transactions_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().join("missing.csv"), 10);
        assert!(config.run(&ProgressBar::hidden()).is_err());
    }
}
