use crate::{Error, Lane, LaneId, NormalSampler, Result, ServiceSampler, Transaction};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, SystemTime};

use itertools::Itertools;
use rand_chacha::ChaChaRng;

/// Aggregated state of all lanes at a point in time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Number of vehicles in all lanes.
    pub queue_length: usize,
    /// Sum of remaining processing times in all lanes.
    pub wait_time: Duration,
}

/// Toll plaza: a set of lanes driven by a common clock.
///
/// New transactions are routed to the eligible lane with the shortest wait time, see
/// [`Facility::add_transaction`]. Every call to [`Facility::advance_time`] moves the clock
/// forward, processes the head of each lane, and records a [`QueueSnapshot`] in the history.
pub struct Facility<S = NormalSampler<ChaChaRng>> {
    start_time: SystemTime,
    current_time: SystemTime,
    lanes: Vec<Lane>,
    lane_positions: HashMap<LaneId, usize>,
    sampler: S,
    completed: usize,
    history: BTreeMap<SystemTime, QueueSnapshot>,
}

impl<S: ServiceSampler> Facility<S> {
    /// Constructs a facility with no lanes, starting the clock at `start_time`.
    /// Processing times of all transactions will be drawn from `sampler`.
    pub fn new(start_time: SystemTime, sampler: S) -> Self {
        Self {
            start_time,
            current_time: start_time,
            lanes: Vec::new(),
            lane_positions: HashMap::new(),
            sampler,
            completed: 0,
            history: BTreeMap::new(),
        }
    }

    /// Registers a new lane.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLane`] if a lane with the same ID has been registered before.
    pub fn add_lane(&mut self, lane: Lane) -> Result<()> {
        if self.lane_positions.contains_key(&lane.id()) {
            return Err(Error::DuplicateLane(lane.id()));
        }
        self.lane_positions.insert(lane.id(), self.lanes.len());
        self.lanes.push(lane);
        Ok(())
    }

    /// Routes the transaction to the eligible lane with the least wait time, and returns the ID
    /// of that lane.
    ///
    /// A lane is eligible if its type is the same as the payment type, or if it is a general
    /// purpose lane. If two or more lanes have the same wait time, the one registered first wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEligibleLane`] if there is no eligible lane, or any error returned by
    /// [`Lane::enqueue`] of the selected lane.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<LaneId> {
        let payment_type = transaction.payment_type();
        let lane = self
            .lanes
            .iter_mut()
            .filter(|lane| lane.accepts(payment_type))
            .min_by_key(|lane| lane.wait_time())
            .ok_or_else(|| Error::NoEligibleLane {
                transaction: transaction.id(),
                payment_type,
            })?;
        lane.enqueue(transaction, &mut self.sampler)?;
        Ok(lane.id())
    }

    /// Moves the clock forward by `step`, and processes the head of every lane for that time.
    /// Returns transactions that were completed in this step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroStep`] if `step` is zero, or [`Error::ClockOverflow`] if the clock
    /// cannot be moved by `step`; in both cases the facility is left intact.
    pub fn advance_time(&mut self, step: Duration) -> Result<Vec<Transaction>> {
        if step == Duration::default() {
            return Err(Error::ZeroStep);
        }
        self.current_time = self
            .current_time
            .checked_add(step)
            .ok_or(Error::ClockOverflow(step))?;
        let completed: Vec<_> = self
            .lanes
            .iter_mut()
            .filter_map(|lane| lane.advance(step))
            .collect();
        self.completed += completed.len();
        let snapshot = self.snapshot();
        log::trace!(
            "[{}] queued: {}, wait: {:?}, completed: {}",
            humantime::format_rfc3339_seconds(self.current_time),
            snapshot.queue_length,
            snapshot.wait_time,
            completed.len()
        );
        self.history.insert(self.current_time, snapshot);
        Ok(completed)
    }

    /// Advances the clock by one second. See [`Facility::advance_time`].
    ///
    /// # Errors
    ///
    /// Never fails for a one-second step, but forwards the result of
    /// [`Facility::advance_time`].
    pub fn tick(&mut self) -> Result<Vec<Transaction>> {
        self.advance_time(Duration::from_secs(1))
    }
}

impl<S> Facility<S> {
    /// Total number of vehicles in all lanes.
    #[must_use]
    pub fn total_queue_length(&self) -> usize {
        self.lanes.iter().map(Lane::queue_length).sum()
    }

    /// Total remaining processing time in all lanes.
    #[must_use]
    pub fn total_wait_time(&self) -> Duration {
        self.lanes
            .iter()
            .map(Lane::wait_time)
            .fold(Duration::default(), Duration::saturating_add)
    }

    /// Current totals.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue_length: self.total_queue_length(),
            wait_time: self.total_wait_time(),
        }
    }

    /// Queue length of each lane.
    #[must_use]
    pub fn lane_queues(&self) -> BTreeMap<LaneId, usize> {
        self.lanes
            .iter()
            .map(|lane| (lane.id(), lane.queue_length()))
            .collect()
    }

    /// Lanes in the order of registration.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    /// Returns the lane with the given ID.
    #[must_use]
    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lane_positions.get(&id).map(|&pos| &self.lanes[pos])
    }

    /// Snapshot recorded after each time step, keyed by the time at the end of the step.
    #[must_use]
    pub fn history(&self) -> &BTreeMap<SystemTime, QueueSnapshot> {
        &self.history
    }

    /// The time the simulation started at.
    #[must_use]
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Current facility time.
    #[must_use]
    pub fn current_time(&self) -> SystemTime {
        self.current_time
    }

    /// Number of transactions processed since the start.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl<S> fmt::Display for Facility<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Facility started {} now {} [{}]",
            humantime::format_rfc3339_seconds(self.start_time),
            humantime::format_rfc3339_seconds(self.current_time),
            self.lanes
                .iter()
                .format_with(", ", |lane, f| f(&format_args!(
                    "{}: {}",
                    lane.id(),
                    lane.queue_length()
                )))
        )
    }
}
