//! Service-time model: which payment types each lane type can process, and how long it takes.

use crate::{LaneType, PaymentType};

use std::time::Duration;

use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
use rand_distr::{Distribution, Normal};

/// Normally distributed processing time, in seconds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ServiceTime {
    /// Mean processing time in seconds.
    pub mean: f64,
    /// Standard deviation in seconds.
    pub std_dev: f64,
}

impl ServiceTime {
    /// Constructs a new service time distribution.
    #[must_use]
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }
}

/// Maps a pair of payment type and lane type to the distribution of the processing time.
/// Pairs that are not in the table are incompatible: such transactions cannot be processed in
/// that type of lane.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTable {
    rules: Vec<(PaymentType, LaneType, ServiceTime)>,
}

impl Default for ServiceTable {
    fn default() -> Self {
        Self::empty()
            .with_rule(PaymentType::Cc, LaneType::Cc, ServiceTime::new(13.0, 2.5))
            .with_rule(PaymentType::Etc, LaneType::Etc, ServiceTime::new(5.0, 1.0))
            .with_rule(PaymentType::Cash, LaneType::Gen, ServiceTime::new(13.5, 2.5))
            .with_rule(PaymentType::Cc, LaneType::Gen, ServiceTime::new(13.0, 2.5))
            .with_rule(PaymentType::Pmb, LaneType::Gen, ServiceTime::new(7.0, 1.0))
            .with_rule(PaymentType::Etc, LaneType::Gen, ServiceTime::new(6.0, 1.0))
    }
}

impl ServiceTable {
    /// A table without any rules, i.e., one where no transaction is compatible with any lane.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds or replaces the rule for the given pair.
    #[must_use]
    pub fn with_rule(
        mut self,
        payment_type: PaymentType,
        lane_type: LaneType,
        time: ServiceTime,
    ) -> Self {
        self.rules
            .retain(|&(p, l, _)| (p, l) != (payment_type, lane_type));
        self.rules.push((payment_type, lane_type, time));
        self
    }

    /// Returns the processing time distribution for the pair, or `None` if incompatible.
    #[must_use]
    pub fn lookup(&self, payment_type: PaymentType, lane_type: LaneType) -> Option<ServiceTime> {
        self.rules
            .iter()
            .find(|&&(p, l, _)| p == payment_type && l == lane_type)
            .map(|&(_, _, time)| time)
    }

    /// Iterates over all rules.
    pub fn rules(&self) -> impl Iterator<Item = &(PaymentType, LaneType, ServiceTime)> {
        self.rules.iter()
    }
}

/// Source of processing times. Each call draws an independent sample.
pub trait ServiceSampler {
    /// Draws a processing time from the given distribution.
    fn sample(&mut self, time: &ServiceTime) -> Duration;
}

impl<S: ServiceSampler + ?Sized> ServiceSampler for &mut S {
    fn sample(&mut self, time: &ServiceTime) -> Duration {
        (**self).sample(time)
    }
}

/// Draws processing times from a normal distribution.
///
/// Negative samples are rounded up to zero seconds, and samples too large for [`Duration`]
/// saturate at [`Duration::MAX`].
#[derive(Debug, Clone)]
pub struct NormalSampler<R> {
    rng: R,
}

impl<R: Rng> NormalSampler<R> {
    /// Constructs a sampler drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl NormalSampler<ChaChaRng> {
    /// Constructs a sampler with a deterministic generator seeded with `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaChaRng::seed_from_u64(seed))
    }

    /// Constructs a sampler with a generator seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(ChaChaRng::from_entropy())
    }
}

impl<R: Rng> ServiceSampler for NormalSampler<R> {
    fn sample(&mut self, time: &ServiceTime) -> Duration {
        let secs = match Normal::new(time.mean, time.std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => {
                log::warn!("Invalid service time {:?}, using the mean", time);
                time.mean
            }
        };
        let secs = match secs.partial_cmp(&0_f64) {
            None | Some(std::cmp::Ordering::Less) => 0_f64,
            _ => secs,
        };
        Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
            log::warn!("Sampled {}s out of range for {:?}, saturating", secs, time);
            Duration::MAX
        })
    }
}

/// Always returns the same processing time, regardless of the distribution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedSampler(pub Duration);

impl ServiceSampler for FixedSampler {
    fn sample(&mut self, _: &ServiceTime) -> Duration {
        self.0
    }
}
