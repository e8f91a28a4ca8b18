use crate::{Error, PaymentType, Result, TransactionId};

use std::fmt;
use std::time::{Duration, SystemTime};

/// A single vehicle paying the toll.
///
/// A transaction is created with no processing time assigned. The processing time is drawn once
/// a lane accepts the transaction, and then it is counted down every time the transaction is at
/// the head of its lane's queue when the clock moves. Once the remaining time reaches zero, the
/// transaction is complete and is never modified again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    created: SystemTime,
    payment_type: PaymentType,
    axles: u32,
    processing_time: Option<Duration>,
    remaining: Duration,
    complete: bool,
}

impl Transaction {
    /// Constructs a new transaction, created at `created`, with no processing time assigned.
    #[must_use]
    pub fn new(
        created: SystemTime,
        payment_type: PaymentType,
        axles: u32,
        id: TransactionId,
    ) -> Self {
        Self {
            id,
            created,
            payment_type,
            axles,
            processing_time: None,
            remaining: Duration::default(),
            complete: false,
        }
    }

    /// Assigns the time it will take to process this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyAssigned`] if the processing time has been assigned before;
    /// in that case, the transaction is left intact.
    pub fn assign_processing_duration(&mut self, duration: Duration) -> Result<()> {
        if self.processing_time.is_some() {
            return Err(Error::AlreadyAssigned(self.id));
        }
        self.processing_time = Some(duration);
        self.remaining = duration;
        Ok(())
    }

    /// Assigns the processing time given in (possibly fractional) seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`] if `secs` is negative, not finite, or too large to be
    /// represented as [`Duration`], and [`Error::AlreadyAssigned`] if the processing time has
    /// been assigned before. The transaction is left intact in both cases.
    pub fn assign_processing_secs(&mut self, secs: f64) -> Result<()> {
        let duration =
            Duration::try_from_secs_f64(secs).map_err(|_| Error::InvalidDuration(secs))?;
        self.assign_processing_duration(duration)
    }

    /// Counts down the remaining processing time by `step` and returns `true` if the transaction
    /// is complete.
    ///
    /// The remaining time never drops below zero: if `step` overshoots it, the transaction ends
    /// with exactly zero remaining. Transactions without processing time assigned, as well as
    /// complete ones, are not affected.
    pub fn advance(&mut self, step: Duration) -> bool {
        if self.complete || self.processing_time.is_none() {
            return self.complete;
        }
        self.remaining = self.remaining.saturating_sub(step);
        if self.remaining == Duration::default() {
            self.complete = true;
        }
        self.complete
    }

    /// The ID of this transaction.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The time the vehicle arrived at the plaza.
    #[must_use]
    pub fn created(&self) -> SystemTime {
        self.created
    }

    /// The way the toll is paid.
    #[must_use]
    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    /// Number of vehicle axles.
    #[must_use]
    pub fn axles(&self) -> u32 {
        self.axles
    }

    /// Processing time assigned by the lane, unaffected by the countdown.
    #[must_use]
    pub fn processing_time(&self) -> Option<Duration> {
        self.processing_time
    }

    /// Processing time left.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whether the transaction has been fully processed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction {} [{}, {} axles] created {} remaining {:?}{}",
            self.id,
            self.payment_type,
            self.axles,
            humantime::format_rfc3339_seconds(self.created),
            self.remaining,
            if self.complete { " (complete)" } else { "" }
        )
    }
}
