//! Toll plaza queue simulation.

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

use std::time::Duration;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

mod transaction;
pub use transaction::Transaction;

mod service;
pub use service::{FixedSampler, NormalSampler, ServiceSampler, ServiceTable, ServiceTime};

mod lane;
pub use lane::Lane;

mod facility;
pub use facility::{Facility, QueueSnapshot};

mod arrivals;
pub use arrivals::{Arrivals, TransactionRecord};

mod simulation;
pub use simulation::{LaneConfig, SimulationConfig};

/// Transaction ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct TransactionId(usize);

/// Lane ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct LaneId(usize);

/// The way a vehicle pays the toll.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    /// Cash paid to a collector.
    #[strum(serialize = "CASH")]
    Cash,
    /// Credit card.
    #[strum(serialize = "CC")]
    Cc,
    /// Electronic toll collection tag.
    #[strum(serialize = "ETC")]
    Etc,
    /// Pay-by-mail.
    #[strum(serialize = "PMB")]
    Pmb,
}

impl PaymentType {
    /// Parses a payment type from its textual code, e.g., `"CASH"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPaymentType`] if `code` is not one of `CASH`, `CC`, `ETC`, `PMB`.
    pub fn parse(code: &str) -> Result<Self> {
        code.parse()
            .map_err(|_| Error::UnknownPaymentType(code.to_string()))
    }
}

/// The kind of a lane. [`LaneType::Gen`] is a general purpose lane that is not tied to any
/// single payment type.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaneType {
    /// General purpose manual lane.
    #[strum(serialize = "GEN")]
    Gen,
    /// Credit card only.
    #[strum(serialize = "CC")]
    Cc,
    /// Tag only.
    #[strum(serialize = "ETC")]
    Etc,
    /// Cash only.
    #[strum(serialize = "CASH")]
    Cash,
    /// Pay-by-mail only.
    #[strum(serialize = "PMB")]
    Pmb,
}

impl LaneType {
    /// Parses a lane type from its textual code, e.g., `"GEN"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLaneType`] if `code` is not one of `GEN`, `CC`, `ETC`, `CASH`,
    /// `PMB`.
    pub fn parse(code: &str) -> Result<Self> {
        code.parse()
            .map_err(|_| Error::UnknownLaneType(code.to_string()))
    }

    /// Whether a lane of this type takes part in admission of transactions paid with
    /// `payment_type`: either the types match, or this is a general purpose lane.
    #[must_use]
    pub fn is_eligible_for(self, payment_type: PaymentType) -> bool {
        match (self, payment_type) {
            (LaneType::Gen, _)
            | (LaneType::Cc, PaymentType::Cc)
            | (LaneType::Etc, PaymentType::Etc)
            | (LaneType::Cash, PaymentType::Cash)
            | (LaneType::Pmb, PaymentType::Pmb) => true,
            _ => false,
        }
    }
}

/// Classification of [`Error`] values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value of the right type but outside of the allowed range or set.
    Validation,
    /// There is no service-time rule for the transaction in the target lane.
    Incompatible,
    /// No registered lane can accept the transaction.
    NoEligibleLane,
}

/// Error type encompassing all simulation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Textual payment type is not recognized.
    #[error("Unrecognized payment type: {0}")]
    UnknownPaymentType(String),
    /// Textual lane type is not recognized.
    #[error("Unrecognized lane type: {0}")]
    UnknownLaneType(String),
    /// Processing time given in seconds is negative or not a finite number.
    #[error("Processing time must be a non-negative number of seconds, got {0}")]
    InvalidDuration(f64),
    /// Processing time can be assigned only once.
    #[error("Transaction {0} already has a processing time assigned")]
    AlreadyAssigned(TransactionId),
    /// Another lane with the same ID is already registered in the facility.
    #[error("Lane {0} already exists in the facility")]
    DuplicateLane(LaneId),
    /// Facility clock must move forward.
    #[error("Time step must be greater than zero")]
    ZeroStep,
    /// Moving the facility clock by the step would go past the latest representable time.
    #[error("Facility clock overflows when advanced by {0:?}")]
    ClockOverflow(Duration),
    /// The lane has no service-time rule for this payment type.
    #[error("Lane {lane} of type {lane_type} cannot process {payment_type} transactions")]
    Incompatible {
        /// Target lane.
        lane: LaneId,
        /// Type of the target lane.
        lane_type: LaneType,
        /// Payment type of the rejected transaction.
        payment_type: PaymentType,
    },
    /// No lane of matching type and no general purpose lane is registered.
    #[error("No applicable lane to process {payment_type} transaction {transaction}")]
    NoEligibleLane {
        /// Rejected transaction.
        transaction: TransactionId,
        /// Its payment type.
        payment_type: PaymentType,
    },
}

impl Error {
    /// Returns the class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Incompatible { .. } => ErrorKind::Incompatible,
            Error::NoEligibleLane { .. } => ErrorKind::NoEligibleLane,
            _ => ErrorKind::Validation,
        }
    }
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
