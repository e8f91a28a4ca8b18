use crate::{Facility, PaymentType, ServiceSampler, Transaction, TransactionId};

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use eyre::WrapErr;
use serde::{Deserialize, Deserializer};

/// A single row of the transactions input file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionRecord {
    /// When the vehicle arrived at the plaza, in RFC 3339 format.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created: SystemTime,
    /// Payment type code.
    pub payment_type: PaymentType,
    /// Number of axles.
    pub axles: u32,
}

impl TransactionRecord {
    /// Turns the record into a new transaction with the given ID.
    #[must_use]
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction::new(self.created, self.payment_type, self.axles, id)
    }
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_rfc3339_weak(&text).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

/// Transactions that have not yet reached the plaza.
///
/// Records are kept in the input order. Every time [`Arrivals::admit_due`] is called, the
/// records created before the current facility time are numbered sequentially and handed over to
/// the facility.
#[derive(Debug, Clone, Default)]
pub struct Arrivals {
    pending: Vec<TransactionRecord>,
    next_id: usize,
}

impl Arrivals {
    /// Constructs arrivals from records in their input order.
    #[must_use]
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            pending: records,
            next_id: 0,
        }
    }

    /// Reads CSV records with the header `created,payment_type,axles`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the records cannot be parsed.
    pub fn from_reader<R: io::Read>(reader: R) -> eyre::Result<Self> {
        let records = csv::Reader::from_reader(reader)
            .deserialize()
            .enumerate()
            .map(|(row, record)| {
                record.wrap_err_with(|| format!("invalid transaction record #{}", row + 1))
            })
            .collect::<eyre::Result<Vec<TransactionRecord>>>()?;
        Ok(Self::new(records))
    }

    /// Reads CSV records from a file. See [`Arrivals::from_reader`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or any of the records cannot be parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("unable to open transactions file: {}", path.display()))?;
        Self::from_reader(io::BufReader::new(file))
            .wrap_err_with(|| format!("unable to read transactions from {}", path.display()))
    }

    /// Records still waiting to be admitted.
    #[must_use]
    pub fn pending(&self) -> &[TransactionRecord] {
        &self.pending
    }

    /// Whether all records have been admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Adds to the facility all pending transactions created before its current time, and returns
    /// how many of them were added.
    ///
    /// # Errors
    ///
    /// Stops at the first transaction rejected by the facility and returns its error. The
    /// rejected transaction is discarded, and the due transactions after it remain pending in
    /// their input order.
    pub fn admit_due<S: ServiceSampler>(
        &mut self,
        facility: &mut Facility<S>,
    ) -> crate::Result<usize> {
        let now = facility.current_time();
        let mut admitted = 0;
        let mut rejection = None;
        let mut pending = Vec::with_capacity(self.pending.len());
        for record in std::mem::take(&mut self.pending) {
            if rejection.is_some() || record.created >= now {
                pending.push(record);
                continue;
            }
            let id = TransactionId::from(self.next_id);
            self.next_id += 1;
            match facility.add_transaction(record.into_transaction(id)) {
                Ok(_) => admitted += 1,
                Err(err) => {
                    log::warn!("Transaction {} rejected: {}", id, err);
                    rejection = Some(err);
                }
            }
        }
        self.pending = pending;
        if admitted > 0 {
            log::debug!("Admitted {} transactions", admitted);
        }
        rejection.map_or(Ok(admitted), Err)
    }
}
