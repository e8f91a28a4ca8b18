use crate::{
    Error, LaneId, LaneType, PaymentType, Result, ServiceSampler, ServiceTable, Transaction,
};

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// A single toll booth with its own queue of vehicles.
///
/// Transactions are processed one at a time in the order of arrival: only the one at the head of
/// the queue is counted down, and it leaves the queue as soon as it is complete.
#[derive(Debug, Clone)]
pub struct Lane {
    id: LaneId,
    lane_type: LaneType,
    queue: VecDeque<Transaction>,
    table: ServiceTable,
}

impl Lane {
    /// Constructs an empty lane with the default service table.
    #[must_use]
    pub fn new(id: LaneId, lane_type: LaneType) -> Self {
        Self::with_table(id, lane_type, ServiceTable::default())
    }

    /// Constructs an empty lane with a custom service table.
    #[must_use]
    pub fn with_table(id: LaneId, lane_type: LaneType, table: ServiceTable) -> Self {
        Self {
            id,
            lane_type,
            queue: VecDeque::new(),
            table,
        }
    }

    /// Lane ID.
    #[must_use]
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Lane type.
    #[must_use]
    pub fn lane_type(&self) -> LaneType {
        self.lane_type
    }

    /// Whether transactions paid with `payment_type` may be routed to this lane.
    /// This does not guarantee that the lane can process them.
    #[must_use]
    pub fn accepts(&self, payment_type: PaymentType) -> bool {
        self.lane_type.is_eligible_for(payment_type)
    }

    /// Appends the transaction to the end of the queue, assigning it a processing time drawn
    /// from the lane's service table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Incompatible`] if the service table has no rule for the transaction's
    /// payment type in this type of lane, or [`Error::AlreadyAssigned`] if the transaction has
    /// been processed by a lane before. In either case, the transaction is not queued.
    pub fn enqueue<S>(&mut self, mut transaction: Transaction, sampler: &mut S) -> Result<()>
    where
        S: ServiceSampler + ?Sized,
    {
        let payment_type = transaction.payment_type();
        let time = self
            .table
            .lookup(payment_type, self.lane_type)
            .ok_or_else(|| Error::Incompatible {
                lane: self.id,
                lane_type: self.lane_type,
                payment_type,
            })?;
        transaction.assign_processing_duration(sampler.sample(&time))?;
        log::debug!(
            "Lane {} queued transaction {} for {:?}",
            self.id,
            transaction.id(),
            transaction.remaining()
        );
        self.queue.push_back(transaction);
        Ok(())
    }

    /// Total remaining processing time of all queued transactions, saturating at
    /// [`Duration::MAX`].
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        self.queue
            .iter()
            .map(Transaction::remaining)
            .fold(Duration::default(), Duration::saturating_add)
    }

    /// Number of queued transactions.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    /// Iterates over the queued transactions, starting from the one being processed.
    pub fn queue(&self) -> impl Iterator<Item = &Transaction> {
        self.queue.iter()
    }

    /// Processes the head of the queue for `step`. If it completes, it is removed from the queue
    /// and returned.
    pub fn advance(&mut self, step: Duration) -> Option<Transaction> {
        let head = self.queue.front_mut()?;
        if head.advance(step) {
            let done = self.queue.pop_front();
            if let Some(transaction) = &done {
                log::debug!("Lane {} finished transaction {}", self.id, transaction.id());
            }
            done
        } else {
            None
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lane {} [{}]: {} queued, {:?} wait",
            self.id,
            self.lane_type,
            self.queue_length(),
            self.wait_time()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ErrorKind, FixedSampler, NormalSampler, ServiceTime, TransactionId};

    use std::time::SystemTime;

    use strum::IntoEnumIterator;

    fn transaction(id: usize, payment_type: PaymentType) -> Transaction {
        Transaction::new(SystemTime::UNIX_EPOCH, payment_type, 2, TransactionId::from(id))
    }

    fn secs(secs: u64) -> FixedSampler {
        FixedSampler(Duration::from_secs(secs))
    }

    #[test]
    fn test_empty_lane() {
        for lane_type in LaneType::iter() {
            let lane = Lane::new(LaneId::from(3), lane_type);
            assert_eq!(lane.id(), LaneId::from(3));
            assert_eq!(lane.lane_type(), lane_type);
            assert_eq!(lane.queue_length(), 0);
            assert_eq!(lane.wait_time(), Duration::default());
        }
    }

    #[test]
    fn test_advance_empty_lane() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Gen);
        assert_eq!(lane.advance(Duration::from_secs(1)), None);
        assert_eq!(lane.queue_length(), 0);
    }

    #[test]
    fn test_enqueue_compatible() {
        let table = ServiceTable::default();
        for &(payment_type, lane_type, _) in table.rules() {
            let mut lane = Lane::new(LaneId::from(1), lane_type);
            lane.enqueue(transaction(0, payment_type), &mut secs(5))
                .unwrap();
            assert_eq!(lane.queue_length(), 1);
            assert_eq!(lane.wait_time(), Duration::from_secs(5));
            let head = lane.queue().next().unwrap();
            assert_eq!(head.processing_time(), Some(Duration::from_secs(5)));
        }
    }

    #[test]
    fn test_enqueue_incompatible() {
        let table = ServiceTable::default();
        for payment_type in PaymentType::iter() {
            for lane_type in LaneType::iter() {
                if table.lookup(payment_type, lane_type).is_some() {
                    continue;
                }
                let mut lane = Lane::new(LaneId::from(4), lane_type);
                let err = lane
                    .enqueue(transaction(0, payment_type), &mut secs(5))
                    .unwrap_err();
                assert_eq!(
                    err,
                    Error::Incompatible {
                        lane: LaneId::from(4),
                        lane_type,
                        payment_type
                    }
                );
                assert_eq!(err.kind(), ErrorKind::Incompatible);
                assert_eq!(lane.queue_length(), 0);
            }
        }
    }

    #[test]
    fn test_enqueue_assigned_transaction() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Gen);
        let mut cash = transaction(8, PaymentType::Cash);
        cash.assign_processing_duration(Duration::from_secs(1))
            .unwrap();
        let err = lane.enqueue(cash, &mut secs(5)).unwrap_err();
        assert_eq!(err, Error::AlreadyAssigned(TransactionId::from(8)));
        assert_eq!(lane.queue_length(), 0);
    }

    #[test]
    fn test_wait_time_of_forced_durations() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Gen);
        let n = 7;
        for id in 0..n {
            lane.enqueue(transaction(id, PaymentType::Cash), &mut secs(5))
                .unwrap();
        }
        assert_eq!(lane.queue_length(), n);
        assert_eq!(lane.wait_time(), Duration::from_secs(5 * n as u64));
    }

    #[test]
    fn test_sampled_wait_time() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Gen);
        let mut sampler = NormalSampler::seeded(17);
        for id in 0..5 {
            lane.enqueue(transaction(id, PaymentType::Cash), &mut sampler)
                .unwrap();
        }
        let total: Duration = lane.queue().filter_map(Transaction::processing_time).sum();
        assert_eq!(lane.wait_time(), total);
        assert!(lane.wait_time() > Duration::from_secs(5 * 3));
        assert!(lane.wait_time() < Duration::from_secs(5 * 24));
    }

    #[test]
    fn test_wait_time_saturates() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Gen);
        for id in 0..2 {
            lane.enqueue(transaction(id, PaymentType::Cash), &mut FixedSampler(Duration::MAX))
                .unwrap();
        }
        assert_eq!(lane.wait_time(), Duration::MAX);
    }

    #[test]
    fn test_custom_table() {
        let table = ServiceTable::empty().with_rule(
            PaymentType::Cash,
            LaneType::Cash,
            ServiceTime::new(4.0, 0.0),
        );
        let mut lane = Lane::with_table(LaneId::from(2), LaneType::Cash, table);
        let mut sampler = NormalSampler::seeded(0);
        lane.enqueue(transaction(0, PaymentType::Cash), &mut sampler)
            .unwrap();
        assert_eq!(lane.wait_time(), Duration::from_secs(4));
    }

    #[test]
    fn test_only_head_advances() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Gen);
        lane.enqueue(transaction(0, PaymentType::Cash), &mut secs(2))
            .unwrap();
        lane.enqueue(transaction(1, PaymentType::Pmb), &mut secs(3))
            .unwrap();
        assert_eq!(lane.advance(Duration::from_secs(1)), None);
        let remaining: Vec<_> = lane.queue().map(Transaction::remaining).collect();
        assert_eq!(remaining, vec![Duration::from_secs(1), Duration::from_secs(3)]);

        let done = lane.advance(Duration::from_secs(1)).unwrap();
        assert_eq!(done.id(), TransactionId::from(0));
        assert!(done.is_complete());
        assert_eq!(lane.queue_length(), 1);
        assert_eq!(lane.wait_time(), Duration::from_secs(3));

        for _ in 0..2 {
            assert_eq!(lane.advance(Duration::from_secs(1)), None);
        }
        let done = lane.advance(Duration::from_secs(1)).unwrap();
        assert_eq!(done.id(), TransactionId::from(1));
        assert_eq!(lane.queue_length(), 0);
        assert_eq!(lane.wait_time(), Duration::default());
    }

    #[test]
    fn test_zero_time_transaction_leaves_on_next_tick() {
        let mut lane = Lane::new(LaneId::from(1), LaneType::Etc);
        lane.enqueue(transaction(0, PaymentType::Etc), &mut secs(0))
            .unwrap();
        assert_eq!(lane.queue_length(), 1);
        assert!(lane.advance(Duration::from_secs(1)).is_some());
        assert_eq!(lane.queue_length(), 0);
    }
}
