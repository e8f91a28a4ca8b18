use std::time::{Duration, SystemTime};

use tollsim::{
    ErrorKind, Facility, Lane, LaneId, LaneType, NormalSampler, PaymentType, Transaction,
    TransactionId,
};

fn start() -> SystemTime {
    humantime::parse_rfc3339("2019-05-04T12:00:00Z").unwrap()
}

fn transaction(id: usize, payment_type: PaymentType) -> Transaction {
    Transaction::new(start(), payment_type, 2, TransactionId::from(id))
}

#[test]
fn etc_lane_drains_within_ninety_seconds() {
    let mut facility = Facility::new(start(), NormalSampler::seeded(2019));
    facility
        .add_lane(Lane::new(LaneId::from(1), LaneType::Etc))
        .unwrap();
    for id in 0..10 {
        facility
            .add_transaction(transaction(id, PaymentType::Etc))
            .unwrap();
    }
    assert_eq!(facility.total_queue_length(), 10);
    assert!(facility.total_wait_time() > Duration::from_secs(10));

    for _ in 0..90 {
        facility.tick().unwrap();
    }
    assert_eq!(facility.total_queue_length(), 0);
    assert_eq!(facility.total_wait_time(), Duration::default());
    assert_eq!(facility.completed(), 10);
    assert_eq!(facility.current_time(), start() + Duration::from_secs(90));
    assert_eq!(facility.history().len(), 90);
}

#[test]
fn etc_only_plaza_rejects_cash() {
    let mut facility = Facility::new(start(), NormalSampler::seeded(2019));
    facility
        .add_lane(Lane::new(LaneId::from(1), LaneType::Etc))
        .unwrap();
    let err = facility
        .add_transaction(transaction(0, PaymentType::Cash))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoEligibleLane);
    assert_eq!(facility.total_queue_length(), 0);
}

#[test]
fn mixed_plaza_routes_by_payment_type() {
    let mut facility = Facility::new(start(), NormalSampler::seeded(5));
    for (id, lane_type) in [LaneType::Gen, LaneType::Etc, LaneType::Cc]
        .iter()
        .enumerate()
    {
        facility
            .add_lane(Lane::new(LaneId::from(id + 1), *lane_type))
            .unwrap();
    }
    assert_eq!(
        facility
            .add_transaction(transaction(0, PaymentType::Cash))
            .unwrap(),
        LaneId::from(1)
    );
    assert_eq!(
        facility
            .add_transaction(transaction(1, PaymentType::Etc))
            .unwrap(),
        LaneId::from(2)
    );
    assert_eq!(
        facility
            .add_transaction(transaction(2, PaymentType::Cc))
            .unwrap(),
        LaneId::from(3)
    );
    assert_eq!(
        facility
            .add_transaction(transaction(3, PaymentType::Pmb))
            .unwrap(),
        LaneId::from(1)
    );
    let queues: Vec<_> = facility.lane_queues().into_iter().collect();
    assert_eq!(
        queues,
        vec![(LaneId::from(1), 2), (LaneId::from(2), 1), (LaneId::from(3), 1)]
    );
}
