//! Tests for publish acknowledgement tracking

use super::*;

use tokio::sync::oneshot::error::TryRecvError;

#[test]
fn test_qos0_resolves_when_written() {
    let tracker = PublishTracker::default();
    let mut rx = tracker.register(QoS::AtMostOnce);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    tracker.on_outgoing(0);
    assert_eq!(rx.try_recv(), Ok(Ok(())));
    assert_eq!(tracker.outstanding(), 0);
}

#[test]
fn test_qos1_waits_for_puback() {
    let tracker = PublishTracker::default();
    let mut first = tracker.register(QoS::AtLeastOnce);
    let mut second = tracker.register(QoS::AtLeastOnce);

    tracker.on_outgoing(7);
    tracker.on_outgoing(8);
    assert_eq!(first.try_recv(), Err(TryRecvError::Empty));

    tracker.on_acknowledged(8);
    assert_eq!(second.try_recv(), Ok(Ok(())));
    assert_eq!(first.try_recv(), Err(TryRecvError::Empty));

    tracker.on_acknowledged(7);
    assert_eq!(first.try_recv(), Ok(Ok(())));
    assert_eq!(tracker.outstanding(), 0);
}

#[test]
fn test_unregister_last() {
    let tracker = PublishTracker::default();
    let mut kept = tracker.register(QoS::AtLeastOnce);
    let _rejected = tracker.register(QoS::AtLeastOnce);
    tracker.unregister_last();
    assert_eq!(tracker.outstanding(), 1);

    tracker.on_outgoing(1);
    tracker.on_acknowledged(1);
    assert_eq!(kept.try_recv(), Ok(Ok(())));
}

#[test]
fn test_connection_lost_fails_waiters() {
    let tracker = PublishTracker::default();
    let mut written = tracker.register(QoS::AtLeastOnce);
    tracker.on_outgoing(3);
    let mut queued = tracker.register(QoS::AtLeastOnce);

    assert_eq!(tracker.on_connection_lost("broker went away", false), 2);
    assert_eq!(written.try_recv(), Ok(Err("broker went away".to_string())));
    assert_eq!(queued.try_recv(), Ok(Err("broker went away".to_string())));
    assert_eq!(tracker.outstanding(), 0);
}

#[test]
fn test_replayed_publishes_do_not_shift_pairing() {
    let tracker = PublishTracker::default();
    let mut written = tracker.register(QoS::AtLeastOnce);
    tracker.on_outgoing(3);
    let mut queued = tracker.register(QoS::ExactlyOnce);

    assert_eq!(tracker.on_connection_lost("keep-alive timeout", true), 2);
    assert!(written.try_recv().unwrap().is_err());
    assert!(queued.try_recv().unwrap().is_err());

    // after reconnect: the event loop retransmits 3, then writes the queued request
    let mut fresh = tracker.register(QoS::AtLeastOnce);
    tracker.on_outgoing(3);
    tracker.on_outgoing(4);
    tracker.on_outgoing(5);
    tracker.on_acknowledged(3);
    tracker.on_acknowledged(4);
    assert_eq!(fresh.try_recv(), Err(TryRecvError::Empty));

    tracker.on_acknowledged(5);
    assert_eq!(fresh.try_recv(), Ok(Ok(())));
    assert_eq!(tracker.outstanding(), 0);
}

#[test]
fn test_dropped_waiter_is_harmless() {
    let tracker = PublishTracker::default();
    drop(tracker.register(QoS::AtLeastOnce));
    tracker.on_outgoing(1);
    tracker.on_acknowledged(1);
    assert_eq!(tracker.outstanding(), 0);
}
