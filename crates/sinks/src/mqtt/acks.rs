//! Broker acknowledgements for published messages
//!
//! rumqttc hands out packet ids only when the event loop writes a publish,
//! so requests are paired with ids in submission order: every accepted
//! request is queued, and each `Outgoing::Publish(pkid)` event takes the
//! oldest one. QoS 0 publishes resolve when written, QoS 1 on `PubAck` and
//! QoS 2 on `PubComp`.
//!
//! When the connection drops, every waiting publish fails. Requests still
//! queued stay behind as placeholders, because the event loop will write
//! them after reconnecting. Packet ids that were written but not
//! acknowledged are remembered, because the event loop retransmits them
//! after reconnecting.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use rumqttc::QoS;
use tokio::sync::oneshot;

#[cfg(test)]
#[path = "acks_test.rs"]
mod tests;

/// Outcome reported to a waiting publisher
pub(crate) type AckResult = Result<(), String>;

struct Pending {
    qos: QoS,
    ack: oneshot::Sender<AckResult>,
}

#[derive(Default)]
struct State {
    /// accepted by the client, not yet written; `None` once abandoned
    queued: VecDeque<Option<Pending>>,
    /// written with QoS 1 or 2, keyed by packet id
    in_flight: HashMap<u16, oneshot::Sender<AckResult>>,
    /// written before a disconnect, will be written again after reconnect
    replayed: HashSet<u16>,
}

/// Publishes waiting for the broker, in submission order
#[derive(Default)]
pub(crate) struct PublishTracker {
    state: Mutex<State>,
}

impl PublishTracker {
    /// Register a publish about to be handed to the client
    ///
    /// Callers must submit requests to the client in the order they
    /// register them.
    pub fn register(&self, qos: QoS) -> oneshot::Receiver<AckResult> {
        let (ack, rx) = oneshot::channel();
        self.state.lock().queued.push_back(Some(Pending { qos, ack }));
        rx
    }

    /// Undo the latest [`register`](Self::register) after the client rejected the request
    pub fn unregister_last(&self) {
        self.state.lock().queued.pop_back();
    }

    /// The event loop wrote a publish
    pub fn on_outgoing(&self, pkid: u16) {
        let mut state = self.state.lock();
        if pkid != 0 && state.replayed.remove(&pkid) {
            return;
        }
        let Some(Some(pending)) = state.queued.pop_front() else {
            return;
        };
        if pending.qos == QoS::AtMostOnce {
            let _ = pending.ack.send(Ok(()));
        } else {
            state.in_flight.insert(pkid, pending.ack);
        }
    }

    /// The broker acknowledged `pkid` (PubAck for QoS 1, PubComp for QoS 2)
    pub fn on_acknowledged(&self, pkid: u16) {
        if let Some(ack) = self.state.lock().in_flight.remove(&pkid) {
            let _ = ack.send(Ok(()));
        }
    }

    /// Fail every waiting publish
    ///
    /// `will_replay` is whether the event loop keeps its pending requests
    /// and writes them again after reconnecting.
    pub fn on_connection_lost(&self, reason: &str, will_replay: bool) -> usize {
        let mut state = self.state.lock();
        let mut failed = 0;

        let in_flight: Vec<_> = state.in_flight.drain().collect();
        for (pkid, ack) in in_flight {
            if will_replay {
                state.replayed.insert(pkid);
            }
            let _ = ack.send(Err(reason.to_string()));
            failed += 1;
        }

        if will_replay {
            for slot in state.queued.iter_mut() {
                if let Some(pending) = slot.take() {
                    let _ = pending.ack.send(Err(reason.to_string()));
                    failed += 1;
                }
            }
        } else {
            for pending in state.queued.drain(..).flatten() {
                let _ = pending.ack.send(Err(reason.to_string()));
                failed += 1;
            }
            state.replayed.clear();
        }
        failed
    }

    /// Publishes registered and not yet resolved
    pub fn outstanding(&self) -> usize {
        let state = self.state.lock();
        state.queued.iter().flatten().count() + state.in_flight.len()
    }
}
