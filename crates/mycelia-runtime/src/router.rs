//! Signal routing: outbox signal → socket-buffer enqueues.
//!
//! For each socket in insertion order whose origin and frequency match the
//! signal: agent destinations buffer the signal; broadcast sockets fan out
//! one copy per agent present at this moment, each stamped with its
//! destination; fruiting-body destinations are delivered directly into the
//! body's inbox. A signal may match several sockets; a signal matching
//! none is dropped and counted as a routing miss.

use crate::storage::{FruitingBody, PushOutcome, SocketState, SocketTarget};
use crate::types::Signal;
use indexmap::IndexMap;
use tracing::trace;

/// What routing one signal did.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteOutcome {
    /// Copies placed into socket buffers
    pub enqueued: u32,
    /// Drop-head evictions charged to the origin
    pub overflows: u32,
    /// Copies delivered directly to fruiting-body inboxes
    pub delivered: u32,
    /// At least one socket matched origin and frequency
    pub matched: bool,
}

/// Route one signal through every matching socket.
///
/// `agent_ids` is the insertion-ordered list of agents present right now;
/// broadcast fan-out copies are stamped per id.
pub fn route_signal(
    signal: &Signal,
    sockets: &mut [SocketState],
    agent_ids: &[String],
    bodies: &mut IndexMap<String, FruitingBody>,
) -> RouteOutcome {
    let mut outcome = RouteOutcome::default();

    for socket in sockets.iter_mut() {
        if socket.from != signal.origin || socket.frequency != signal.frequency {
            continue;
        }
        outcome.matched = true;
        match socket.to.clone() {
            SocketTarget::Agent(id) => {
                let mut copy = signal.clone();
                copy.destination = Some(id);
                absorb(socket.push(copy), &mut outcome);
            }
            SocketTarget::Broadcast => {
                for id in agent_ids {
                    let mut copy = signal.clone();
                    copy.destination = Some(id.clone());
                    absorb(socket.push(copy), &mut outcome);
                }
            }
            SocketTarget::Body(name) => {
                if let Some(body) = bodies.get_mut(&name) {
                    body.inbox.push(signal.clone());
                    outcome.delivered += 1;
                }
            }
        }
    }

    trace!(
        origin = %signal.origin,
        frequency = %signal.frequency,
        seq = signal.seq,
        enqueued = outcome.enqueued,
        overflows = outcome.overflows,
        delivered = outcome.delivered,
        matched = outcome.matched,
        "signal routed"
    );
    outcome
}

fn absorb(pushed: PushOutcome, outcome: &mut RouteOutcome) {
    match pushed {
        PushOutcome::Enqueued => outcome.enqueued += 1,
        PushOutcome::Evicted(_) => {
            outcome.enqueued += 1;
            outcome.overflows += 1;
        }
        PushOutcome::Disabled => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn signal(origin: &str, frequency: &str, seq: u64) -> Signal {
        Signal {
            frequency: frequency.into(),
            payload: IndexMap::new(),
            origin: origin.into(),
            destination: None,
            seq,
        }
    }

    fn agent_socket(from: &str, to: &str, frequency: &str, capacity: usize) -> SocketState {
        SocketState::new(
            from.into(),
            SocketTarget::Agent(to.into()),
            frequency.into(),
            capacity,
        )
    }

    #[test]
    fn test_no_match_is_a_miss() {
        let mut sockets = vec![agent_socket("a", "b", "ping", 4)];
        let mut bodies = IndexMap::new();
        let outcome = route_signal(&signal("x", "ping", 1), &mut sockets, &[], &mut bodies);
        assert!(!outcome.matched);
        assert_eq!(outcome.enqueued, 0);
    }

    #[test]
    fn test_multiple_matching_sockets_all_receive() {
        let mut sockets = vec![
            agent_socket("a", "b", "ping", 4),
            agent_socket("a", "c", "ping", 4),
            agent_socket("a", "b", "pong", 4),
        ];
        let mut bodies = IndexMap::new();
        let outcome = route_signal(&signal("a", "ping", 1), &mut sockets, &[], &mut bodies);
        assert!(outcome.matched);
        assert_eq!(outcome.enqueued, 2);
        assert_eq!(sockets[0].len(), 1);
        assert_eq!(sockets[1].len(), 1);
        assert_eq!(sockets[2].len(), 0);
    }

    #[test]
    fn test_broadcast_copies_per_present_agent() {
        let mut sockets = vec![SocketState::new(
            "a".into(),
            SocketTarget::Broadcast,
            "ping".into(),
            16,
        )];
        let mut bodies = IndexMap::new();
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = route_signal(&signal("a", "ping", 1), &mut sockets, &ids, &mut bodies);
        assert_eq!(outcome.enqueued, 3);
        let drained = sockets[0].drain();
        let destinations: Vec<_> = drained
            .iter()
            .map(|s| s.destination.clone().unwrap())
            .collect();
        assert_eq!(destinations, ids);
    }

    #[test]
    fn test_body_destination_is_delivered_directly() {
        let mut sockets = vec![SocketState::new(
            "a".into(),
            SocketTarget::Body("out".into()),
            "pong".into(),
            4,
        )];
        let mut bodies = IndexMap::new();
        bodies.insert("out".to_string(), FruitingBody::new("out".into()));
        let outcome = route_signal(&signal("a", "pong", 7), &mut sockets, &[], &mut bodies);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(sockets[0].len(), 0);
        assert_eq!(bodies["out"].inbox.len(), 1);
        assert_eq!(bodies["out"].inbox[0].seq, 7);
    }

    #[test]
    fn test_overflow_is_counted() {
        let mut sockets = vec![agent_socket("a", "b", "ping", 2)];
        let mut bodies = IndexMap::new();
        for seq in 1..=3 {
            route_signal(&signal("a", "ping", seq), &mut sockets, &[], &mut bodies);
        }
        assert_eq!(sockets[0].len(), 2);
        let outcome = route_signal(&signal("a", "ping", 4), &mut sockets, &[], &mut bodies);
        assert_eq!(outcome.overflows, 1);
    }
}
