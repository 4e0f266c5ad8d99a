use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nestcall_types_common::{CallId, MemberId};
use nestcall_types_signaling::{PeerId, SignalMessage};
use parking_lot::Mutex;
use snafu::OptionExt;

use crate::error::{CallNotFoundSnafu, CoreError};

/// The default time a deposited signal waits in a mailbox before `sweep` discards it
/// (spec §4.1 "5 minutes").
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// The known peers of a call at the moment of a broadcast deposit, resolved by the
/// caller (typically `nestcall_call_core::CallCoordinator`, which can see both the
/// `ParticipantRegistry` and whether a recorder session is active) before it ever
/// touches the relay. Kept separate from [`SignalRelay`] itself so the relay can stay
/// a pure, never-suspending in-memory map (spec §5).
#[derive(Debug, Clone)]
pub struct KnownPeers {
    pub members: Vec<MemberId>,
    pub recorder_active: bool,
}

struct Mailbox {
    messages: VecDeque<(SignalMessage, Instant)>,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
        }
    }
}

struct CallMailboxes {
    peers: HashMap<PeerId, Mailbox>,
}

/// The ephemeral signaling plane (spec §4.1 "SignalRelay").
///
/// A two-level map, `callId -> peerId -> mailbox`, guarded by a coarse outer lock for
/// insert/remove of whole calls and a per-call [`Mutex`] for the hot path of
/// deposit/drain. Every operation is synchronous and non-blocking: nothing here ever
/// awaits a capability, matching spec §5's concurrency note.
pub struct SignalRelay {
    calls: Mutex<HashMap<CallId, Arc<Mutex<CallMailboxes>>>>,
    ttl: Duration,
}

impl SignalRelay {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn call_entry(&self, call_id: CallId) -> Arc<Mutex<CallMailboxes>> {
        Arc::clone(
            self.calls
                .lock()
                .entry(call_id)
                .or_insert_with(|| {
                    Arc::new(Mutex::new(CallMailboxes {
                        peers: HashMap::new(),
                    }))
                }),
        )
    }

    fn append(&self, call_id: CallId, peer: PeerId, message: SignalMessage) {
        let entry = self.call_entry(call_id);
        let mut mailboxes = entry.lock();
        mailboxes
            .peers
            .entry(peer)
            .or_insert_with(Mailbox::new)
            .messages
            .push_back((message, Instant::now()));
    }

    /// Deposit `message` from `from` into `call_id`'s signaling plane.
    ///
    /// `target` addresses a single peer directly (spec §4.1 `respond`-style signals).
    /// `None` broadcasts to every peer `known_peers` reports other than `from` (spec
    /// §4.1 `offer`-style signals); `known_peers` being `None` means the caller could
    /// not resolve the call (it does not exist), which surfaces as [`CoreError::CallNotFound`]
    /// here rather than being checked twice.
    pub fn deposit(
        &self,
        call_id: CallId,
        from: PeerId,
        target: Option<PeerId>,
        message: SignalMessage,
        known_peers: Option<&KnownPeers>,
    ) -> Result<(), CoreError> {
        match target {
            Some(target) => {
                self.append(call_id, target, message);
                Ok(())
            }
            None => {
                let known = known_peers.context(CallNotFoundSnafu)?;
                for member in &known.members {
                    let peer = PeerId::Member(*member);
                    if peer != from {
                        self.append(call_id, peer, message.clone());
                    }
                }
                if known.recorder_active && from != PeerId::Recorder {
                    self.append(call_id, PeerId::Recorder, message);
                }
                Ok(())
            }
        }
    }

    /// Drain and return every message waiting in `peer`'s mailbox for `call_id`, FIFO.
    /// An empty result means either the mailbox is empty or the call has no mailboxes
    /// at all — both are legitimate, non-error states (spec §4.1 `drain`).
    pub fn drain(&self, call_id: CallId, peer: PeerId) -> Vec<SignalMessage> {
        let Some(entry) = self.calls.lock().get(&call_id).cloned() else {
            return Vec::new();
        };
        let mut mailboxes = entry.lock();
        mailboxes
            .peers
            .get_mut(&peer)
            .map(|mailbox| mailbox.messages.drain(..).map(|(msg, _)| msg).collect())
            .unwrap_or_default()
    }

    /// The peers with at least one pending or delivered mailbox for `call_id` (used to
    /// populate `GetSignalResponseBody::peers`).
    pub fn known_peers(&self, call_id: CallId) -> Vec<PeerId> {
        let Some(entry) = self.calls.lock().get(&call_id).cloned() else {
            return Vec::new();
        };
        entry.lock().peers.keys().copied().collect()
    }

    /// Drop messages older than the configured TTL and remove any call that ends up
    /// with no mailboxes left (spec §4.1 "sweep... every 1 minute").
    pub fn sweep(&self) {
        let now = Instant::now();
        let calls = self.calls.lock().clone();
        let mut emptied = Vec::new();
        for (call_id, entry) in calls {
            let mut mailboxes = entry.lock();
            mailboxes.peers.retain(|_, mailbox| {
                mailbox
                    .messages
                    .retain(|(_, deposited_at)| now.duration_since(*deposited_at) < self.ttl);
                !mailbox.messages.is_empty()
            });
            if mailboxes.peers.is_empty() {
                emptied.push(call_id);
            }
        }
        if !emptied.is_empty() {
            let mut calls = self.calls.lock();
            for call_id in emptied {
                if calls
                    .get(&call_id)
                    .is_some_and(|entry| entry.lock().peers.is_empty())
                {
                    let _ = calls.remove(&call_id);
                }
            }
        }
    }

    /// Drop every mailbox for a call outright, e.g. once it has ended (spec §4.3 `end`).
    pub fn forget_call(&self, call_id: CallId) {
        let _ = self.calls.lock().remove(&call_id);
    }
}

impl Default for SignalRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use nestcall_types_signaling::SignalKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn msg(from: PeerId) -> SignalMessage {
        SignalMessage {
            kind: SignalKind::Offer,
            data: serde_json::json!({}),
            from_peer_id: from,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn broadcast_excludes_the_sender_but_includes_the_recorder() {
        let relay = SignalRelay::new();
        let call_id = CallId::generate();
        let a = MemberId::generate();
        let b = MemberId::generate();
        let known = KnownPeers {
            members: vec![a, b],
            recorder_active: true,
        };
        relay
            .deposit(call_id, PeerId::Member(a), None, msg(PeerId::Member(a)), Some(&known))
            .unwrap();

        assert_eq!(relay.drain(call_id, PeerId::Member(a)).len(), 0);
        assert_eq!(relay.drain(call_id, PeerId::Member(b)).len(), 1);
        assert_eq!(relay.drain(call_id, PeerId::Recorder).len(), 1);
    }

    #[test]
    fn targeted_deposit_reaches_only_the_target() {
        let relay = SignalRelay::new();
        let call_id = CallId::generate();
        let a = MemberId::generate();
        let b = MemberId::generate();
        relay
            .deposit(
                call_id,
                PeerId::Member(a),
                Some(PeerId::Member(b)),
                msg(PeerId::Member(a)),
                None,
            )
            .unwrap();

        assert_eq!(relay.drain(call_id, PeerId::Member(b)).len(), 1);
        assert_eq!(relay.drain(call_id, PeerId::Member(a)).len(), 0);
    }

    #[test]
    fn broadcast_without_resolvable_peers_fails_with_call_not_found() {
        let relay = SignalRelay::new();
        let call_id = CallId::generate();
        let a = MemberId::generate();
        let err = relay
            .deposit(call_id, PeerId::Member(a), None, msg(PeerId::Member(a)), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::CallNotFound));
    }

    #[test]
    fn drain_is_fifo_and_empties_the_mailbox() {
        let relay = SignalRelay::new();
        let call_id = CallId::generate();
        let a = MemberId::generate();
        let b = MemberId::generate();
        relay.append(call_id, PeerId::Member(b), msg(PeerId::Member(a)));
        relay.append(call_id, PeerId::Member(b), msg(PeerId::Member(a)));

        let drained = relay.drain(call_id, PeerId::Member(b));
        assert_eq!(drained.len(), 2);
        assert!(relay.drain(call_id, PeerId::Member(b)).is_empty());
    }

    #[test]
    fn sweep_evicts_messages_older_than_the_ttl() {
        let relay = SignalRelay::with_ttl(Duration::from_millis(10));
        let call_id = CallId::generate();
        let b = MemberId::generate();
        relay.append(call_id, PeerId::Member(b), msg(PeerId::Member(b)));
        std::thread::sleep(Duration::from_millis(30));
        relay.sweep();
        assert!(relay.drain(call_id, PeerId::Member(b)).is_empty());
        assert!(relay.known_peers(call_id).is_empty());
    }

    #[test]
    fn forget_call_drops_all_mailboxes() {
        let relay = SignalRelay::new();
        let call_id = CallId::generate();
        let b = MemberId::generate();
        relay.append(call_id, PeerId::Member(b), msg(PeerId::Member(b)));
        relay.forget_call(call_id);
        assert!(relay.drain(call_id, PeerId::Member(b)).is_empty());
    }
}
