use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nestcall_signaling_core::{
    AuthContext, CallStore, RecorderBackend, RecorderSessionRequest, SignalRelay,
};
use nestcall_types_api::queue::AdmitOutcome;
use nestcall_types_common::{CallId, CallKind};
use nestcall_types_signaling::{PeerId, Recording, RecordingStatus, SignalMessage};
use parking_lot::Mutex;
use rand::Rng;

use crate::error::CallCoreError;
use crate::participant_registry::ParticipantRegistry;
use crate::recording_queue::RecordingQueue;

/// How long `stop` waits for a finished artifact to arrive via `RecordingIngest`
/// before giving up and marking the recording `failed` (spec §4.7 "grace window").
/// Not spec-mandated as an exact figure; chosen generously relative to the backend's
/// own 30 s stop deadline (spec §5).
const INGEST_GRACE_WINDOW: Duration = Duration::from_secs(120);

/// `RecorderBackend.start` retry policy (spec §7 "retried once with jittered
/// backoff inside `RecorderCoordinator.start` only").
const START_RETRY_BACKOFF_BASE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
struct RecorderSession {
    started_at: Instant,
}

/// The outcome of `RecorderCoordinator::start`.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// Capacity was unavailable; the caller now holds (or already held) a queue
    /// entry and no backend session was started.
    Queued(AdmitOutcome),
    /// The backend accepted the session; `Call.recording.status` is now `recording`.
    Started(Recording),
}

/// Bridges a call to the external `RecorderBackend` (spec §4.7).
pub struct RecorderCoordinator {
    backend: Arc<dyn RecorderBackend>,
    call_store: Arc<dyn CallStore>,
    relay: Arc<SignalRelay>,
    queue: Arc<RecordingQueue>,
    registry: ParticipantRegistry,
    sessions: Mutex<HashMap<(CallId, CallKind), RecorderSession>>,
    pending_ingests: Mutex<HashMap<(CallId, CallKind), Instant>>,
}

impl RecorderCoordinator {
    pub fn new(
        backend: Arc<dyn RecorderBackend>,
        call_store: Arc<dyn CallStore>,
        relay: Arc<SignalRelay>,
        queue: Arc<RecordingQueue>,
    ) -> Self {
        Self {
            backend,
            call_store,
            relay,
            queue,
            registry: ParticipantRegistry,
            sessions: Mutex::new(HashMap::new()),
            pending_ingests: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a recorder session hint is registered for `call_id`, regardless of
    /// `kind` — used by `CallCoordinator` to decide whether `"recorder"` belongs in
    /// a signal broadcast's known-peer set (spec §4.1 deposit).
    pub fn recorder_active_hint(&self, call_id: CallId) -> bool {
        self.sessions.lock().keys().any(|(id, _)| *id == call_id)
    }

    async fn authorize(&self, auth: &AuthContext, call_id: CallId) -> Result<nestcall_types_signaling::Call, CallCoreError> {
        let call = self
            .call_store
            .get_call(call_id)
            .await?
            .ok_or(CallCoreError::CallNotFound)?;
        let participants = self.call_store.get_participants(call_id).await?;
        if !self.registry.is_involved(&call, &participants, auth.member_id) {
            return Err(CallCoreError::PermissionDenied);
        }
        Ok(call)
    }

    /// `start(auth, callId, kind)` (spec §4.7). Unlike `stop`, this requires the
    /// caller to actually be in the call (`accepted`/`joined`), not merely invited or
    /// a past participant who has already left (spec §9 Open Question (a)).
    pub async fn start(&self, auth: &AuthContext, call_id: CallId, kind: CallKind) -> Result<StartOutcome, CallCoreError> {
        let call = self
            .call_store
            .get_call(call_id)
            .await?
            .ok_or(CallCoreError::CallNotFound)?;
        let participants = self.call_store.get_participants(call_id).await?;
        if !self.registry.is_active_participant(&call, &participants, auth.member_id) {
            return Err(CallCoreError::PermissionDenied);
        }
        if call.status != nestcall_types_signaling::CallStatus::Active {
            return Err(CallCoreError::CallTerminal);
        }
        if call.recording.status == RecordingStatus::Recording {
            return Err(CallCoreError::RecordingAlreadyRunning);
        }

        let admission = self
            .queue
            .admit(
                auth.user_id,
                call.group_id,
                kind,
                vec![],
                auth.display_name.clone(),
                auth.email.clone(),
            )
            .await;
        if admission.needs_queue {
            return Ok(StartOutcome::Queued(admission));
        }

        self.start_with_retry(call_id, kind).await?;

        let mut call = call;
        call.recording.status = RecordingStatus::Recording;
        self.call_store.update_call(call.clone()).await?;
        self.queue.recording_started(auth.user_id, kind);
        self.sessions.lock().insert(
            (call_id, kind),
            RecorderSession {
                started_at: Instant::now(),
            },
        );

        Ok(StartOutcome::Started(call.recording))
    }

    async fn start_with_retry(&self, call_id: CallId, kind: CallKind) -> Result<(), CallCoreError> {
        let request = RecorderSessionRequest { call_id, kind };
        match self.backend.start(request.clone()).await {
            Ok(()) => Ok(()),
            Err(_first_err) => {
                let jitter_ms = rand::thread_rng().gen_range(0..START_RETRY_BACKOFF_BASE.as_millis() as u64);
                tokio::time::sleep(START_RETRY_BACKOFF_BASE + Duration::from_millis(jitter_ms)).await;
                self.backend.start(request).await.map_err(Into::into)
            }
        }
    }

    /// `stop(auth, callId, kind)` (spec §4.7). A no-op success if no session is
    /// recorded as running.
    pub async fn stop(&self, auth: &AuthContext, call_id: CallId, kind: CallKind) -> Result<Recording, CallCoreError> {
        let mut call = self.authorize(auth, call_id).await?;

        if self.sessions.lock().remove(&(call_id, kind)).is_none() {
            return Ok(call.recording);
        }

        self.backend
            .stop(RecorderSessionRequest { call_id, kind })
            .await?;

        call.recording.status = RecordingStatus::Processing;
        self.call_store.update_call(call.clone()).await?;
        self.pending_ingests.lock().insert((call_id, kind), Instant::now());

        Ok(call.recording)
    }

    /// `isRecording(callId, kind)` (spec §4.7): prefers the backend's live answer,
    /// falls back to the local hint if the backend cannot be reached.
    pub async fn is_recording(&self, call_id: CallId, kind: CallKind) -> bool {
        match self.backend.active_sessions().await {
            Ok(_) => self.sessions.lock().contains_key(&(call_id, kind)),
            Err(err) => {
                tracing::warn!(?err, %call_id, %kind, "recorder backend unreachable, falling back to local hint");
                self.sessions.lock().contains_key(&(call_id, kind))
            }
        }
    }

    /// Signals queued for the recorder peer, drained for relay to the backend
    /// (spec §4.7 "signaling bridge").
    pub fn drain_recorder_signals(&self, call_id: CallId) -> Vec<SignalMessage> {
        self.relay.drain(call_id, PeerId::Recorder)
    }

    /// A signal deposited by the recorder peer, relayed like any other participant
    /// (spec §4.7 "signaling bridge").
    pub async fn deposit_recorder_signal(
        &self,
        call_id: CallId,
        target: Option<PeerId>,
        message: SignalMessage,
    ) -> Result<(), CallCoreError> {
        let known_peers = if target.is_none() {
            let participants = self.call_store.get_participants(call_id).await?;
            Some(nestcall_signaling_core::KnownPeers {
                members: participants.into_iter().map(|p| p.member_id).collect(),
                recorder_active: false,
            })
        } else {
            None
        };
        self.relay
            .deposit(call_id, PeerId::Recorder, target, message, known_peers.as_ref())
            .map_err(Into::into)
    }

    /// Marks any pending ingest older than [`INGEST_GRACE_WINDOW`] as `failed` and
    /// releases its queue slot (spec §4.7 "no artifact arrives within a grace
    /// window"). Intended to run on the same interval as `RecordingQueue::sweep`.
    pub async fn sweep_stale_processing(&self) {
        let expired: Vec<(CallId, CallKind)> = {
            let mut pending = self.pending_ingests.lock();
            let now = Instant::now();
            let expired = pending
                .iter()
                .filter(|(_, started)| now.duration_since(**started) >= INGEST_GRACE_WINDOW)
                .map(|(key, _)| *key)
                .collect::<Vec<_>>();
            for key in &expired {
                pending.remove(key);
            }
            expired
        };

        for (call_id, _kind) in expired {
            if let Ok(Some(mut call)) = self.call_store.get_call(call_id).await {
                call.recording.status = RecordingStatus::Failed;
                if self.call_store.update_call(call).await.is_ok() {
                    self.queue.recording_ended();
                }
            }
        }
    }

    /// Called by `RecordingIngest` once an artifact has arrived, so the grace-window
    /// sweep does not also fail an already-completed recording.
    pub fn cancel_pending_ingest(&self, call_id: CallId, kind: CallKind) {
        self.pending_ingests.lock().remove(&(call_id, kind));
    }

    /// Stops a running recording as a side effect of the call itself ending (spec
    /// §4.7 "ending or leaving a call when a recording is active implicitly stops
    /// it"). Unlike [`Self::stop`] this is triggered by `CallCoordinator`, not a
    /// direct user request, so it skips the participant/initiator check.
    pub async fn stop_for_ended_call(&self, call_id: CallId, kind: CallKind) {
        if self.sessions.lock().remove(&(call_id, kind)).is_none() {
            return;
        }
        if let Err(err) = self.backend.stop(RecorderSessionRequest { call_id, kind }).await {
            tracing::warn!(?err, %call_id, "failed to stop recorder for an ended call");
        }
        if let Ok(Some(mut call)) = self.call_store.get_call(call_id).await {
            call.recording.status = RecordingStatus::Processing;
            let _ = self.call_store.update_call(call).await;
            self.pending_ingests.lock().insert((call_id, kind), Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use nestcall_signaling_core::SystemClock;
    use nestcall_test_util::{Fakes, InMemoryCallStore};
    use nestcall_types_common::{GroupId, MemberId, Role, Timestamp};
    use nestcall_types_signaling::{Call, CallStatus, Participant, ParticipantStatus};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::recording_queue::{RecordingQueue, RecordingQueueConfig};

    fn auth_for(call: &Call, role: Role) -> AuthContext {
        AuthContext {
            user_id: call.initiator_id,
            member_id: call.initiator_id,
            group_id: call.group_id,
            role,
            display_name: "Initiator".to_owned(),
            email: "initiator@example.test".to_owned(),
        }
    }

    async fn active_call(store: &InMemoryCallStore) -> Call {
        let initiator = MemberId::generate();
        let invitee = MemberId::generate();
        let group_id = GroupId::generate();
        store.register_member(initiator, Role::new("member"));
        store.register_member(invitee, Role::new("member"));

        let call = Call {
            id: CallId::generate(),
            group_id,
            kind: CallKind::Voice,
            initiator_id: initiator,
            status: CallStatus::Active,
            started_at: Timestamp::from_timestamp(0, 0).unwrap(),
            connected_at: Some(Timestamp::from_timestamp(0, 0).unwrap()),
            ended_at: None,
            duration_ms: None,
            recording: nestcall_types_signaling::Recording::none(),
        };
        let participant = Participant {
            call_id: call.id,
            member_id: invitee,
            status: ParticipantStatus::Accepted,
            invited_at: call.started_at,
            responded_at: Some(call.started_at),
            joined_at: None,
            left_at: None,
        };
        store.create_call(call.clone(), vec![participant]).await.unwrap();
        call
    }

    fn coordinator(fakes: &Fakes, max_concurrent: usize) -> RecorderCoordinator {
        let queue = Arc::new(RecordingQueue::new(
            RecordingQueueConfig::new(max_concurrent, MemberId::nil()),
            fakes.notifier.clone(),
            Arc::new(SystemClock),
        ));
        RecorderCoordinator::new(
            fakes.recorder_backend.clone(),
            fakes.call_store.clone(),
            Arc::new(SignalRelay::new()),
            queue,
        )
    }

    #[tokio::test]
    async fn start_succeeds_when_capacity_is_available() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));

        let outcome = coord.start(&auth, call.id, CallKind::Voice).await.unwrap();
        match outcome {
            StartOutcome::Started(recording) => assert_eq!(recording.status, RecordingStatus::Recording),
            StartOutcome::Queued(_) => panic!("expected the recording to start immediately"),
        }
        assert!(coord.recorder_active_hint(call.id));
        let stored = fakes.call_store.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.recording.status, RecordingStatus::Recording);
    }

    #[tokio::test]
    async fn start_queues_when_at_capacity() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 0);
        let auth = auth_for(&call, Role::new("member"));

        let outcome = coord.start(&auth, call.id, CallKind::Voice).await.unwrap();
        match outcome {
            StartOutcome::Queued(admit) => assert!(admit.needs_queue),
            StartOutcome::Started(_) => panic!("expected admission to queue the caller"),
        }
        assert!(!coord.recorder_active_hint(call.id));
        let stored = fakes.call_store.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.recording.status, RecordingStatus::None);
    }

    #[tokio::test]
    async fn start_rejects_a_caller_who_is_only_invited() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let outsider = MemberId::generate();
        fakes.call_store.register_member(outsider, Role::new("member"));
        let auth = AuthContext {
            user_id: outsider,
            member_id: outsider,
            group_id: call.group_id,
            role: Role::new("member"),
            display_name: "Outsider".to_owned(),
            email: "outsider@example.test".to_owned(),
        };

        let err = coord.start(&auth, call.id, CallKind::Voice).await.unwrap_err();
        assert!(matches!(err, CallCoreError::PermissionDenied));
    }

    #[tokio::test]
    async fn start_rejects_when_already_recording() {
        let fakes = Fakes::default();
        let mut call = active_call(&fakes.call_store).await;
        call.recording.status = RecordingStatus::Recording;
        fakes.call_store.update_call(call.clone()).await.unwrap();
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));

        let err = coord.start(&auth, call.id, CallKind::Voice).await.unwrap_err();
        assert!(matches!(err, CallCoreError::RecordingAlreadyRunning));
    }

    #[tokio::test]
    async fn stop_on_a_session_that_never_started_is_a_no_op() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));

        let recording = coord.stop(&auth, call.id, CallKind::Voice).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::None);
    }

    #[tokio::test]
    async fn stop_marks_the_recording_processing_pending_ingest() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));

        coord.start(&auth, call.id, CallKind::Voice).await.unwrap();
        let recording = coord.stop(&auth, call.id, CallKind::Voice).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Processing);
    }

    #[tokio::test]
    async fn sweep_fails_a_stale_processing_recording_and_releases_the_slot() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 1);
        let auth = auth_for(&call, Role::new("member"));

        coord.start(&auth, call.id, CallKind::Voice).await.unwrap();
        coord.stop(&auth, call.id, CallKind::Voice).await.unwrap();
        coord
            .pending_ingests
            .lock()
            .insert((call.id, CallKind::Voice), Instant::now() - INGEST_GRACE_WINDOW - Duration::from_secs(1));

        coord.sweep_stale_processing().await;

        let stored = fakes.call_store.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.recording.status, RecordingStatus::Failed);

        // the released slot lets the next caller start immediately instead of queueing
        let second = active_call(&fakes.call_store).await;
        let second_auth = auth_for(&second, Role::new("member"));
        let outcome = coord.start(&second_auth, second.id, CallKind::Voice).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Started(_)));
    }

    #[tokio::test]
    async fn cancel_pending_ingest_prevents_a_later_sweep_from_failing_it() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));

        coord.start(&auth, call.id, CallKind::Voice).await.unwrap();
        coord.stop(&auth, call.id, CallKind::Voice).await.unwrap();
        coord.cancel_pending_ingest(call.id, CallKind::Voice);
        coord
            .pending_ingests
            .lock()
            .insert((call.id, CallKind::Voice), Instant::now() - INGEST_GRACE_WINDOW - Duration::from_secs(1));
        coord.cancel_pending_ingest(call.id, CallKind::Voice);

        coord.sweep_stale_processing().await;

        let stored = fakes.call_store.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.recording.status, RecordingStatus::Processing);
    }

    #[tokio::test]
    async fn recorder_signal_deposit_broadcasts_to_call_participants() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));
        coord.start(&auth, call.id, CallKind::Voice).await.unwrap();

        let message = SignalMessage {
            kind: nestcall_types_signaling::SignalKind::Offer,
            data: serde_json::json!({"sdp": "v=0"}),
            from_peer_id: PeerId::Recorder,
            timestamp: Timestamp::from_timestamp(0, 0).unwrap(),
        };
        coord.deposit_recorder_signal(call.id, None, message).await.unwrap();

        let participants = fakes.call_store.get_participants(call.id).await.unwrap();
        let invitee = participants[0].member_id;
        let drained = coord.relay.drain(call.id, PeerId::Member(invitee));
        assert_eq!(drained.len(), 1);
        assert!(coord.drain_recorder_signals(call.id).is_empty());
    }

    #[tokio::test]
    async fn stop_for_ended_call_is_silent_when_no_session_is_running() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);

        coord.stop_for_ended_call(call.id, CallKind::Voice).await;

        let stored = fakes.call_store.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.recording.status, RecordingStatus::None);
    }

    #[tokio::test]
    async fn stop_for_ended_call_transitions_a_running_recording_to_processing() {
        let fakes = Fakes::default();
        let call = active_call(&fakes.call_store).await;
        let coord = coordinator(&fakes, 2);
        let auth = auth_for(&call, Role::new("member"));
        coord.start(&auth, call.id, CallKind::Voice).await.unwrap();

        coord.stop_for_ended_call(call.id, CallKind::Voice).await;

        let stored = fakes.call_store.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.recording.status, RecordingStatus::Processing);
        assert!(!coord.recorder_active_hint(call.id));
    }
}
