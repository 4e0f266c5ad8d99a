use std::collections::HashMap;
use std::sync::Arc;

use nestcall_signaling_core::{
    AuthContext, AuthorizationPolicy, CallStore, Clock, GroupSettings, IceConfigProvider, KnownPeers, Notifier,
    SignalRelay,
};
use nestcall_types_api::ice::IceServer;
use nestcall_types_common::{CallId, CallKind, GroupId, MemberId};
use nestcall_types_signaling::{Call, CallStatus, PeerId, SignalKind, SignalMessage};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::CallCoreError;
use crate::participant_registry::{Involvement, ParticipantRegistry};
use crate::recorder_coordinator::RecorderCoordinator;
use crate::state_machine::CallStateMachine;

/// The two buckets `listActive` splits a member's calls into (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct ActiveCalls {
    pub active: Vec<Call>,
    pub incoming: Vec<Call>,
}

/// The drained view of a call's signaling mailbox (spec §6 `GET .../signal`).
#[derive(Debug, Clone)]
pub struct DrainedSignals {
    pub signals: Vec<SignalMessage>,
    pub peers: Vec<PeerId>,
    pub my_peer_id: PeerId,
}

/// Serializes operations on the same `callId` so the state machine always observes
/// a consistent snapshot (spec §5 "per-call lock"), while letting distinct calls
/// proceed fully in parallel.
#[derive(Default)]
struct CallLocks {
    locks: SyncMutex<HashMap<CallId, Arc<AsyncMutex<()>>>>,
}

impl CallLocks {
    fn entry(&self, call_id: CallId) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.locks.lock().entry(call_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }
}

/// The public operation surface of the call orchestration core (spec §4.5
/// "CallCoordinator"). Composes the state machine, the participant registry, the
/// signaling relay, and the injected capabilities; every method here is the unit of
/// atomicity the rest of the system calls into.
pub struct CallCoordinator {
    call_store: Arc<dyn CallStore>,
    policy: Arc<dyn AuthorizationPolicy>,
    notifier: Arc<dyn Notifier>,
    relay: Arc<SignalRelay>,
    clock: Arc<dyn Clock>,
    ice: Arc<dyn IceConfigProvider>,
    recorder: Arc<RecorderCoordinator>,
    registry: ParticipantRegistry,
    state_machine: CallStateMachine,
    locks: CallLocks,
}

impl CallCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        call_store: Arc<dyn CallStore>,
        policy: Arc<dyn AuthorizationPolicy>,
        notifier: Arc<dyn Notifier>,
        relay: Arc<SignalRelay>,
        clock: Arc<dyn Clock>,
        ice: Arc<dyn IceConfigProvider>,
        recorder: Arc<RecorderCoordinator>,
    ) -> Self {
        Self {
            call_store,
            policy,
            notifier,
            relay,
            clock,
            ice,
            recorder,
            registry: ParticipantRegistry,
            state_machine: CallStateMachine,
            locks: CallLocks::default(),
        }
    }

    async fn group_settings(&self, group_id: GroupId) -> Result<GroupSettings, CallCoreError> {
        Ok(GroupSettings {
            read_only: self.call_store.is_group_read_only(group_id).await?,
        })
    }

    async fn require_member(&self, group_id: GroupId, member_id: MemberId) -> Result<(), CallCoreError> {
        self.call_store
            .role_of(group_id, member_id)
            .await?
            .ok_or(CallCoreError::NotMember)?;
        Ok(())
    }

    /// `listCalls(auth, groupId, limit, offset, scope)` (spec §4.5).
    pub async fn list_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Call>, i64), CallCoreError> {
        self.require_member(group_id, auth.member_id).await?;
        let settings = self.group_settings(group_id).await?;
        if !self.policy.can_see(&auth.role, settings) {
            return Err(CallCoreError::PermissionDenied);
        }

        let member_scope = if auth.role.is_admin() { None } else { Some(auth.member_id) };
        self.call_store
            .list_calls(group_id, member_scope, limit, offset)
            .await
            .map_err(Into::into)
    }

    /// `listActive(auth, groupId)` (spec §4.5).
    pub async fn list_active(&self, auth: &AuthContext, group_id: GroupId) -> Result<ActiveCalls, CallCoreError> {
        self.require_member(group_id, auth.member_id).await?;
        let settings = self.group_settings(group_id).await?;
        if !self.policy.can_use(&auth.role, settings) {
            return Err(CallCoreError::PermissionDenied);
        }

        let calls = self.call_store.list_active_for_group(group_id).await?;
        let mut result = ActiveCalls::default();
        for call in calls {
            let participants = self.call_store.get_participants(call.id).await?;
            match self.registry.involvement(&call, &participants, auth.member_id) {
                Involvement::Active => result.active.push(call),
                Involvement::Incoming => result.incoming.push(call),
                Involvement::None => {}
            }
        }
        Ok(result)
    }

    /// `initiate(auth, groupId, kind, invitees)` (spec §4.3, §4.5).
    pub async fn initiate(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        invitees: Vec<MemberId>,
    ) -> Result<Call, CallCoreError> {
        self.require_member(group_id, auth.member_id).await?;
        let settings = self.group_settings(group_id).await?;
        if !self.policy.can_use(&auth.role, settings) {
            return Err(CallCoreError::PermissionDenied);
        }
        if settings.read_only {
            return Err(CallCoreError::ReadOnlyGroup);
        }
        if !invitees.is_empty() && !self.call_store.are_registered_members(group_id, &invitees).await? {
            return Err(CallCoreError::InvalidInvitees {
                reason: "one or more invitees are not registered members of this group".to_owned(),
            });
        }
        for invitee in &invitees {
            if self
                .call_store
                .role_of(group_id, *invitee)
                .await?
                .is_some_and(|role| role.is_supervisor())
            {
                return Err(CallCoreError::SupervisorNotAllowed);
            }
        }

        let call_id = CallId::generate();
        let outcome = self.state_machine.initiate(
            call_id,
            group_id,
            kind,
            auth.member_id,
            &invitees,
            self.clock.now(),
        )?;

        self.call_store
            .create_call(outcome.call.clone(), outcome.changed_participants.clone())
            .await?;

        for participant in &outcome.changed_participants {
            if let Err(err) = self.notifier.notify_incoming_call(&outcome.call, participant.member_id).await {
                tracing::warn!(?err, %call_id, "failed to notify invitee of incoming call");
            }
        }

        Ok(outcome.call)
    }

    async fn load(&self, call_id: CallId) -> Result<(Call, Vec<nestcall_types_signaling::Participant>), CallCoreError> {
        let call = self.call_store.get_call(call_id).await?.ok_or(CallCoreError::CallNotFound)?;
        let participants = self.call_store.get_participants(call_id).await?;
        Ok((call, participants))
    }

    async fn persist_transition(&self, outcome: crate::state_machine::TransitionOutcome) -> Result<Call, CallCoreError> {
        self.call_store.update_call(outcome.call.clone()).await?;
        for participant in &outcome.changed_participants {
            self.call_store.upsert_participant(*participant).await?;
        }
        if outcome.call.status.is_terminal() {
            self.recorder.stop_for_ended_call(outcome.call.id, outcome.call.kind).await;
            self.relay.forget_call(outcome.call.id);
        }
        Ok(outcome.call)
    }

    /// `respond(auth, callId, accept)` (spec §4.3, §4.5).
    pub async fn respond(&self, auth: &AuthContext, call_id: CallId, accept: bool) -> Result<Call, CallCoreError> {
        let guard = self.locks.entry(call_id);
        let _guard = guard.lock().await;

        let (call, participants) = self.load(call_id).await?;
        let outcome = self.state_machine.respond(&call, &participants, auth.member_id, accept, self.clock.now())?;
        self.persist_transition(outcome).await
    }

    /// `leave(auth, callId)` (spec §4.3, §4.5).
    pub async fn leave(&self, auth: &AuthContext, call_id: CallId) -> Result<Call, CallCoreError> {
        let guard = self.locks.entry(call_id);
        let _guard = guard.lock().await;

        let (call, participants) = self.load(call_id).await?;
        let caller_is_initiator = call.initiator_id == auth.member_id;
        if !caller_is_initiator && self.registry.my_participation(&participants, auth.member_id).is_none() {
            return Err(CallCoreError::ParticipantNotFound);
        }
        let outcome = self
            .state_machine
            .leave(&call, &participants, auth.member_id, caller_is_initiator, self.clock.now())?;
        self.persist_transition(outcome).await
    }

    /// `end(auth, callId)` (spec §4.3, §4.5).
    pub async fn end(&self, auth: &AuthContext, call_id: CallId) -> Result<Call, CallCoreError> {
        let guard = self.locks.entry(call_id);
        let _guard = guard.lock().await;

        let (call, participants) = self.load(call_id).await?;
        if !self.registry.is_involved(&call, &participants, auth.member_id) {
            return Err(CallCoreError::PermissionDenied);
        }
        let outcome = self.state_machine.end(&call, &participants, self.clock.now())?;
        self.persist_transition(outcome).await
    }

    /// `hideRecording(auth, callId)` (spec §4.5): admin-only.
    pub async fn hide_recording(&self, auth: &AuthContext, call_id: CallId) -> Result<Call, CallCoreError> {
        if !auth.role.is_admin() {
            return Err(CallCoreError::PermissionDenied);
        }
        let guard = self.locks.entry(call_id);
        let _guard = guard.lock().await;

        let (mut call, _) = self.load(call_id).await?;
        if call.recording.status == nestcall_types_signaling::RecordingStatus::None {
            return Err(CallCoreError::NoRecording);
        }
        if call.recording.hidden {
            return Err(CallCoreError::AlreadyHidden);
        }
        call.recording.hidden = true;
        call.recording.hidden_by_id = Some(auth.member_id);
        call.recording.hidden_at = Some(self.clock.now());
        self.call_store.update_call(call.clone()).await?;
        Ok(call)
    }

    /// `deposit(callId, fromPeerId, targetPeerId?, msg)` (spec §4.1, §4.5), gated on
    /// the caller being a participant or the initiator.
    pub async fn deposit_signal(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: SignalKind,
        data: serde_json::Value,
        target: Option<PeerId>,
    ) -> Result<(), CallCoreError> {
        let (call, participants) = self.load(call_id).await?;
        if !self.registry.is_involved(&call, &participants, auth.member_id) {
            return Err(CallCoreError::PermissionDenied);
        }

        let from = PeerId::Member(auth.member_id);
        let known_peers = if target.is_none() {
            Some(KnownPeers {
                members: participants.iter().map(|p| p.member_id).collect(),
                recorder_active: self.recorder.recorder_active_hint(call_id),
            })
        } else {
            None
        };
        let message = SignalMessage {
            kind,
            data,
            from_peer_id: from,
            timestamp: self.clock.now(),
        };
        self.relay.deposit(call_id, from, target, message, known_peers.as_ref())?;
        Ok(())
    }

    /// `drain(callId, peerId)` (spec §4.1, §4.5).
    pub async fn drain_signals(&self, auth: &AuthContext, call_id: CallId) -> Result<DrainedSignals, CallCoreError> {
        let (call, participants) = self.load(call_id).await?;
        if !self.registry.is_involved(&call, &participants, auth.member_id) {
            return Err(CallCoreError::PermissionDenied);
        }
        let my_peer_id = PeerId::Member(auth.member_id);
        Ok(DrainedSignals {
            signals: self.relay.drain(call_id, my_peer_id),
            peers: self.relay.known_peers(call_id),
            my_peer_id,
        })
    }

    /// `GET /groups/{gid}/calls/{cid}/ice-servers` (spec §4.2, §6).
    pub fn ice_servers(&self) -> Vec<IceServer> {
        self.ice.ice_servers()
    }

    pub fn recorder(&self) -> &Arc<RecorderCoordinator> {
        &self.recorder
    }

    /// The participants of `call_id`, for assembling a `CallResource` view after a
    /// listing or transition has already authorized the caller against the call.
    pub async fn participants_of(
        &self,
        call_id: CallId,
    ) -> Result<Vec<nestcall_types_signaling::Participant>, CallCoreError> {
        self.call_store.get_participants(call_id).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use nestcall_signaling_core::{
        CoreError, QueuePressureNotice, RecorderBackend, RecorderSessionRequest, StaticIceConfigProvider,
        SystemClock,
    };
    use nestcall_types_common::Role;
    use nestcall_types_signaling::Participant;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::recording_queue::{RecordingQueue, RecordingQueueConfig};

    #[derive(Default)]
    struct InMemoryCallStore {
        calls: Mutex<HashMap<CallId, Call>>,
        participants: Mutex<HashMap<CallId, Vec<Participant>>>,
        admins: Mutex<std::collections::HashSet<MemberId>>,
        members: Mutex<std::collections::HashSet<MemberId>>,
    }

    #[async_trait]
    impl CallStore for InMemoryCallStore {
        async fn create_call(&self, call: Call, participants: Vec<Participant>) -> Result<(), CoreError> {
            self.calls.lock().insert(call.id, call.clone());
            self.participants.lock().insert(call.id, participants);
            Ok(())
        }

        async fn get_call(&self, call_id: CallId) -> Result<Option<Call>, CoreError> {
            Ok(self.calls.lock().get(&call_id).cloned())
        }

        async fn update_call(&self, call: Call) -> Result<(), CoreError> {
            self.calls.lock().insert(call.id, call);
            Ok(())
        }

        async fn get_participants(&self, call_id: CallId) -> Result<Vec<Participant>, CoreError> {
            Ok(self.participants.lock().get(&call_id).cloned().unwrap_or_default())
        }

        async fn get_participant(&self, call_id: CallId, member_id: MemberId) -> Result<Option<Participant>, CoreError> {
            Ok(self
                .participants
                .lock()
                .get(&call_id)
                .and_then(|ps| ps.iter().find(|p| p.member_id == member_id).copied()))
        }

        async fn upsert_participant(&self, participant: Participant) -> Result<(), CoreError> {
            let mut participants = self.participants.lock();
            let entry = participants.entry(participant.call_id).or_default();
            if let Some(existing) = entry.iter_mut().find(|p| p.member_id == participant.member_id) {
                *existing = participant;
            } else {
                entry.push(participant);
            }
            Ok(())
        }

        async fn list_calls(
            &self,
            group_id: GroupId,
            _member_id: Option<MemberId>,
            _limit: i64,
            _offset: i64,
        ) -> Result<(Vec<Call>, i64), CoreError> {
            let calls: Vec<Call> = self.calls.lock().values().filter(|c| c.group_id == group_id).cloned().collect();
            let total = calls.len() as i64;
            Ok((calls, total))
        }

        async fn list_active_for_group(&self, group_id: GroupId) -> Result<Vec<Call>, CoreError> {
            Ok(self
                .calls
                .lock()
                .values()
                .filter(|c| c.group_id == group_id && matches!(c.status, CallStatus::Ringing | CallStatus::Active))
                .cloned()
                .collect())
        }

        async fn is_group_read_only(&self, _group_id: GroupId) -> Result<bool, CoreError> {
            Ok(false)
        }

        async fn are_registered_members(&self, _group_id: GroupId, member_ids: &[MemberId]) -> Result<bool, CoreError> {
            let members = self.members.lock();
            Ok(member_ids.iter().all(|id| members.contains(id)))
        }

        async fn role_of(&self, _group_id: GroupId, member_id: MemberId) -> Result<Option<Role>, CoreError> {
            if !self.members.lock().contains(&member_id) {
                return Ok(None);
            }
            Ok(Some(if self.admins.lock().contains(&member_id) {
                Role::new(Role::ADMIN)
            } else {
                Role::new("member")
            }))
        }
    }

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn notify_incoming_call(&self, _call: &Call, _to: MemberId) -> Result<(), CoreError> {
            Ok(())
        }

        async fn notify_queue_pressure(&self, _notice: QueuePressureNotice) -> Result<(), CoreError> {
            Ok(())
        }
    }

    struct AllowAllPolicy;

    impl AuthorizationPolicy for AllowAllPolicy {
        fn can_use(&self, _role: &Role, _settings: GroupSettings) -> bool {
            true
        }

        fn can_see(&self, _role: &Role, _settings: GroupSettings) -> bool {
            true
        }
    }

    struct NoopRecorderBackend;

    #[async_trait]
    impl RecorderBackend for NoopRecorderBackend {
        async fn start(&self, _request: RecorderSessionRequest) -> Result<(), CoreError> {
            Ok(())
        }

        async fn stop(&self, _request: RecorderSessionRequest) -> Result<(), CoreError> {
            Ok(())
        }

        async fn active_sessions(&self) -> Result<usize, CoreError> {
            Ok(0)
        }
    }

    fn coordinator(store: Arc<InMemoryCallStore>) -> CallCoordinator {
        let relay = Arc::new(SignalRelay::new());
        let queue = Arc::new(RecordingQueue::new(
            RecordingQueueConfig::new(2, MemberId::generate()),
            Arc::new(NoopNotifier),
            Arc::new(SystemClock),
        ));
        let recorder = Arc::new(RecorderCoordinator::new(
            Arc::new(NoopRecorderBackend),
            store.clone(),
            relay.clone(),
            queue,
        ));
        CallCoordinator::new(
            store,
            Arc::new(AllowAllPolicy),
            Arc::new(NoopNotifier),
            relay,
            Arc::new(SystemClock),
            Arc::new(StaticIceConfigProvider::new(vec!["stun:stun.example.com".to_owned()], None)),
            recorder,
        )
    }

    fn auth(member_id: MemberId, group_id: GroupId) -> AuthContext {
        AuthContext {
            user_id: member_id,
            member_id,
            group_id,
            role: Role::new("member"),
            display_name: "Tester".to_owned(),
            email: "tester@example.com".to_owned(),
        }
    }

    #[tokio::test]
    async fn initiate_then_respond_then_end_flows_through_the_store() {
        let store = Arc::new(InMemoryCallStore::default());
        let group_id = GroupId::generate();
        let a = MemberId::generate();
        let b = MemberId::generate();
        store.members.lock().insert(a);
        store.members.lock().insert(b);
        let coordinator = coordinator(store);

        let call = coordinator
            .initiate(&auth(a, group_id), group_id, CallKind::Voice, vec![b])
            .await
            .unwrap();
        assert_eq!(call.status, CallStatus::Ringing);

        let accepted = coordinator.respond(&auth(b, group_id), call.id, true).await.unwrap();
        assert_eq!(accepted.status, CallStatus::Active);

        let ended = coordinator.end(&auth(a, group_id), call.id).await.unwrap();
        assert_eq!(ended.status, CallStatus::Ended);
    }

    #[tokio::test]
    async fn initiate_rejects_invitees_outside_the_group() {
        let store = Arc::new(InMemoryCallStore::default());
        let group_id = GroupId::generate();
        let a = MemberId::generate();
        let outsider = MemberId::generate();
        store.members.lock().insert(a);
        let coordinator = coordinator(store);

        let err = coordinator
            .initiate(&auth(a, group_id), group_id, CallKind::Voice, vec![outsider])
            .await
            .unwrap_err();
        assert!(matches!(err, CallCoreError::InvalidInvitees { .. }));
    }

    #[tokio::test]
    async fn signal_deposit_broadcasts_to_the_other_participant() {
        let store = Arc::new(InMemoryCallStore::default());
        let group_id = GroupId::generate();
        let a = MemberId::generate();
        let b = MemberId::generate();
        store.members.lock().insert(a);
        store.members.lock().insert(b);
        let coordinator = coordinator(store);

        let call = coordinator
            .initiate(&auth(a, group_id), group_id, CallKind::Voice, vec![b])
            .await
            .unwrap();
        coordinator
            .deposit_signal(&auth(a, group_id), call.id, SignalKind::Offer, serde_json::json!({}), None)
            .await
            .unwrap();

        let drained = coordinator.drain_signals(&auth(b, group_id), call.id).await.unwrap();
        assert_eq!(drained.signals.len(), 1);
    }
}
