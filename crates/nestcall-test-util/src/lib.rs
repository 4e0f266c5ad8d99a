//! In-memory fakes for the capability traits defined in `nestcall-signaling-core`,
//! shared by every crate that needs a cheap `CallCoordinator` to exercise in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use nestcall_signaling_core::{
    Clock, CoreError, GroupSettings, IceConfigProvider, Notifier, QueuePressureNotice, RecorderBackend,
    RecorderSessionRequest, RecordingArtifact, RecordingAssetStore, StoredArtifact, TranscodeService,
    TranscodedArtifact,
};
use nestcall_types_api::ice::IceServer;
use nestcall_types_common::{CallId, GroupId, MemberId, Role, Timestamp};
use nestcall_types_signaling::{Call, Participant};
use parking_lot::Mutex;

/// A `CallStore` entirely in memory, keyed the same way a real implementation would
/// be (`call_id` and `(group_id, member_id)`), good enough to drive `CallCoordinator`
/// end to end in tests.
#[derive(Default)]
pub struct InMemoryCallStore {
    pub calls: Mutex<HashMap<CallId, Call>>,
    pub participants: Mutex<HashMap<CallId, Vec<Participant>>>,
    pub members: Mutex<HashSet<MemberId>>,
    pub roles: Mutex<HashMap<MemberId, Role>>,
    pub read_only_groups: Mutex<HashSet<GroupId>>,
}

impl InMemoryCallStore {
    pub fn register_member(&self, member_id: MemberId, role: Role) {
        self.members.lock().insert(member_id);
        self.roles.lock().insert(member_id, role);
    }

    pub fn set_read_only(&self, group_id: GroupId, read_only: bool) {
        if read_only {
            self.read_only_groups.lock().insert(group_id);
        } else {
            self.read_only_groups.lock().remove(&group_id);
        }
    }
}

#[async_trait]
impl nestcall_signaling_core::CallStore for InMemoryCallStore {
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
        member_id: Option<MemberId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Call>, i64), CoreError> {
        let mut calls: Vec<Call> = self.calls.lock().values().filter(|c| c.group_id == group_id).cloned().collect();
        if let Some(member_id) = member_id {
            let participants = self.participants.lock();
            calls.retain(|c| {
                c.initiator_id == member_id
                    || participants
                        .get(&c.id)
                        .is_some_and(|ps| ps.iter().any(|p| p.member_id == member_id))
            });
        }
        calls.sort_by_key(|c| c.started_at);
        calls.reverse();
        let total = calls.len() as i64;
        let page = calls.into_iter().skip(offset.max(0) as usize).take(limit.max(0) as usize).collect();
        Ok((page, total))
    }

    async fn list_active_for_group(&self, group_id: GroupId) -> Result<Vec<Call>, CoreError> {
        Ok(self
            .calls
            .lock()
            .values()
            .filter(|c| {
                c.group_id == group_id
                    && matches!(c.status, nestcall_types_signaling::CallStatus::Ringing | nestcall_types_signaling::CallStatus::Active)
            })
            .cloned()
            .collect())
    }

    async fn is_group_read_only(&self, group_id: GroupId) -> Result<bool, CoreError> {
        Ok(self.read_only_groups.lock().contains(&group_id))
    }

    async fn are_registered_members(&self, _group_id: GroupId, member_ids: &[MemberId]) -> Result<bool, CoreError> {
        let members = self.members.lock();
        Ok(member_ids.iter().all(|id| members.contains(id)))
    }

    async fn role_of(&self, _group_id: GroupId, member_id: MemberId) -> Result<Option<Role>, CoreError> {
        Ok(self.roles.lock().get(&member_id).cloned())
    }
}

/// A `Notifier` that records every call it receives for later assertions, instead
/// of delivering anything.
#[derive(Default)]
pub struct RecordingNotifier {
    pub incoming_calls: Mutex<Vec<(CallId, MemberId)>>,
    pub queue_pressure: Mutex<Vec<QueuePressureNotice>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_incoming_call(&self, call: &Call, to: MemberId) -> Result<(), CoreError> {
        self.incoming_calls.lock().push((call.id, to));
        Ok(())
    }

    async fn notify_queue_pressure(&self, notice: QueuePressureNotice) -> Result<(), CoreError> {
        self.queue_pressure.lock().push(notice);
        Ok(())
    }
}

/// Grants or denies every operation uniformly; good enough for tests that are not
/// themselves exercising authorization policy.
pub struct AllowAllPolicy;

impl nestcall_signaling_core::AuthorizationPolicy for AllowAllPolicy {
    fn can_use(&self, _role: &Role, _settings: GroupSettings) -> bool {
        true
    }

    fn can_see(&self, _role: &Role, _settings: GroupSettings) -> bool {
        true
    }
}

/// A `RecorderBackend` that always succeeds and tracks which sessions it believes
/// are running, so `active_sessions` reflects reality instead of always answering 0.
#[derive(Default)]
pub struct FakeRecorderBackend {
    pub sessions: Mutex<HashSet<(CallId, nestcall_types_common::CallKind)>>,
    pub fail_start: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl RecorderBackend for FakeRecorderBackend {
    async fn start(&self, request: RecorderSessionRequest) -> Result<(), CoreError> {
        if self.fail_start.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CoreError::BackendUnavailable {
                message: "recorder backend is down".to_owned(),
            });
        }
        self.sessions.lock().insert((request.call_id, request.kind));
        Ok(())
    }

    async fn stop(&self, request: RecorderSessionRequest) -> Result<(), CoreError> {
        self.sessions.lock().remove(&(request.call_id, request.kind));
        Ok(())
    }

    async fn active_sessions(&self) -> Result<usize, CoreError> {
        Ok(self.sessions.lock().len())
    }
}

/// Returns the artifact unchanged, tagged with the requested mime type — good enough
/// for ingest tests that do not care about real media transcoding.
pub struct PassthroughTranscodeService {
    pub target_mime_type: String,
}

#[async_trait]
impl TranscodeService for PassthroughTranscodeService {
    async fn transcode(&self, artifact: RecordingArtifact) -> Result<TranscodedArtifact, CoreError> {
        Ok(TranscodedArtifact {
            bytes: artifact.bytes,
            mime_type: self.target_mime_type.clone(),
        })
    }
}

/// Stores artifacts in memory, handing back a deterministic, inspectable URL.
#[derive(Default)]
pub struct InMemoryAssetStore {
    pub saved: Mutex<HashMap<CallId, TranscodedArtifact>>,
}

#[async_trait]
impl RecordingAssetStore for InMemoryAssetStore {
    async fn save(&self, call_id: CallId, artifact: TranscodedArtifact) -> Result<StoredArtifact, CoreError> {
        let stored = StoredArtifact {
            file_id: format!("fake-file-{call_id}"),
            url: format!("https://fake-storage.test/{call_id}"),
        };
        self.saved.lock().insert(call_id, artifact);
        Ok(stored)
    }
}

/// A fixed point in time, so state-machine and recording-queue tests get
/// deterministic `Timestamp`s without depending on wall-clock time.
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// A single hardcoded STUN server, for tests that need an `IceConfigProvider` but do
/// not care about its contents.
pub struct FakeIceConfigProvider;

impl IceConfigProvider for FakeIceConfigProvider {
    fn ice_servers(&self) -> Vec<IceServer> {
        vec![IceServer {
            urls: vec!["stun:stun.fake.test:3478".to_owned()],
            username: None,
            credential: None,
        }]
    }
}

/// Convenience bundle of every fake capability, for tests that just want a working
/// `CallCoordinator` without wiring up each dependency by hand.
pub struct Fakes {
    pub call_store: Arc<InMemoryCallStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub policy: Arc<AllowAllPolicy>,
    pub recorder_backend: Arc<FakeRecorderBackend>,
    pub asset_store: Arc<InMemoryAssetStore>,
    pub ice: Arc<FakeIceConfigProvider>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            call_store: Arc::new(InMemoryCallStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            policy: Arc::new(AllowAllPolicy),
            recorder_backend: Arc::new(FakeRecorderBackend::default()),
            asset_store: Arc::new(InMemoryAssetStore::default()),
            ice: Arc::new(FakeIceConfigProvider),
        }
    }
}
