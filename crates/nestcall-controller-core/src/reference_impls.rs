//! Default, non-test capability implementations wired up by [`crate::controller::Controller`]
//! when nothing more specific is injected. Group membership and roles in the real
//! product live in the surrounding family-collaboration platform, not here — a
//! deployment that already has that data should inject its own [`CallStore`] instead
//! of leaning on [`InMemoryCallStore`] past local development.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use nestcall_controller_settings::Recorder as RecorderSettings;
use nestcall_signaling_core::{
    AuthorizationPolicy, CallStore, CoreError, GroupSettings, Notifier, QueuePressureNotice, RecorderBackend,
    RecorderSessionRequest, RecordingArtifact, RecordingAssetStore, StoredArtifact, TranscodeService,
    TranscodedArtifact,
};
use nestcall_types_common::{CallId, GroupId, MemberId, Role};
use nestcall_types_signaling::{Call, Participant};
use parking_lot::Mutex;
use serde::Serialize;

/// An in-memory `CallStore` for local development and tests of the binary. Group
/// membership/roles are seeded through [`Self::register_member`] rather than read
/// from a real membership service.
#[derive(Default)]
pub struct InMemoryCallStore {
    calls: Mutex<HashMap<CallId, Call>>,
    participants: Mutex<HashMap<CallId, Vec<Participant>>>,
    members: Mutex<HashMap<GroupId, HashMap<MemberId, Role>>>,
    read_only_groups: Mutex<HashSet<GroupId>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `member_id` as a member of `group_id` holding `role`.
    pub fn register_member(&self, group_id: GroupId, member_id: MemberId, role: Role) {
        self.members.lock().entry(group_id).or_default().insert(member_id, role);
    }

    pub fn set_group_read_only(&self, group_id: GroupId, read_only: bool) {
        if read_only {
            self.read_only_groups.lock().insert(group_id);
        } else {
            self.read_only_groups.lock().remove(&group_id);
        }
    }
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
        member_id: Option<MemberId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Call>, i64), CoreError> {
        let participants = self.participants.lock();
        let mut calls: Vec<Call> = self
            .calls
            .lock()
            .values()
            .filter(|c| {
                c.group_id == group_id
                    && match member_id {
                        None => true,
                        Some(member_id) => {
                            c.initiator_id == member_id
                                || participants
                                    .get(&c.id)
                                    .is_some_and(|ps| ps.iter().any(|p| p.member_id == member_id))
                        }
                    }
            })
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        let total = calls.len() as i64;
        let page = calls.into_iter().skip(offset.max(0) as usize).take(limit.max(0) as usize).collect();
        Ok((page, total))
    }

    async fn list_active_for_group(&self, group_id: GroupId) -> Result<Vec<Call>, CoreError> {
        use nestcall_types_signaling::CallStatus;
        Ok(self
            .calls
            .lock()
            .values()
            .filter(|c| c.group_id == group_id && matches!(c.status, CallStatus::Ringing | CallStatus::Active))
            .cloned()
            .collect())
    }

    async fn is_group_read_only(&self, group_id: GroupId) -> Result<bool, CoreError> {
        Ok(self.read_only_groups.lock().contains(&group_id))
    }

    async fn are_registered_members(&self, group_id: GroupId, member_ids: &[MemberId]) -> Result<bool, CoreError> {
        let members = self.members.lock();
        let Some(group_members) = members.get(&group_id) else {
            return Ok(member_ids.is_empty());
        };
        Ok(member_ids.iter().all(|id| group_members.contains_key(id)))
    }

    async fn role_of(&self, group_id: GroupId, member_id: MemberId) -> Result<Option<Role>, CoreError> {
        Ok(self.members.lock().get(&group_id).and_then(|members| members.get(&member_id).cloned()))
    }
}

/// Role/group-settings gating (spec §4.4 "data-driven policy function"). Only the
/// `read_only` flag is special-cased: an admin may still act in a frozen group (e.g.
/// to unfreeze it or clean up), everyone may always see a group's call history.
pub struct RolePolicy;

impl AuthorizationPolicy for RolePolicy {
    fn can_use(&self, role: &Role, settings: GroupSettings) -> bool {
        !settings.read_only || role.is_admin()
    }

    fn can_see(&self, _role: &Role, _settings: GroupSettings) -> bool {
        true
    }
}

/// Logs notifications instead of delivering them. Real push delivery belongs to the
/// surrounding family-collaboration platform's own notification service.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_incoming_call(&self, call: &Call, to: MemberId) -> Result<(), CoreError> {
        tracing::info!(call_id = %call.id, member_id = %to, kind = %call.kind, "incoming call notification");
        Ok(())
    }

    async fn notify_queue_pressure(&self, notice: QueuePressureNotice) -> Result<(), CoreError> {
        tracing::warn!(
            group_id = %notice.group_id,
            active = notice.active,
            max = notice.max,
            queue_len = notice.queue_len,
            "recording queue under pressure"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RecorderCallbackClaims {
    sub: &'static str,
    exp: i64,
}

#[derive(Serialize)]
struct RecorderSessionPayload {
    call_id: CallId,
    kind: nestcall_types_common::CallKind,
    signaling_url: String,
    ingest_url: String,
    callback_token: String,
}

/// Talks to the external ghost-recorder backend over HTTP (spec §4.7 `RecorderBackend`).
pub struct HttpRecorderBackend {
    client: reqwest::Client,
    base_url: String,
    public_base_url: String,
    jwt_secret: String,
    start_timeout: Duration,
    stop_timeout: Duration,
    status_timeout: Duration,
}

impl HttpRecorderBackend {
    pub fn new(settings: &RecorderSettings, public_base_url: String, jwt_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.backend_base_url.clone(),
            public_base_url,
            jwt_secret,
            start_timeout: Duration::from_millis(settings.start_timeout_ms),
            stop_timeout: Duration::from_millis(settings.stop_timeout_ms),
            status_timeout: Duration::from_millis(settings.status_timeout_ms),
        }
    }

    /// A short-lived token the backend presents back to this service's own API when
    /// it relays signals or uploads the finished artifact (spec §4.7 `callbackAuth`).
    fn callback_token(&self, call_id: CallId) -> Result<String, CoreError> {
        let claims = RecorderCallbackClaims {
            sub: "recorder",
            exp: (chrono::Utc::now() + chrono::Duration::hours(6)).timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes())).map_err(|err| {
            tracing::error!(%call_id, ?err, "failed to mint recorder callback token");
            CoreError::Internal {
                message: "failed to mint recorder callback token".to_owned(),
            }
        })
    }
}

#[async_trait]
impl RecorderBackend for HttpRecorderBackend {
    async fn start(&self, request: RecorderSessionRequest) -> Result<(), CoreError> {
        let payload = RecorderSessionPayload {
            call_id: request.call_id,
            kind: request.kind,
            signaling_url: format!(
                "{}/groups/_/calls/{}/recorder-signal",
                self.public_base_url, request.call_id
            ),
            ingest_url: format!("{}/groups/_/calls/{}/recording", self.public_base_url, request.call_id),
            callback_token: self.callback_token(request.call_id)?,
        };
        self.client
            .post(format!("{}/sessions", self.base_url))
            .timeout(self.start_timeout)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CoreError::BackendUnavailable { message: err.to_string() })?;
        Ok(())
    }

    async fn stop(&self, request: RecorderSessionRequest) -> Result<(), CoreError> {
        self.client
            .delete(format!("{}/sessions/{}", self.base_url, request.call_id))
            .timeout(self.stop_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CoreError::BackendUnavailable { message: err.to_string() })?;
        Ok(())
    }

    async fn active_sessions(&self) -> Result<usize, CoreError> {
        #[derive(serde::Deserialize)]
        struct ActiveSessionsResponse {
            count: usize,
        }

        let response = self
            .client
            .get(format!("{}/sessions/active-count", self.base_url))
            .timeout(self.status_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CoreError::BackendUnavailable { message: err.to_string() })?;

        response
            .json::<ActiveSessionsResponse>()
            .await
            .map(|body| body.count)
            .map_err(|err| CoreError::BackendUnavailable { message: err.to_string() })
    }
}

/// Repackages an artifact under the canonical mime type without re-encoding it. A
/// placeholder for a real transcoding pipeline (e.g. shelling out to ffmpeg), which
/// is out of scope here (spec §4.8 only specifies the contract, not the codec work).
pub struct PassthroughTranscodeService;

#[async_trait]
impl TranscodeService for PassthroughTranscodeService {
    async fn transcode(&self, artifact: RecordingArtifact) -> Result<TranscodedArtifact, CoreError> {
        Ok(TranscodedArtifact {
            bytes: artifact.bytes,
            mime_type: artifact.original_mime_type,
        })
    }
}

/// Stores finished recordings on local disk under `base_dir`, serving them back at
/// `{public_base_url}/recordings/{file_id}`. A lightweight default; a production
/// deployment would inject an object-storage-backed `RecordingAssetStore` behind the
/// same trait instead.
pub struct LocalDiskAssetStore {
    base_dir: std::path::PathBuf,
    public_base_url: String,
}

impl LocalDiskAssetStore {
    pub fn new(base_dir: impl Into<std::path::PathBuf>, public_base_url: String) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_base_url,
        }
    }
}

#[async_trait]
impl RecordingAssetStore for LocalDiskAssetStore {
    async fn save(&self, call_id: CallId, artifact: TranscodedArtifact) -> Result<StoredArtifact, CoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await.map_err(|err| CoreError::Internal {
            message: format!("failed to create recordings directory: {err}"),
        })?;

        let extension = match artifact.mime_type.as_str() {
            "video/mp4" => "mp4",
            "audio/mpeg" => "mp3",
            _ => "bin",
        };
        let file_id = format!("{call_id}.{extension}");
        let path = self.base_dir.join(&file_id);
        tokio::fs::write(&path, &artifact.bytes).await.map_err(|err| CoreError::Internal {
            message: format!("failed to write recording artifact: {err}"),
        })?;

        Ok(StoredArtifact {
            file_id: file_id.clone(),
            url: format!("{}/recordings/{file_id}", self.public_base_url),
        })
    }
}
